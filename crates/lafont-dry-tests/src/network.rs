// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Network builders for common test scenes.
use lafont_core::{Agent, AgentId, Network, NetworkConfig, PortRef, Rule, Value};

use crate::demo_rules::{con, counter, decrement, increment};

/// Fluent builder: a network with a chosen config and rule set.
#[derive(Default)]
pub struct NetworkBuilder {
    config: NetworkConfig,
    rules: Vec<Rule>,
}

impl NetworkBuilder {
    /// Starts from [`NetworkConfig::default`] with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: NetworkConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers `rule`.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Registers every rule in `rules`.
    pub fn rules<I: IntoIterator<Item = Rule>>(mut self, rules: I) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Builds the (agent-less) network.
    #[allow(clippy::expect_used)]
    pub fn build(self) -> Network {
        let mut net = Network::with_config(self.config);
        for rule in self.rules {
            net.add_rule(rule).expect("register rule");
        }
        net
    }
}

/// Adds `agent` and returns its id.
#[allow(clippy::expect_used)]
pub fn add(net: &mut Network, agent: Agent) -> AgentId {
    net.add_agent(agent).expect("fresh agent id")
}

/// Connects `a.pa` to `b.pb`.
#[allow(clippy::expect_used)]
pub fn wire(net: &mut Network, a: AgentId, pa: &str, b: AgentId, pb: &str) {
    net.connect_ports(&PortRef::new(a, pa), &PortRef::new(b, pb))
        .expect("ports exist and are free");
}

/// Reads the integer field `key` of agent `id`, if both exist.
pub fn int_of(net: &Network, id: AgentId, key: &str) -> Option<i64> {
    net.agent(id)?.value().int_field(key).ok()
}

/// Counter/increment pair joined main to main.
pub struct CounterPair {
    /// The `Counter` agent.
    pub counter: AgentId,
    /// The `Increment` agent.
    pub increment: AgentId,
}

/// Adds `Counter { count }` wired main-to-main to `Increment { amount }`.
pub fn counter_pair(net: &mut Network, count: i64, amount: i64) -> CounterPair {
    let c = add(net, counter(count));
    let i = add(net, increment(amount));
    wire(net, c, "main", i, "main");
    CounterPair {
        counter: c,
        increment: i,
    }
}

/// Adds `n` independent counter pairs; pair `k` has amount `k + 1`.
pub fn counters(net: &mut Network, n: usize) -> Vec<CounterPair> {
    (0..n)
        .map(|k| counter_pair(net, 0, i64::try_from(k).unwrap_or(i64::MAX - 1) + 1))
        .collect()
}

/// Ids of the increment/decrement scene.
pub struct IncDecScene {
    /// `Increment { amount: 5 }`.
    pub increment: AgentId,
    /// `Decrement { amount: 3 }`.
    pub decrement: AgentId,
    /// Peer of the increment's `main` port.
    pub x: AgentId,
    /// Peer of the increment's `debug` port.
    pub y: AgentId,
    /// Peer of the decrement's `main` port.
    pub z: AgentId,
}

/// Increment and decrement joined on `secondary`, each with external peers
/// on the remaining ports.
pub fn inc_dec_scene(net: &mut Network) -> IncDecScene {
    let inc = add(net, increment(5));
    let dec = add(net, decrement(3));
    let x = add(net, Agent::new("X", Value::Null));
    let y = add(net, Agent::new("Y", Value::Null));
    let z = add(net, Agent::new("Z", Value::Null));
    wire(net, inc, "secondary", dec, "secondary");
    wire(net, inc, "main", x, "main");
    wire(net, inc, "debug", y, "main");
    wire(net, dec, "main", z, "main");
    IncDecScene {
        increment: inc,
        decrement: dec,
        x,
        y,
        z,
    }
}

/// Builds a full binary tree of `Con` agents of the given depth with `Leaf`
/// agents on its fringe, and points an `Eraser` at the root.
///
/// Reducing with the eraser rules removes everything except the leaves,
/// each of which ends up wired to its own eraser.
pub fn con_tree(net: &mut Network, depth: u32) -> AgentId {
    let root = subtree(net, depth);
    let eraser = add(net, Agent::new("Eraser", Value::Null));
    wire(net, eraser, "main", root, "main");
    eraser
}

fn subtree(net: &mut Network, depth: u32) -> AgentId {
    if depth == 0 {
        return add(net, Agent::new("Leaf", Value::Null));
    }
    let node = add(net, con());
    let l = subtree(net, depth - 1);
    let r = subtree(net, depth - 1);
    wire(net, node, "l", l, "main");
    wire(net, node, "r", r, "main");
    node
}

/// Multiset of agent names, sorted. Compares shapes across networks whose
/// ids differ.
pub fn shape(net: &Network) -> Vec<String> {
    let mut names: Vec<String> = net.all_agents().map(|a| a.name().to_owned()).collect();
    names.sort();
    names
}
