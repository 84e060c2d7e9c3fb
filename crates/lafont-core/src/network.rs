// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The network: authoritative agents, connections and rules.
//!
//! This module holds the state and the mutation primitives. Reduction lives in
//! [`crate::reduce`], the rewrite splice in [`crate::splice`], and batch
//! execution in [`crate::parallel`].
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::agent::{Agent, AgentError};
use crate::config::NetworkConfig;
use crate::connection::{Connection, ConnectionKey};
use crate::ident::{AgentId, RuleId};
use crate::parallel::{FootprintViolation, MergeConflict};
use crate::port::PortRef;
use crate::registry::{RuleQuery, RuleRegistry};
use crate::rule::{HandlerError, Rule, RuleError};
use crate::template::TemplateError;
use crate::value::Value;
use crate::view::NetworkView;

/// Errors raised by network operations.
///
/// Removing an unknown agent or connection is not an error; those operations
/// return `false` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// No agent with this id lives in the network.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),
    /// The agent exists but has no port with this name.
    #[error("unknown port: {0}")]
    UnknownPort(PortRef),
    /// An agent with this id is already in the network.
    #[error("duplicate agent: {0}")]
    DuplicateAgent(AgentId),
    /// The port is already the endpoint of a connection.
    #[error("port {port} is already connected to {peer}")]
    PortAlreadyConnected {
        /// Occupied port.
        port: PortRef,
        /// Its current peer.
        peer: PortRef,
    },
    /// Both endpoints name the same port.
    #[error("cannot connect {0} to itself")]
    SelfConnection(PortRef),
    /// A restored agent record uses an id at or above [`AgentId::RESTORE_LIMIT`].
    #[error("agent id out of restorable range: {0}")]
    IdOutOfRange(AgentId),
    /// A restored agent record has a malformed port set.
    #[error("invalid agent {id}: {source}")]
    InvalidAgent {
        /// Agent id from the record.
        id: AgentId,
        /// Port-set error.
        source: AgentError,
    },
    /// An action handler failed; the network is unchanged.
    #[error("rule `{rule}` handler failed: {source}")]
    Handler {
        /// Rule name.
        rule: String,
        /// Handler error.
        source: HandlerError,
    },
    /// A rewrite template failed validation; the network is unchanged.
    #[error("rule `{rule}`: {source}")]
    Template {
        /// Rule name.
        rule: String,
        /// Template error.
        source: TemplateError,
    },
    /// The instance passed to `fire` is not an active pair of this network.
    #[error("rule {rule} does not match {left} and {right}")]
    NoMatch {
        /// Rule id.
        rule: RuleId,
        /// Left agent.
        left: AgentId,
        /// Right agent.
        right: AgentId,
    },
    /// A batch-executed rule touched state outside its footprint.
    #[error(transparent)]
    FootprintViolation(#[from] FootprintViolation),
    /// A batch diff could not be merged.
    #[error(transparent)]
    Merge(#[from] MergeConflict),
}

/// Counters of fired rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReductionStats {
    /// All successful rule firings.
    pub reductions: u64,
    /// Action rule firings.
    pub actions: u64,
    /// Rewrite rule firings.
    pub rewrites: u64,
}

/// An interaction net with its rule set.
///
/// The network is a single-writer structure: it has no internal locking.
/// Parallelism comes from [`crate::parallel`], which runs conflict-free
/// instances on isolated copies and merges their diffs back.
///
/// Invariants
/// - every connection endpoint names a port of a live agent;
/// - each port is the endpoint of at most one connection;
/// - `port_index` maps exactly the endpoints of `connections`.
#[derive(Clone, Debug, Default)]
pub struct Network {
    agents: BTreeMap<AgentId, Agent>,
    connections: BTreeMap<ConnectionKey, Connection>,
    port_index: FxHashMap<PortRef, ConnectionKey>,
    pub(crate) rules: Arc<RuleRegistry>,
    pub(crate) config: NetworkConfig,
    pub(crate) stats: ReductionStats,
}

impl Network {
    /// Creates an empty network with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty network with `config`.
    pub fn with_config(config: NetworkConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Empty network sharing this network's rules and configuration.
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            config: self.config,
            ..Self::default()
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Firing counters since construction.
    pub fn stats(&self) -> ReductionStats {
        self.stats
    }

    /// Read-only view.
    pub fn view(&self) -> NetworkView<'_> {
        NetworkView::new(self)
    }

    // ── agents ──────────────────────────────────────────────────────────

    /// Adds `agent`, returning its id.
    ///
    /// # Errors
    /// [`NetworkError::DuplicateAgent`] if an agent with the same id is present.
    pub fn add_agent(&mut self, agent: Agent) -> Result<AgentId, NetworkError> {
        let id = agent.id();
        if self.agents.contains_key(&id) {
            return Err(NetworkError::DuplicateAgent(id));
        }
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Removes an agent and every connection incident to its ports.
    ///
    /// Returns `false` if no such agent exists.
    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        self.detach_agent(id).is_some()
    }

    /// Agent `id`.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Returns `true` if agent `id` is present.
    pub fn contains_agent(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    /// Replaces the value of agent `id`, returning the previous value.
    ///
    /// # Errors
    /// [`NetworkError::UnknownAgent`] if the agent is absent.
    pub fn set_value(&mut self, id: AgentId, value: Value) -> Result<Value, NetworkError> {
        self.agents
            .get_mut(&id)
            .map(|a| a.replace_value(value))
            .ok_or(NetworkError::UnknownAgent(id))
    }

    /// Agents named `name`, in id order.
    pub fn agents_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Agent> + 'a {
        self.agents.values().filter(move |a| a.name() == name)
    }

    /// Every agent, in id order.
    pub fn all_agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Number of agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    // ── connections ─────────────────────────────────────────────────────

    /// Connects `a` and `b` with a default name.
    ///
    /// Both ports must exist on live agents and be free. Connecting an
    /// occupied port is an error; the existing connection is left untouched.
    ///
    /// # Errors
    /// [`NetworkError::UnknownAgent`], [`NetworkError::UnknownPort`],
    /// [`NetworkError::SelfConnection`] or [`NetworkError::PortAlreadyConnected`].
    pub fn connect_ports(&mut self, a: &PortRef, b: &PortRef) -> Result<ConnectionKey, NetworkError> {
        self.connect_with(a.clone(), b.clone(), None)
    }

    /// Connects `a` and `b` under `name`. Same rules as [`Network::connect_ports`].
    ///
    /// # Errors
    /// See [`Network::connect_ports`].
    pub fn connect_named(
        &mut self,
        a: &PortRef,
        b: &PortRef,
        name: impl Into<String>,
    ) -> Result<ConnectionKey, NetworkError> {
        self.connect_with(a.clone(), b.clone(), Some(name.into()))
    }

    pub(crate) fn connect_with(
        &mut self,
        source: PortRef,
        destination: PortRef,
        name: Option<String>,
    ) -> Result<ConnectionKey, NetworkError> {
        self.check_free_port(&source)?;
        self.check_free_port(&destination)?;
        if source == destination {
            return Err(NetworkError::SelfConnection(source));
        }
        let conn = Connection::new(source, destination, name);
        let key = conn.key().clone();
        self.insert_connection(conn);
        Ok(key)
    }

    pub(crate) fn check_port(&self, port: &PortRef) -> Result<&Agent, NetworkError> {
        let agent = self
            .agents
            .get(&port.agent)
            .ok_or(NetworkError::UnknownAgent(port.agent))?;
        if !agent.has_port(&port.port) {
            return Err(NetworkError::UnknownPort(port.clone()));
        }
        Ok(agent)
    }

    fn check_free_port(&self, port: &PortRef) -> Result<(), NetworkError> {
        self.check_port(port)?;
        if let Some(peer) = self.neighbor(port) {
            return Err(NetworkError::PortAlreadyConnected {
                port: port.clone(),
                peer: peer.clone(),
            });
        }
        Ok(())
    }

    /// Removes the connection between `a` and `b`, in either orientation.
    ///
    /// Returns `false` if the two ports are not connected to each other.
    pub fn disconnect_ports(&mut self, a: &PortRef, b: &PortRef) -> bool {
        self.take_connection(&ConnectionKey::new(a, b)).is_some()
    }

    /// Returns `true` if `port` is the endpoint of a connection.
    pub fn is_port_connected(&self, port: &PortRef) -> bool {
        self.port_index.contains_key(port)
    }

    /// The connection on `port`, if any.
    pub fn connection_at(&self, port: &PortRef) -> Option<&Connection> {
        self.port_index
            .get(port)
            .and_then(|key| self.connections.get(key))
    }

    /// The port connected to `port`, if any.
    pub fn neighbor(&self, port: &PortRef) -> Option<&PortRef> {
        self.port_index.get(port).and_then(|key| key.other(port))
    }

    /// Connection with key `key`.
    pub fn connection(&self, key: &ConnectionKey) -> Option<&Connection> {
        self.connections.get(key)
    }

    /// Every connection, in key order.
    pub fn all_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Agents one connection away from `id`, excluding `id` itself.
    pub fn neighbours(&self, id: AgentId) -> BTreeSet<AgentId> {
        let Some(agent) = self.agents.get(&id) else {
            return BTreeSet::new();
        };
        agent
            .ports()
            .filter_map(|p| self.neighbor(&p.port_ref()))
            .map(|peer| peer.agent)
            .filter(|peer| *peer != id)
            .collect()
    }

    // ── rules ───────────────────────────────────────────────────────────

    /// Registers `rule`. Malformed rules never reach this point: rule
    /// constructors validate patterns and static templates.
    ///
    /// # Errors
    /// [`RuleError::DuplicateRuleName`] or [`RuleError::DuplicatePattern`].
    pub fn add_rule(&mut self, rule: Rule) -> Result<RuleId, RuleError> {
        Arc::make_mut(&mut self.rules).insert(rule)
    }

    /// Unregisters the rule called `name`. Returns `false` if none exists.
    pub fn remove_rule(&mut self, name: &str) -> bool {
        if self.rules.get(name).is_none() {
            return false;
        }
        Arc::make_mut(&mut self.rules).remove(name).is_some()
    }

    /// Rules passing `query`, in canonical pattern order.
    pub fn find_rules(&self, query: &RuleQuery) -> Vec<&Rule> {
        self.rules.find(query)
    }

    /// Rule called `name`.
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Unregisters every rule.
    pub fn clear_rules(&mut self) {
        if !self.rules.is_empty() {
            Arc::make_mut(&mut self.rules).clear();
        }
    }

    /// The rule registry.
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    // ── raw primitives (no validation; callers uphold the invariants) ────

    pub(crate) fn insert_agent(&mut self, agent: Agent) {
        self.agents.insert(agent.id(), agent);
    }

    /// Removes an agent and its connections, returning both.
    pub(crate) fn detach_agent(&mut self, id: AgentId) -> Option<(Agent, Vec<Connection>)> {
        let agent = self.agents.remove(&id)?;
        let keys: Vec<ConnectionKey> = agent
            .ports()
            .filter_map(|p| self.port_index.get(&p.port_ref()).cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let connections = keys
            .iter()
            .filter_map(|k| self.take_connection(k))
            .collect();
        Some((agent, connections))
    }

    pub(crate) fn insert_connection(&mut self, conn: Connection) {
        let key = conn.key().clone();
        self.port_index.insert(key.low().clone(), key.clone());
        self.port_index.insert(key.high().clone(), key.clone());
        self.connections.insert(key, conn);
    }

    pub(crate) fn take_connection(&mut self, key: &ConnectionKey) -> Option<Connection> {
        let conn = self.connections.remove(key)?;
        self.port_index.remove(key.low());
        self.port_index.remove(key.high());
        Some(conn)
    }

    pub(crate) fn agent_entry_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }
}
