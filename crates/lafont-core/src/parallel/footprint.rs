// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Footprints: the agents a rewrite instance reads and writes.
use std::collections::BTreeSet;

use crate::config::AccessMode;
use crate::ident::AgentId;
use crate::network::Network;
use crate::reduce::RewriteInstance;
use crate::rule::{Access, Rule};

/// Read and write sets of one instance.
///
/// `write` holds agents the instance may mutate or remove; `read` holds
/// agents it only observes, including neighbours whose ports it may rewire.
/// Two footprints are independent when neither writes what the other
/// touches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Footprint {
    /// Agents written (value updates, removal).
    pub write: BTreeSet<AgentId>,
    /// Agents read.
    pub read: BTreeSet<AgentId>,
}

fn intersects(a: &BTreeSet<AgentId>, b: &BTreeSet<AgentId>) -> bool {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().any(|x| large.contains(x))
}

impl Footprint {
    /// Baseline footprint: both matched agents written, nothing else.
    pub fn of_instance(inst: &RewriteInstance) -> Self {
        Self {
            write: inst.agents().into_iter().collect(),
            read: BTreeSet::new(),
        }
    }

    /// Returns `true` if the two footprints can run concurrently.
    pub fn independent(&self, other: &Self) -> bool {
        !(intersects(&self.write, &other.write)
            || intersects(&self.write, &other.read)
            || intersects(&other.write, &self.read))
    }

    /// Every agent in either set.
    pub fn agents(&self) -> BTreeSet<AgentId> {
        self.write.union(&self.read).copied().collect()
    }

    /// Returns `true` if `agent` is in the write set.
    pub fn writes(&self, agent: AgentId) -> bool {
        self.write.contains(&agent)
    }
}

impl Network {
    /// Footprint of `inst` against the current network.
    ///
    /// Matched agents are written, except that [`AccessMode::Declared`] moves
    /// an agent the rule declares [`Access::Read`] into the read set. Every
    /// agent one connection away from a matched agent is read.
    pub fn footprint(&self, inst: &RewriteInstance, mode: AccessMode) -> Footprint {
        let access = match mode {
            AccessMode::Exclusive => None,
            AccessMode::Declared => self.rules.get_by_id(inst.rule).map(Rule::access),
        };
        let mut fp = Footprint::default();
        let sides = [
            (inst.left, access.map(|a| a.left)),
            (inst.right, access.map(|a| a.right)),
        ];
        for (agent, declared) in sides {
            if declared == Some(Access::Read) {
                fp.read.insert(agent);
            } else {
                fp.write.insert(agent);
            }
        }
        for agent in inst.agents() {
            fp.read.extend(self.neighbours(agent));
        }
        // an agent read on one side and written on the other is written
        let written = fp.write.clone();
        fp.read.retain(|a| !written.contains(a));
        fp
    }
}
