// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Network diffs and their merge into an authoritative network.
//!
//! # Policy
//!
//! Conflicts are bugs. A diff produced from an isolated copy only touches
//! state inside its footprint; if applying it contradicts the target network,
//! the footprint model lied and the merge fails loudly with
//! [`MergeConflict`] before anything is written.
use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::agent::Agent;
use crate::connection::{Connection, ConnectionKey};
use crate::ident::AgentId;
use crate::network::Network;
use crate::port::PortRef;
use crate::value::Value;

/// Reason a diff cannot be merged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeConflict {
    /// The diff adds an agent whose id is already present.
    #[error("agent {0} already exists")]
    AgentExists(AgentId),
    /// The diff removes or updates an agent that is absent.
    #[error("agent {0} does not exist")]
    MissingAgent(AgentId),
    /// The diff removes a connection that is absent.
    #[error("connection {0} <-> {1} does not exist")]
    MissingConnection(PortRef, PortRef),
    /// The diff connects a port that would still be occupied.
    #[error("port {0} is occupied")]
    PortOccupied(PortRef),
    /// The diff connects a port its agent does not have.
    #[error("port {0} does not exist")]
    UnknownPort(PortRef),
}

/// Structural difference between two states of a network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkDiff {
    added_agents: Vec<Agent>,
    removed_agents: Vec<AgentId>,
    value_updates: Vec<(AgentId, Value)>,
    added_connections: Vec<Connection>,
    removed_connections: Vec<ConnectionKey>,
}

/// Computes the diff that turns `before` into `after`.
///
/// Agents are matched by id, connections by key. A connection whose key
/// survives but whose orientation or name changed is reported as removed and
/// re-added.
pub fn diff_networks(before: &Network, after: &Network) -> NetworkDiff {
    let mut diff = NetworkDiff::default();
    for agent in after.all_agents() {
        match before.agent(agent.id()) {
            None => diff.added_agents.push(agent.clone()),
            Some(old) if old.value() != agent.value() => {
                diff.value_updates.push((agent.id(), agent.value().clone()));
            }
            Some(_) => {}
        }
    }
    diff.removed_agents = before
        .all_agents()
        .map(Agent::id)
        .filter(|id| !after.contains_agent(*id))
        .collect();
    for conn in before.all_connections() {
        if after.connection(conn.key()) != Some(conn) {
            diff.removed_connections.push(conn.key().clone());
        }
    }
    for conn in after.all_connections() {
        if before.connection(conn.key()) != Some(conn) {
            diff.added_connections.push(conn.clone());
        }
    }
    diff
}

impl NetworkDiff {
    /// Returns `true` if the diff changes nothing.
    pub fn is_empty(&self) -> bool {
        self.added_agents.is_empty()
            && self.removed_agents.is_empty()
            && self.value_updates.is_empty()
            && self.added_connections.is_empty()
            && self.removed_connections.is_empty()
    }

    /// Agents created.
    pub fn added_agents(&self) -> &[Agent] {
        &self.added_agents
    }

    /// Agents removed.
    pub fn removed_agents(&self) -> &[AgentId] {
        &self.removed_agents
    }

    /// New values of surviving agents.
    pub fn value_updates(&self) -> &[(AgentId, Value)] {
        &self.value_updates
    }

    /// Connections created.
    pub fn added_connections(&self) -> &[Connection] {
        &self.added_connections
    }

    /// Keys of connections removed.
    pub fn removed_connections(&self) -> &[ConnectionKey] {
        &self.removed_connections
    }

    /// Applies the diff to `network`.
    ///
    /// Removing an agent also drops its remaining connections in `network`.
    ///
    /// # Errors
    /// A [`MergeConflict`] if the diff contradicts `network`; in that case
    /// `network` is unchanged.
    pub fn apply_to(&self, network: &mut Network) -> Result<(), MergeConflict> {
        self.check(network)?;
        for key in &self.removed_connections {
            network.take_connection(key);
        }
        for id in &self.removed_agents {
            network.detach_agent(*id);
        }
        for agent in &self.added_agents {
            network.insert_agent(agent.clone());
        }
        for (id, value) in &self.value_updates {
            if let Some(entry) = network.agent_entry_mut(*id) {
                entry.replace_value(value.clone());
            }
        }
        for conn in &self.added_connections {
            network.insert_connection(conn.clone());
        }
        Ok(())
    }

    fn check(&self, network: &Network) -> Result<(), MergeConflict> {
        let removed: BTreeSet<AgentId> = self.removed_agents.iter().copied().collect();
        let added: BTreeMap<AgentId, &Agent> =
            self.added_agents.iter().map(|a| (a.id(), a)).collect();
        let dropped: BTreeSet<&ConnectionKey> = self.removed_connections.iter().collect();

        for id in added.keys() {
            if network.contains_agent(*id) {
                return Err(MergeConflict::AgentExists(*id));
            }
        }
        for id in self.removed_agents.iter().chain(self.value_updates.iter().map(|(id, _)| id)) {
            if !network.contains_agent(*id) {
                return Err(MergeConflict::MissingAgent(*id));
            }
        }
        for key in &self.removed_connections {
            if network.connection(key).is_none() {
                return Err(MergeConflict::MissingConnection(key.low().clone(), key.high().clone()));
            }
        }

        let mut claimed: BTreeSet<&PortRef> = BTreeSet::new();
        for conn in &self.added_connections {
            for port in conn.endpoints() {
                let agent = match added.get(&port.agent) {
                    Some(agent) => Some(*agent),
                    None if removed.contains(&port.agent) => None,
                    None => network.agent(port.agent),
                };
                let Some(agent) = agent else {
                    return Err(MergeConflict::MissingAgent(port.agent));
                };
                if !agent.has_port(&port.port) {
                    return Err(MergeConflict::UnknownPort(port.clone()));
                }
                let freed = network.connection_at(port).is_none_or(|existing| {
                    dropped.contains(existing.key())
                        || existing
                            .far_end(port)
                            .is_some_and(|far| removed.contains(&far.agent))
                });
                if !freed || !claimed.insert(port) {
                    return Err(MergeConflict::PortOccupied(port.clone()));
                }
            }
        }
        Ok(())
    }
}
