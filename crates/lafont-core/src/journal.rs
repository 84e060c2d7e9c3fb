// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Undo journal for action-command application.
use crate::agent::Agent;
use crate::connection::{Connection, ConnectionKey};
use crate::ident::AgentId;
use crate::network::Network;
use crate::value::Value;

/// Inverse of one applied mutation.
#[derive(Debug)]
enum Undo {
    RemoveAgent(AgentId),
    RestoreAgent {
        agent: Agent,
        connections: Vec<Connection>,
    },
    RemoveConnection(ConnectionKey),
    RestoreConnection(Connection),
    RestoreValue {
        agent: AgentId,
        value: Value,
    },
}

/// Records inverses as mutations are applied so a failed step can be undone.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    undo: Vec<Undo>,
}

impl Journal {
    pub(crate) fn added_agent(&mut self, id: AgentId) {
        self.undo.push(Undo::RemoveAgent(id));
    }

    pub(crate) fn removed_agent(&mut self, agent: Agent, connections: Vec<Connection>) {
        self.undo.push(Undo::RestoreAgent { agent, connections });
    }

    pub(crate) fn added_connection(&mut self, key: ConnectionKey) {
        self.undo.push(Undo::RemoveConnection(key));
    }

    pub(crate) fn removed_connection(&mut self, conn: Connection) {
        self.undo.push(Undo::RestoreConnection(conn));
    }

    pub(crate) fn replaced_value(&mut self, agent: AgentId, value: Value) {
        self.undo.push(Undo::RestoreValue { agent, value });
    }

    /// Reverts every recorded mutation, newest first.
    pub(crate) fn rollback(self, network: &mut Network) {
        for undo in self.undo.into_iter().rev() {
            match undo {
                Undo::RemoveAgent(id) => {
                    network.detach_agent(id);
                }
                Undo::RestoreAgent { agent, connections } => {
                    network.insert_agent(agent);
                    for conn in connections {
                        network.insert_connection(conn);
                    }
                }
                Undo::RemoveConnection(key) => {
                    network.take_connection(&key);
                }
                Undo::RestoreConnection(conn) => network.insert_connection(conn),
                Undo::RestoreValue { agent, value } => {
                    if let Some(entry) = network.agent_entry_mut(agent) {
                        entry.replace_value(value);
                    }
                }
            }
        }
    }
}
