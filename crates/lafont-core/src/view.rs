// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read-only view over a [`Network`].
//!
//! Action handlers observe the network through [`NetworkView`] and change it
//! only through the commands they return. The view exposes queries only:
//! do not add methods that hand out `&Network` or `&mut` access.
use crate::agent::Agent;
use crate::connection::Connection;
use crate::ident::AgentId;
use crate::port::PortRef;
use crate::network::Network;

/// Read-only, `Copy` view over a [`Network`].
#[derive(Debug, Clone, Copy)]
pub struct NetworkView<'a> {
    network: &'a Network,
}

impl<'a> NetworkView<'a> {
    pub(crate) fn new(network: &'a Network) -> Self {
        Self { network }
    }

    /// Agent `id`.
    pub fn agent(self, id: AgentId) -> Option<&'a Agent> {
        self.network.agent(id)
    }

    /// Agents named `name`, in id order.
    pub fn agents_named(self, name: &'a str) -> impl Iterator<Item = &'a Agent> + 'a {
        self.network.agents_named(name)
    }

    /// Every agent, in id order.
    pub fn all_agents(self) -> impl Iterator<Item = &'a Agent> {
        self.network.all_agents()
    }

    /// Every connection, in key order.
    pub fn all_connections(self) -> impl Iterator<Item = &'a Connection> {
        self.network.all_connections()
    }

    /// The connection on `port`, if any.
    pub fn connection_at(self, port: &PortRef) -> Option<&'a Connection> {
        self.network.connection_at(port)
    }

    /// The port connected to `port`, if any.
    pub fn neighbor(self, port: &PortRef) -> Option<&'a PortRef> {
        self.network.neighbor(port)
    }

    /// Returns `true` if `port` is connected.
    pub fn is_port_connected(self, port: &PortRef) -> bool {
        self.network.is_port_connected(port)
    }

    /// Number of agents.
    pub fn agent_count(self) -> usize {
        self.network.agent_count()
    }

    /// Number of connections.
    pub fn connection_count(self) -> usize {
        self.network.connection_count()
    }
}
