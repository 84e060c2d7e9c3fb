// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Plain-data records of network state.
//!
//! Records are what snapshotting, serialization and out-of-process workers
//! consume: ids, names, values and port names only, never engine objects.
use std::collections::BTreeMap;

use crate::agent::Agent;
use crate::ident::AgentId;
use crate::network::{Network, NetworkError};
use crate::port::{PortKind, PortRef, PortSpec};
use crate::value::Value;

/// Record for a single agent.
///
/// Invariants
/// - exactly one entry of `ports` has kind [`PortKind::Main`] when produced by
///   [`Network::records`]; [`Network::from_records`] synthesizes one otherwise.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentRecord {
    /// Agent id.
    pub id: AgentId,
    /// Agent name.
    pub name: String,
    /// Agent value.
    pub value: Value,
    /// Port names mapped to kinds.
    pub ports: BTreeMap<String, PortKind>,
}

impl From<&Agent> for AgentRecord {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id(),
            name: agent.name().to_owned(),
            value: agent.value().clone(),
            ports: agent.port_kinds(),
        }
    }
}

/// Record for a single connection.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionRecord {
    /// Agent owning the source port.
    pub source_agent: AgentId,
    /// Source port name.
    pub source_port: String,
    /// Agent owning the destination port.
    pub dest_agent: AgentId,
    /// Destination port name.
    pub dest_port: String,
    /// Connection name.
    pub name: String,
}

impl ConnectionRecord {
    /// Source endpoint.
    pub fn source(&self) -> PortRef {
        PortRef::new(self.source_agent, self.source_port.clone())
    }

    /// Destination endpoint.
    pub fn destination(&self) -> PortRef {
        PortRef::new(self.dest_agent, self.dest_port.clone())
    }
}

/// Full enumeration of a network's graph: agents in id order, connections in
/// key order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkRecords {
    /// Agents.
    pub agents: Vec<AgentRecord>,
    /// Connections.
    pub connections: Vec<ConnectionRecord>,
}

/// Errors from the CBOR record codec.
#[cfg(feature = "serde")]
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("cbor encode failed: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
    /// Decoding failed.
    #[error("cbor decode failed: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),
}

#[cfg(feature = "serde")]
impl NetworkRecords {
    /// Encodes the records as CBOR.
    ///
    /// # Errors
    /// [`CodecError::Encode`] if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    /// Decodes records from CBOR.
    ///
    /// # Errors
    /// [`CodecError::Decode`] if the bytes are not valid record CBOR.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(ciborium::from_reader(bytes)?)
    }
}

impl Network {
    /// Enumerates the graph as plain records.
    pub fn records(&self) -> NetworkRecords {
        NetworkRecords {
            agents: self.all_agents().map(AgentRecord::from).collect(),
            connections: self
                .all_connections()
                .map(|c| ConnectionRecord {
                    source_agent: c.source().agent,
                    source_port: c.source().port.clone(),
                    dest_agent: c.destination().agent,
                    dest_port: c.destination().port.clone(),
                    name: c.name().to_owned(),
                })
                .collect(),
        }
    }

    /// Rebuilds a rule-less network from records, keeping agent ids.
    ///
    /// Future [`AgentId::fresh`] ids are reserved above every restored id.
    ///
    /// # Errors
    /// [`NetworkError::IdOutOfRange`], [`NetworkError::InvalidAgent`] or
    /// [`NetworkError::DuplicateAgent`] for bad agent records; any [`Network::connect_ports`] error for bad
    /// connection records.
    pub fn from_records(records: &NetworkRecords) -> Result<Self, NetworkError> {
        let mut net = Self::new();
        net.restore_records(records)?;
        Ok(net)
    }

    /// Adds the records' agents and connections to this network.
    ///
    /// # Errors
    /// See [`Network::from_records`]. Records applied before the failing one
    /// stay in the network.
    pub fn restore_records(&mut self, records: &NetworkRecords) -> Result<(), NetworkError> {
        for rec in &records.agents {
            if rec.id.value() >= AgentId::RESTORE_LIMIT {
                return Err(NetworkError::IdOutOfRange(rec.id));
            }
            let specs = rec.ports.iter().map(|(name, kind)| PortSpec {
                name: name.clone(),
                kind: *kind,
            });
            let agent = Agent::build(rec.id, rec.name.clone(), rec.value.clone(), specs)
                .map_err(|source| NetworkError::InvalidAgent { id: rec.id, source })?;
            AgentId::reserve_through(rec.id);
            self.add_agent(agent)?;
        }
        for rec in &records.connections {
            self.connect_with(rec.source(), rec.destination(), Some(rec.name.clone()))?;
        }
        Ok(())
    }
}
