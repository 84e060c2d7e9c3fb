// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ports: typed interface slots on agents.
use std::fmt;

use crate::ident::AgentId;

/// Name given to the synthesized principal port.
pub const MAIN_PORT: &str = "main";

/// Kind of an agent port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PortKind {
    /// The principal port. Every agent has exactly one.
    Main,
    /// Any other port.
    Auxiliary,
}

impl PortKind {
    /// Returns `true` for [`PortKind::Main`].
    pub fn is_main(self) -> bool {
        matches!(self, Self::Main)
    }
}

/// Unbound port description: what a caller asks the agent factory for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortSpec {
    /// Port name, unique within its agent.
    pub name: String,
    /// Port kind.
    pub kind: PortKind,
}

impl PortSpec {
    /// Describes a principal port called `name`.
    pub fn main(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Main,
        }
    }

    /// Describes an auxiliary port called `name`.
    pub fn aux(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Auxiliary,
        }
    }
}

/// A port bound to its owning agent.
///
/// Ports exist only as part of an [`Agent`](crate::Agent); they are created by
/// the agent factory and dropped with the agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Port {
    name: String,
    kind: PortKind,
    agent: AgentId,
}

impl Port {
    pub(crate) fn new(agent: AgentId, spec: PortSpec) -> Self {
        Self {
            name: spec.name,
            kind: spec.kind,
            agent,
        }
    }

    /// Port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port kind.
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Id of the owning agent.
    pub fn agent(&self) -> AgentId {
        self.agent
    }

    /// Returns the address of this port.
    pub fn port_ref(&self) -> PortRef {
        PortRef::new(self.agent, self.name.clone())
    }
}

/// Address of a port: owning agent id plus port name.
///
/// This is the plain-data handle used by connection keys, action commands and
/// diffs; it never borrows the agent.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortRef {
    /// Owning agent.
    pub agent: AgentId,
    /// Port name on that agent.
    pub port: String,
}

impl PortRef {
    /// Addresses port `port` on `agent`.
    pub fn new(agent: AgentId, port: impl Into<String>) -> Self {
        Self {
            agent,
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.agent, self.port)
    }
}
