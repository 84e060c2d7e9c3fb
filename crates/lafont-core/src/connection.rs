// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Connections: edges binding exactly two ports.
use crate::ident::AgentId;
use crate::port::PortRef;

/// Order-independent key of a connection.
///
/// The two endpoints are stored sorted, so `ConnectionKey::new(a, b)` and
/// `ConnectionKey::new(b, a)` are equal. Networks keep connections in key
/// order, which is the order `step` scans them in.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionKey {
    low: PortRef,
    high: PortRef,
}

impl ConnectionKey {
    /// Builds the key for the connection between `a` and `b`.
    pub fn new(a: &PortRef, b: &PortRef) -> Self {
        if a <= b {
            Self {
                low: a.clone(),
                high: b.clone(),
            }
        } else {
            Self {
                low: b.clone(),
                high: a.clone(),
            }
        }
    }

    /// The smaller endpoint.
    pub fn low(&self) -> &PortRef {
        &self.low
    }

    /// The larger endpoint.
    pub fn high(&self) -> &PortRef {
        &self.high
    }

    /// Returns the endpoint opposite `port`, if `port` is an endpoint.
    pub fn other(&self, port: &PortRef) -> Option<&PortRef> {
        if &self.low == port {
            Some(&self.high)
        } else if &self.high == port {
            Some(&self.low)
        } else {
            None
        }
    }

    /// Returns `true` if either endpoint belongs to `agent`.
    pub fn touches(&self, agent: AgentId) -> bool {
        self.low.agent == agent || self.high.agent == agent
    }
}

/// An edge between two bound ports.
///
/// `source` and `destination` record the orientation the caller used; they
/// carry no semantics beyond that. Lookups go through [`ConnectionKey`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    key: ConnectionKey,
    source: PortRef,
    destination: PortRef,
    name: String,
}

impl Connection {
    pub(crate) fn new(source: PortRef, destination: PortRef, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| format!("{source}<->{destination}"));
        Self {
            key: ConnectionKey::new(&source, &destination),
            source,
            destination,
            name,
        }
    }

    /// Lookup key.
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// Endpoint recorded as the source.
    pub fn source(&self) -> &PortRef {
        &self.source
    }

    /// Endpoint recorded as the destination.
    pub fn destination(&self) -> &PortRef {
        &self.destination
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the endpoint opposite `port`, if `port` is an endpoint.
    pub fn far_end(&self, port: &PortRef) -> Option<&PortRef> {
        self.key.other(port)
    }

    /// Both endpoints, source first.
    pub fn endpoints(&self) -> [&PortRef; 2] {
        [&self.source, &self.destination]
    }

    /// Returns a copy with `old` replaced by `new`, keeping orientation and name.
    pub(crate) fn rewired(&self, old: &PortRef, new: PortRef) -> Self {
        let (source, destination) = if &self.source == old {
            (new, self.destination.clone())
        } else {
            (self.source.clone(), new)
        };
        Self::new(source, destination, Some(self.name.clone()))
    }
}
