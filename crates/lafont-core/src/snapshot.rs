// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical state digest.
//!
//! The digest covers agents in ascending id order (id, name, value, ports in
//! name order with their kinds) followed by connections in key order (both
//! endpoints in key order, then source/destination orientation and name).
//! Counts and strings are framed with 8-byte little-endian length prefixes.
//! Changing any of these rules changes every digest.
use blake3::Hasher;

use crate::ident::{hash_str, Hash};
use crate::network::Network;
use crate::port::{PortKind, PortRef};

fn hash_port_ref(hasher: &mut Hasher, port: &PortRef) {
    hasher.update(&port.agent.value().to_le_bytes());
    hash_str(hasher, &port.port);
}

impl Network {
    /// Canonical BLAKE3 digest of agents and connections.
    ///
    /// Rules and counters are excluded: two networks with equal digests hold
    /// the same graph, whatever rules they carry.
    pub fn state_digest(&self) -> Hash {
        let mut hasher = Hasher::new();
        hasher.update(b"lafont:state:");
        hasher.update(&(self.agent_count() as u64).to_le_bytes());
        for agent in self.all_agents() {
            hasher.update(&agent.id().value().to_le_bytes());
            hash_str(&mut hasher, agent.name());
            agent.value().write_digest(&mut hasher);
            let kinds = agent.port_kinds();
            hasher.update(&(kinds.len() as u64).to_le_bytes());
            for (name, kind) in &kinds {
                hash_str(&mut hasher, name);
                hasher.update(&[match kind {
                    PortKind::Main => 0u8,
                    PortKind::Auxiliary => 1u8,
                }]);
            }
        }
        hasher.update(&(self.connection_count() as u64).to_le_bytes());
        for conn in self.all_connections() {
            hash_port_ref(&mut hasher, conn.key().low());
            hash_port_ref(&mut hasher, conn.key().high());
            hasher.update(&[u8::from(conn.source() == conn.key().low())]);
            hash_str(&mut hasher, conn.name());
        }
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use crate::agent::Agent;
    use crate::network::Network;
    use crate::port::PortRef;
    use crate::value::Value;

    #[test]
    fn digest_tracks_values_and_wiring() {
        let mut net = Network::new();
        let a = net.add_agent(Agent::new("A", Value::Int(1))).unwrap();
        let b = net.add_agent(Agent::new("B", Value::Null)).unwrap();
        let empty = net.state_digest();
        net.connect_ports(&PortRef::new(a, "main"), &PortRef::new(b, "main")).unwrap();
        let wired = net.state_digest();
        assert_ne!(empty, wired);
        net.set_value(a, Value::Int(2)).unwrap();
        assert_ne!(wired, net.state_digest());
        net.set_value(a, Value::Int(1)).unwrap();
        assert_eq!(wired, net.state_digest());
    }

    #[test]
    fn digest_ignores_rules() {
        let mut net = Network::new();
        net.add_agent(Agent::new("A", Value::Null)).unwrap();
        let before = net.state_digest();
        let rule = crate::Rule::rewrite(
            "erase",
            crate::PortPattern::new("A", "main"),
            crate::PortPattern::new("A", "main"),
            crate::RewriteTemplate::new(),
        )
        .unwrap();
        net.add_rule(rule).unwrap();
        assert_eq!(before, net.state_digest());
    }
}
