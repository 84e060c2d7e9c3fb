// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Agents: the nodes of an interaction net.
use std::collections::BTreeMap;

use thiserror::Error;

use crate::ident::AgentId;
use crate::port::{Port, PortKind, PortRef, PortSpec, MAIN_PORT};
use crate::value::Value;

/// Error returned by [`Agent::with_ports`] for a malformed port set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// Two port specs share a name.
    #[error("duplicate port name `{0}`")]
    DuplicatePort(String),
    /// More than one port spec has kind `main`.
    #[error("more than one main port: `{first}` and `{second}`")]
    MultipleMainPorts {
        /// First main port seen.
        first: String,
        /// Second main port seen.
        second: String,
    },
    /// A port spec has an empty name.
    #[error("port names must not be empty")]
    EmptyPortName,
}

/// A node of the net: identity, name, value payload and ports.
///
/// Invariants
/// - exactly one port has kind [`PortKind::Main`];
/// - port names are unique within the agent;
/// - `id` never changes.
///
/// The value is only mutable through `&mut Agent`, which the engine hands out
/// to action handlers (on a working copy) and to nothing else.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    id: AgentId,
    name: String,
    value: Value,
    ports: BTreeMap<String, Port>,
    main: String,
}

impl Agent {
    /// Creates an agent with a single `main` port.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        let id = AgentId::fresh();
        let mut ports = BTreeMap::new();
        ports.insert(MAIN_PORT.to_owned(), Port::new(id, PortSpec::main(MAIN_PORT)));
        Self {
            id,
            name: name.into(),
            value,
            ports,
            main: MAIN_PORT.to_owned(),
        }
    }

    /// Creates an agent with the given ports.
    ///
    /// When no spec has kind `main`, a principal port is appended. It is named
    /// `main` unless an auxiliary port already uses that name, in which case
    /// the first free name of `main_1`, `main_2`, ... is used.
    ///
    /// # Errors
    /// Returns [`AgentError`] for duplicate or empty port names and for more
    /// than one `main` port.
    pub fn with_ports<I>(name: impl Into<String>, value: Value, ports: I) -> Result<Self, AgentError>
    where
        I: IntoIterator<Item = PortSpec>,
    {
        Self::build(AgentId::fresh(), name.into(), value, ports)
    }

    /// Rebuilds an agent with a known id (records restore, template instantiation).
    pub(crate) fn build<I>(
        id: AgentId,
        name: String,
        value: Value,
        specs: I,
    ) -> Result<Self, AgentError>
    where
        I: IntoIterator<Item = PortSpec>,
    {
        let resolved = resolve_ports(specs)?;
        let ports = resolved
            .specs
            .into_iter()
            .map(|(port_name, spec)| (port_name, Port::new(id, spec)))
            .collect();
        Ok(Self {
            id,
            name,
            value,
            ports,
            main: resolved.main,
        })
    }

    /// Agent id.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Agent name, used for rule matching.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable access to the value.
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Consumes the agent, returning its value.
    pub fn into_value(self) -> Value {
        self.value
    }

    pub(crate) fn replace_value(&mut self, value: Value) -> Value {
        std::mem::replace(&mut self.value, value)
    }

    /// Iterates ports in name order.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// Looks up a port by name.
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }

    /// Returns `true` if the agent has a port called `name`.
    pub fn has_port(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// Name of the principal port.
    pub fn main_port_name(&self) -> &str {
        &self.main
    }

    /// Address of the principal port.
    pub fn main(&self) -> PortRef {
        PortRef::new(self.id, self.main.clone())
    }

    /// Address of the port `name` on this agent (the port need not exist).
    pub fn port_ref(&self, name: &str) -> PortRef {
        PortRef::new(self.id, name)
    }

    /// Port names mapped to their kinds, in name order.
    pub fn port_kinds(&self) -> BTreeMap<String, PortKind> {
        self.ports
            .iter()
            .map(|(name, port)| (name.clone(), port.kind()))
            .collect()
    }
}

/// A validated port set with its principal port identified.
pub(crate) struct ResolvedPorts {
    /// Port specs keyed by name, including any synthesized main port.
    pub(crate) specs: BTreeMap<String, PortSpec>,
    /// Name of the principal port.
    pub(crate) main: String,
}

/// Validates `specs` and appends a principal port when none is given.
pub(crate) fn resolve_ports<I>(specs: I) -> Result<ResolvedPorts, AgentError>
where
    I: IntoIterator<Item = PortSpec>,
{
    let mut out: BTreeMap<String, PortSpec> = BTreeMap::new();
    let mut main: Option<String> = None;
    for spec in specs {
        if spec.name.is_empty() {
            return Err(AgentError::EmptyPortName);
        }
        if out.contains_key(&spec.name) {
            return Err(AgentError::DuplicatePort(spec.name));
        }
        if spec.kind.is_main() {
            if let Some(first) = &main {
                return Err(AgentError::MultipleMainPorts {
                    first: first.clone(),
                    second: spec.name,
                });
            }
            main = Some(spec.name.clone());
        }
        out.insert(spec.name.clone(), spec);
    }
    let main = main.unwrap_or_else(|| {
        let synthesized = synthesize_main_name(&out);
        out.insert(synthesized.clone(), PortSpec::main(synthesized.clone()));
        synthesized
    });
    Ok(ResolvedPorts { specs: out, main })
}

fn synthesize_main_name(ports: &BTreeMap<String, PortSpec>) -> String {
    let mut candidate = MAIN_PORT.to_owned();
    let mut n = 0usize;
    while ports.contains_key(&candidate) {
        n += 1;
        candidate = format!("{MAIN_PORT}_{n}");
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_count(agent: &Agent) -> usize {
        agent.ports().filter(|p| p.kind().is_main()).count()
    }

    #[test]
    fn new_agent_has_single_main_port() {
        let a = Agent::new("Counter", Value::Null);
        assert_eq!(main_count(&a), 1);
        assert_eq!(a.main_port_name(), MAIN_PORT);
        assert_eq!(a.main(), PortRef::new(a.id(), MAIN_PORT));
    }

    #[test]
    fn missing_main_port_is_synthesized() {
        let a = Agent::with_ports("Dup", Value::Null, [PortSpec::aux("left"), PortSpec::aux("right")])
            .unwrap();
        assert_eq!(main_count(&a), 1);
        assert_eq!(a.port("main").map(Port::kind), Some(PortKind::Main));
        assert_eq!(a.ports().count(), 3);
    }

    #[test]
    fn synthesized_main_avoids_auxiliary_named_main() {
        let a = Agent::with_ports(
            "Odd",
            Value::Null,
            [PortSpec::aux("main"), PortSpec::aux("main_1")],
        )
        .unwrap();
        assert_eq!(main_count(&a), 1);
        assert_eq!(a.main_port_name(), "main_2");
        assert_eq!(a.port("main").map(Port::kind), Some(PortKind::Auxiliary));
    }

    #[test]
    fn explicit_main_port_is_kept() {
        let a = Agent::with_ports("P", Value::Null, [PortSpec::main("principal"), PortSpec::aux("x")])
            .unwrap();
        assert_eq!(main_count(&a), 1);
        assert_eq!(a.main_port_name(), "principal");
        assert!(!a.has_port("main"));
    }

    #[test]
    fn malformed_port_sets_are_rejected() {
        assert_eq!(
            Agent::with_ports("A", Value::Null, [PortSpec::aux("x"), PortSpec::aux("x")]),
            Err(AgentError::DuplicatePort("x".into()))
        );
        assert!(matches!(
            Agent::with_ports("A", Value::Null, [PortSpec::main("a"), PortSpec::main("b")]),
            Err(AgentError::MultipleMainPorts { .. })
        ));
        assert_eq!(
            Agent::with_ports("A", Value::Null, [PortSpec::aux("")]),
            Err(AgentError::EmptyPortName)
        );
    }

    #[test]
    fn ports_are_bound_to_their_agent() {
        let a = Agent::with_ports("A", Value::Null, [PortSpec::aux("x")]).unwrap();
        assert!(a.ports().all(|p| p.agent() == a.id()));
        assert_eq!(a.port("x").map(Port::port_ref), Some(a.port_ref("x")));
    }
}
