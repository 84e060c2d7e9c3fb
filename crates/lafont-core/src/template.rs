// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative replacement templates for rewrite rules.
//!
//! A [`RewriteTemplate`] describes the subgraph that replaces a matched pair:
//!
//! * `agents`: new agents, each tagged with a rewrite-local [`TemplateId`];
//! * `links`: connections among the new agents;
//! * `left_ports` / `right_ports`: for each port of the matched left/right
//!   agent, either the new-agent port its external connection moves to
//!   (`Some`) or `None` to drop that connection.
//!
//! Templates are validated as a whole before any graph mutation, so a bad
//! template never leaves a network half rewritten.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use crate::agent::{resolve_ports, Agent, AgentError};
use crate::ident::AgentId;
use crate::port::PortSpec;
use crate::value::Value;

/// Rewrite-local name for a new agent.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateId(String);

impl TemplateId {
    /// Wraps `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A port on a not-yet-instantiated template agent.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplatePort {
    /// Template agent.
    pub template: TemplateId,
    /// Port name on that agent.
    pub port: String,
}

impl TemplatePort {
    /// Addresses `port` on template agent `template`.
    pub fn new(template: impl Into<TemplateId>, port: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for TemplatePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.template, self.port)
    }
}

/// A new agent to create.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentTemplate {
    /// Rewrite-local id.
    pub id: TemplateId,
    /// Agent name.
    pub name: String,
    /// Initial value.
    pub value: Value,
    /// Port specs; an empty list yields a lone `main` port.
    pub ports: Vec<PortSpec>,
}

/// A connection between two new agents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateLink {
    /// One endpoint.
    pub a: TemplatePort,
    /// Other endpoint.
    pub b: TemplatePort,
    /// Optional connection name.
    pub name: Option<String>,
}

/// Which matched agent a port map belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchedSide {
    /// The agent matching the rule's left pattern.
    Left,
    /// The agent matching the rule's right pattern.
    Right,
}

impl fmt::Display for MatchedSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Errors raised while validating or resolving a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A link or port map names a template id with no agent entry.
    #[error("unresolved template reference `{0}`")]
    UnresolvedTemplateReference(TemplateId),
    /// Two agent entries share a template id.
    #[error("duplicate template id `{0}`")]
    DuplicateTemplateId(TemplateId),
    /// A link or port map names a port the template agent does not have.
    #[error("template agent `{template}` has no port `{port}`")]
    UnknownTemplatePort {
        /// Template agent.
        template: TemplateId,
        /// Missing port.
        port: String,
    },
    /// A template port is the target of more than one link or port map entry.
    #[error("template port `{0}` is used more than once")]
    TemplatePortReused(TemplatePort),
    /// An agent entry has a malformed port set.
    #[error("template agent `{template}`: {source}")]
    InvalidAgent {
        /// Template agent.
        template: TemplateId,
        /// Port-set error.
        source: AgentError,
    },
    /// A port map names a port the matched agent does not have.
    #[error("{side} agent `{agent}` has no port `{port}`")]
    UnknownMatchedPort {
        /// Which matched agent.
        side: MatchedSide,
        /// Name of the matched agent.
        agent: String,
        /// Missing port.
        port: String,
    },
}

/// Declarative replacement for a matched pair. See the module docs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RewriteTemplate {
    /// New agents.
    pub agents: Vec<AgentTemplate>,
    /// Connections among the new agents.
    pub links: Vec<TemplateLink>,
    /// Port map for the left matched agent.
    pub left_ports: BTreeMap<String, Option<TemplatePort>>,
    /// Port map for the right matched agent.
    pub right_ports: BTreeMap<String, Option<TemplatePort>>,
}

impl RewriteTemplate {
    /// An empty template: both matched agents vanish with all their connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new agent with a lone `main` port.
    pub fn agent(self, id: impl Into<TemplateId>, name: impl Into<String>, value: Value) -> Self {
        self.agent_with_ports(id, name, value, [])
    }

    /// Adds a new agent with explicit ports.
    pub fn agent_with_ports<I>(
        mut self,
        id: impl Into<TemplateId>,
        name: impl Into<String>,
        value: Value,
        ports: I,
    ) -> Self
    where
        I: IntoIterator<Item = PortSpec>,
    {
        self.agents.push(AgentTemplate {
            id: id.into(),
            name: name.into(),
            value,
            ports: ports.into_iter().collect(),
        });
        self
    }

    /// Connects two new-agent ports.
    pub fn link(mut self, a: TemplatePort, b: TemplatePort) -> Self {
        self.links.push(TemplateLink { a, b, name: None });
        self
    }

    /// Redirects the external connection on left port `port` to `target`.
    pub fn map_left(mut self, port: impl Into<String>, target: TemplatePort) -> Self {
        self.left_ports.insert(port.into(), Some(target));
        self
    }

    /// Drops the connection on left port `port`.
    pub fn drop_left(mut self, port: impl Into<String>) -> Self {
        self.left_ports.insert(port.into(), None);
        self
    }

    /// Redirects the external connection on right port `port` to `target`.
    pub fn map_right(mut self, port: impl Into<String>, target: TemplatePort) -> Self {
        self.right_ports.insert(port.into(), Some(target));
        self
    }

    /// Drops the connection on right port `port`.
    pub fn drop_right(mut self, port: impl Into<String>) -> Self {
        self.right_ports.insert(port.into(), None);
        self
    }

    /// Port map for `side`.
    pub fn port_map(&self, side: MatchedSide) -> &BTreeMap<String, Option<TemplatePort>> {
        match side {
            MatchedSide::Left => &self.left_ports,
            MatchedSide::Right => &self.right_ports,
        }
    }

    /// Checks every internal reference of the template.
    ///
    /// # Errors
    /// - [`TemplateError::DuplicateTemplateId`] / [`TemplateError::InvalidAgent`]
    ///   for malformed agent entries;
    /// - [`TemplateError::UnresolvedTemplateReference`] when a link or port map
    ///   names an unknown template id;
    /// - [`TemplateError::UnknownTemplatePort`] when it names an unknown port;
    /// - [`TemplateError::TemplatePortReused`] when a new-agent port would end
    ///   up with two connections.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let mut ports: BTreeMap<&TemplateId, BTreeSet<String>> = BTreeMap::new();
        for agent in &self.agents {
            if ports.contains_key(&agent.id) {
                return Err(TemplateError::DuplicateTemplateId(agent.id.clone()));
            }
            let resolved =
                resolve_ports(agent.ports.iter().cloned()).map_err(|source| {
                    TemplateError::InvalidAgent {
                        template: agent.id.clone(),
                        source,
                    }
                })?;
            ports.insert(&agent.id, resolved.specs.into_keys().collect());
        }

        let mut used: BTreeSet<&TemplatePort> = BTreeSet::new();
        let link_ends = self.links.iter().flat_map(|l| [&l.a, &l.b]);
        let map_targets = self
            .left_ports
            .values()
            .chain(self.right_ports.values())
            .flatten();
        for target in link_ends.chain(map_targets) {
            let Some(known) = ports.get(&target.template) else {
                return Err(TemplateError::UnresolvedTemplateReference(
                    target.template.clone(),
                ));
            };
            if !known.contains(&target.port) {
                return Err(TemplateError::UnknownTemplatePort {
                    template: target.template.clone(),
                    port: target.port.clone(),
                });
            }
            if !used.insert(target) {
                return Err(TemplateError::TemplatePortReused(target.clone()));
            }
        }
        Ok(())
    }

    /// Creates the template's agents with fresh ids, in declaration order.
    pub(crate) fn instantiate(&self) -> Result<Vec<(TemplateId, Agent)>, TemplateError> {
        self.agents
            .iter()
            .map(|t| {
                Agent::build(AgentId::fresh(), t.name.clone(), t.value.clone(), t.ports.clone())
                    .map(|agent| (t.id.clone(), agent))
                    .map_err(|source| TemplateError::InvalidAgent {
                        template: t.id.clone(),
                        source,
                    })
            })
            .collect()
    }
}
