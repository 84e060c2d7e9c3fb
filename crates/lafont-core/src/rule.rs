// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rule definitions: patterns, behaviors, and the canonical pattern key.
use std::fmt;

use thiserror::Error;

use crate::agent::Agent;
use crate::ident::{make_rule_id, AgentId, RuleId};
use crate::port::PortRef;
use crate::template::{RewriteTemplate, TemplateError};
use crate::value::ValueError;
use crate::view::NetworkView;

/// One side of a rule pattern: an agent name and one of its ports.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortPattern {
    /// Agent name to match.
    pub agent: String,
    /// Port name to match.
    pub port: String,
}

impl PortPattern {
    /// Matches port `port` on agents named `agent`.
    pub fn new(agent: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            port: port.into(),
        }
    }

    /// Returns `true` when `agent` is named like this pattern and `port` is the pattern port.
    pub fn matches(&self, agent: &Agent, port: &str) -> bool {
        self.agent == agent.name() && self.port == port
    }
}

impl fmt::Display for PortPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.agent, self.port)
    }
}

/// Canonical, orientation-free key of a pattern.
///
/// The two sides are stored sorted, so a connection `(A.p1, B.p2)` finds a rule
/// registered as either `(A.p1, B.p2)` or `(B.p2, A.p1)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternKey {
    low: PortPattern,
    high: PortPattern,
}

impl PatternKey {
    /// Builds the canonical key for `a` and `b`.
    pub fn new(a: PortPattern, b: PortPattern) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Key for the connection between `a.port_a` and `b.port_b`.
    pub fn of(a: &Agent, port_a: &str, b: &Agent, port_b: &str) -> Self {
        Self::new(
            PortPattern::new(a.name(), port_a),
            PortPattern::new(b.name(), port_b),
        )
    }

    /// Sorted sides.
    pub fn sides(&self) -> [&PortPattern; 2] {
        [&self.low, &self.high]
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} >< {}", self.low, self.high)
    }
}

/// A rule's pattern in declaration order.
///
/// The left agent is the first argument of action handlers and the owner of
/// the template's `left_ports` map, however the matched connection is oriented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RulePattern {
    /// Left side.
    pub left: PortPattern,
    /// Right side.
    pub right: PortPattern,
}

impl RulePattern {
    /// Canonical key of this pattern.
    pub fn key(&self) -> PatternKey {
        PatternKey::new(self.left.clone(), self.right.clone())
    }

    /// Orients a matched connection: returns `(left, right)` agent ids when the
    /// endpoints `a.port_a` / `b.port_b` satisfy this pattern in either order.
    pub fn orient(&self, a: &Agent, port_a: &str, b: &Agent, port_b: &str) -> Option<(AgentId, AgentId)> {
        if self.left.matches(a, port_a) && self.right.matches(b, port_b) {
            Some((a.id(), b.id()))
        } else if self.left.matches(b, port_b) && self.right.matches(a, port_a) {
            Some((b.id(), a.id()))
        } else {
            None
        }
    }
}

/// Rule kind, derived from the behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuleKind {
    /// Imperative handler.
    Action,
    /// Declarative graph replacement.
    Rewrite,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Action => "action",
            Self::Rewrite => "rewrite",
        })
    }
}

/// Structural command returned by an action handler.
///
/// Commands are applied in order after the handler returns. Removal of an
/// unknown agent or connection is a no-op.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionCommand {
    /// Add an agent (typically built by the handler).
    AddAgent(Agent),
    /// Connect two ports.
    AddConnection {
        /// One endpoint.
        from: PortRef,
        /// Other endpoint.
        to: PortRef,
        /// Optional connection name.
        name: Option<String>,
    },
    /// Remove an agent and every connection incident to it.
    RemoveAgent(AgentId),
    /// Remove the connection between two ports.
    RemoveConnection {
        /// One endpoint.
        a: PortRef,
        /// Other endpoint.
        b: PortRef,
    },
}

impl ActionCommand {
    /// Shorthand for an unnamed [`ActionCommand::AddConnection`].
    pub fn connect(from: PortRef, to: PortRef) -> Self {
        Self::AddConnection {
            from,
            to,
            name: None,
        }
    }

    /// Shorthand for [`ActionCommand::RemoveConnection`].
    pub fn disconnect(a: PortRef, b: PortRef) -> Self {
        Self::RemoveConnection { a, b }
    }
}

/// Failure reported by an action handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates an error with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ValueError> for HandlerError {
    fn from(err: ValueError) -> Self {
        Self::new(err.to_string())
    }
}

/// Imperative rule handler.
///
/// Receives working copies of the left and right matched agents (mutations of
/// their values are committed only if the handler and all returned commands
/// succeed) plus a read-only view of the network as it was before the step.
///
/// The matched connection is **not** consumed implicitly; return
/// [`ActionCommand::RemoveConnection`] (or remove an agent) to sever it.
pub type ActionFn =
    for<'a> fn(&mut Agent, &mut Agent, NetworkView<'a>) -> Result<Vec<ActionCommand>, HandlerError>;

/// Template thunk evaluated with the matched `(left, right)` agents at firing time.
pub type TemplateFn = fn(&Agent, &Agent) -> RewriteTemplate;

/// What a rule does when it fires.
#[derive(Clone)]
pub enum RuleBehavior {
    /// Run an imperative handler.
    Action(ActionFn),
    /// Splice a fixed template.
    Rewrite(RewriteTemplate),
    /// Splice the template produced from the matched agents.
    RewriteWith(TemplateFn),
}

impl RuleBehavior {
    /// Kind implied by this behavior.
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Action(_) => RuleKind::Action,
            Self::Rewrite(_) | Self::RewriteWith(_) => RuleKind::Rewrite,
        }
    }
}

impl fmt::Debug for RuleBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(_) => f.write_str("Action(..)"),
            Self::Rewrite(t) => f.debug_tuple("Rewrite").field(t).finish(),
            Self::RewriteWith(_) => f.write_str("RewriteWith(..)"),
        }
    }
}

/// Declared access to a matched agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Access {
    /// The rule only reads the agent.
    Read,
    /// The rule may mutate or remove the agent.
    #[default]
    Write,
}

/// Per-side access declaration, consulted only by
/// [`AccessMode::Declared`](crate::AccessMode::Declared) batch partitioning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleAccess {
    /// Access to the left agent.
    pub left: Access,
    /// Access to the right agent.
    pub right: Access,
}

/// Errors raised while defining or registering rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The rule definition is malformed.
    #[error("invalid rule definition `{rule}`: {reason}")]
    InvalidRuleDefinition {
        /// Rule name.
        rule: String,
        /// What is wrong with it.
        reason: String,
    },
    /// The rule's rewrite template is malformed.
    #[error("rule `{rule}`: {source}")]
    Template {
        /// Rule name.
        rule: String,
        /// Template error.
        source: TemplateError,
    },
    /// A rule with the same name is already registered.
    #[error("duplicate rule name: {0}")]
    DuplicateRuleName(String),
    /// A rule with the same canonical pattern is already registered.
    #[error("pattern {pattern} already handled by rule `{existing}`")]
    DuplicatePattern {
        /// Canonical pattern.
        pattern: PatternKey,
        /// Name of the registered rule.
        existing: String,
    },
}

/// A registered rewrite description.
///
/// Each rule owns:
/// * a deterministic identifier (`id`, derived from the name)
/// * a human-readable name
/// * a pattern in declaration order
/// * a behavior (action handler or rewrite template)
/// * an optional access declaration for batch partitioning
///
/// Rules are validated by their constructors and immutable afterwards.
#[derive(Clone)]
pub struct Rule {
    id: RuleId,
    name: String,
    pattern: RulePattern,
    behavior: RuleBehavior,
    access: RuleAccess,
}

impl Rule {
    /// Defines an action rule.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRuleDefinition`] for an empty rule, agent or port name.
    pub fn action(
        name: impl Into<String>,
        left: PortPattern,
        right: PortPattern,
        handler: ActionFn,
    ) -> Result<Self, RuleError> {
        Self::build(name.into(), left, right, RuleBehavior::Action(handler))
    }

    /// Defines a rewrite rule with a fixed template.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRuleDefinition`] for empty names and
    /// [`RuleError::Template`] when the template does not validate.
    pub fn rewrite(
        name: impl Into<String>,
        left: PortPattern,
        right: PortPattern,
        template: RewriteTemplate,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        template.validate().map_err(|source| RuleError::Template {
            rule: name.clone(),
            source,
        })?;
        Self::build(name, left, right, RuleBehavior::Rewrite(template))
    }

    /// Defines a rewrite rule whose template is computed from the matched agents.
    ///
    /// The produced template is validated at firing time, before any mutation.
    ///
    /// # Errors
    /// Returns [`RuleError::InvalidRuleDefinition`] for an empty rule, agent or port name.
    pub fn rewrite_with(
        name: impl Into<String>,
        left: PortPattern,
        right: PortPattern,
        template: TemplateFn,
    ) -> Result<Self, RuleError> {
        Self::build(name.into(), left, right, RuleBehavior::RewriteWith(template))
    }

    fn build(
        name: String,
        left: PortPattern,
        right: PortPattern,
        behavior: RuleBehavior,
    ) -> Result<Self, RuleError> {
        let invalid = |reason: &str| RuleError::InvalidRuleDefinition {
            rule: name.clone(),
            reason: reason.to_owned(),
        };
        if name.is_empty() {
            return Err(invalid("rule name is empty"));
        }
        for side in [&left, &right] {
            if side.agent.is_empty() {
                return Err(invalid("pattern agent name is empty"));
            }
            if side.port.is_empty() {
                return Err(invalid("pattern port name is empty"));
            }
        }
        Ok(Self {
            id: make_rule_id(&name),
            name,
            pattern: RulePattern { left, right },
            behavior,
            access: RuleAccess::default(),
        })
    }

    /// Replaces the access declaration.
    pub fn with_access(mut self, access: RuleAccess) -> Self {
        self.access = access;
        self
    }

    /// Deterministic id.
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind.
    pub fn kind(&self) -> RuleKind {
        self.behavior.kind()
    }

    /// Pattern in declaration order.
    pub fn pattern(&self) -> &RulePattern {
        &self.pattern
    }

    /// Canonical pattern key.
    pub fn key(&self) -> PatternKey {
        self.pattern.key()
    }

    /// Behavior.
    pub fn behavior(&self) -> &RuleBehavior {
        &self.behavior
    }

    /// Access declaration.
    pub fn access(&self) -> RuleAccess {
        self.access
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}
