// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Matching and reduction: `step`, `reduce`, `fire`.
//!
//! A connection is an active pair when its two endpoints belong to different
//! agents and the canonical key `(agent name, port name) x (agent name, port
//! name)` of its endpoints is registered. Connections are scanned in
//! [`ConnectionKey`] order, so the selection made by `step` is deterministic
//! for a given network state.
use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, trace, warn};

use crate::agent::Agent;
use crate::connection::{Connection, ConnectionKey};
use crate::ident::{AgentId, RuleId};
use crate::journal::Journal;
use crate::network::{Network, NetworkError};
use crate::port::PortRef;
use crate::rule::{ActionCommand, ActionFn, PatternKey, Rule, RuleBehavior, RuleKind, TemplateFn};
use crate::template::RewriteTemplate;

/// One firable match: a rule and the agents bound to its left and right sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewriteInstance {
    /// Matched rule.
    pub rule: RuleId,
    /// Agent matching the rule's left pattern.
    pub left: AgentId,
    /// Agent matching the rule's right pattern.
    pub right: AgentId,
}

impl RewriteInstance {
    /// Both matched agents, left first.
    pub fn agents(&self) -> [AgentId; 2] {
        [self.left, self.right]
    }

    /// Returns `true` if `other` binds any agent this instance binds.
    pub fn shares_agent(&self, other: &Self) -> bool {
        self.agents().iter().any(|a| other.agents().contains(a))
    }

    /// The same instance with its agents exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            rule: self.rule,
            left: self.right,
            right: self.left,
        }
    }
}

impl fmt::Display for RewriteInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.rule, self.left, self.right)
    }
}

/// Outcome of [`Network::reduce`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReduceReport {
    /// Successful rule firings.
    pub steps: usize,
    /// `true` when the step cap was reached while active pairs remained.
    pub budget_exhausted: bool,
}

impl Network {
    /// Returns the instance `conn` would fire, if it is an active pair.
    pub fn match_connection(&self, conn: &Connection) -> Option<RewriteInstance> {
        let [pa, pb] = conn.endpoints();
        if pa.agent == pb.agent {
            return None;
        }
        let a = self.agent(pa.agent)?;
        let b = self.agent(pb.agent)?;
        let rule = self.rules.lookup(&PatternKey::of(a, &pa.port, b, &pb.port))?;
        let (left, right) = rule.pattern().orient(a, &pa.port, b, &pb.port)?;
        Some(RewriteInstance {
            rule: rule.id(),
            left,
            right,
        })
    }

    /// Every current active pair, in connection key order.
    pub fn active_pairs(&self) -> Vec<RewriteInstance> {
        self.all_connections()
            .filter_map(|c| self.match_connection(c))
            .collect()
    }

    /// Returns `true` if some connection is an active pair.
    pub fn has_active_pair(&self) -> bool {
        self.all_connections()
            .any(|c| self.match_connection(c).is_some())
    }

    /// Key of the connection that makes `inst` an active pair.
    fn instance_key(rule: &Rule, inst: &RewriteInstance) -> ConnectionKey {
        let pattern = rule.pattern();
        ConnectionKey::new(
            &PortRef::new(inst.left, pattern.left.port.clone()),
            &PortRef::new(inst.right, pattern.right.port.clone()),
        )
    }

    /// Returns `true` if `inst` is still an active pair of this network.
    pub fn is_firable(&self, inst: &RewriteInstance) -> bool {
        let Some(rule) = self.rules.get_by_id(inst.rule) else {
            return false;
        };
        let symmetric = rule.pattern().left == rule.pattern().right;
        self.connection(&Self::instance_key(rule, inst))
            .and_then(|c| self.match_connection(c))
            .is_some_and(|m| m == *inst || (symmetric && m == inst.swapped()))
    }

    /// Fires the first active pair in connection order.
    ///
    /// Returns `Ok(false)` and leaves the network untouched when there is no
    /// active pair.
    ///
    /// # Errors
    /// Propagates [`Network::fire`] errors; the network is unchanged.
    pub fn step(&mut self) -> Result<bool, NetworkError> {
        let Some(inst) = self
            .all_connections()
            .find_map(|c| self.match_connection(c))
        else {
            return Ok(false);
        };
        self.fire(&inst)?;
        Ok(true)
    }

    /// Steps until no active pair remains or `max_steps` firings happened.
    ///
    /// `None` uses [`NetworkConfig::max_steps`](crate::NetworkConfig::max_steps).
    /// Hitting the cap is not an error: it is logged and reported through
    /// [`ReduceReport::budget_exhausted`].
    ///
    /// # Errors
    /// The first failing step's error. Steps completed before it stay applied
    /// and are counted in [`Network::stats`]; the failed step is not.
    #[instrument(level = "debug", skip(self), fields(agents = self.agent_count()))]
    pub fn reduce(&mut self, max_steps: Option<usize>) -> Result<ReduceReport, NetworkError> {
        let cap = max_steps.unwrap_or(self.config.max_steps);
        let mut steps = 0;
        while steps < cap {
            if !self.step()? {
                return Ok(ReduceReport {
                    steps,
                    budget_exhausted: false,
                });
            }
            steps += 1;
        }
        let budget_exhausted = self.has_active_pair();
        if budget_exhausted {
            warn!(cap, "reduce hit its step budget with active pairs remaining");
        }
        Ok(ReduceReport {
            steps,
            budget_exhausted,
        })
    }

    /// Fires `inst`.
    ///
    /// # Errors
    /// - [`NetworkError::NoMatch`] if `inst` is not a current active pair;
    /// - [`NetworkError::Handler`] if an action handler fails;
    /// - [`NetworkError::Template`] if a rewrite template is malformed;
    /// - any primitive error raised by an action command.
    ///
    /// On error the network is left exactly as it was.
    pub fn fire(&mut self, inst: &RewriteInstance) -> Result<(), NetworkError> {
        if !self.is_firable(inst) {
            return Err(NetworkError::NoMatch {
                rule: inst.rule,
                left: inst.left,
                right: inst.right,
            });
        }
        let rules = Arc::clone(&self.rules);
        let Some(rule) = rules.get_by_id(inst.rule) else {
            return Err(NetworkError::NoMatch {
                rule: inst.rule,
                left: inst.left,
                right: inst.right,
            });
        };
        debug!(rule = rule.name(), kind = %rule.kind(), left = %inst.left, right = %inst.right, "fire");
        match rule.behavior() {
            RuleBehavior::Action(handler) => self.run_action(rule, *handler, inst)?,
            RuleBehavior::Rewrite(template) => self.splice(rule, template, inst)?,
            RuleBehavior::RewriteWith(thunk) => {
                let template = self.evaluate_template(*thunk, inst)?;
                self.splice(rule, &template, inst)?;
            }
        }
        self.stats.reductions += 1;
        match rule.kind() {
            RuleKind::Action => self.stats.actions += 1,
            RuleKind::Rewrite => self.stats.rewrites += 1,
        }
        Ok(())
    }

    fn evaluate_template(
        &self,
        thunk: TemplateFn,
        inst: &RewriteInstance,
    ) -> Result<RewriteTemplate, NetworkError> {
        let left = self.agent(inst.left).ok_or(NetworkError::UnknownAgent(inst.left))?;
        let right = self.agent(inst.right).ok_or(NetworkError::UnknownAgent(inst.right))?;
        Ok(thunk(left, right))
    }

    /// Runs `handler` on working copies, then commits values and commands.
    ///
    /// Only the agents' values are written back; anything else the handler
    /// does to its copies is discarded.
    fn run_action(
        &mut self,
        rule: &Rule,
        handler: ActionFn,
        inst: &RewriteInstance,
    ) -> Result<(), NetworkError> {
        let mut left = self
            .agent(inst.left)
            .cloned()
            .ok_or(NetworkError::UnknownAgent(inst.left))?;
        let mut right = self
            .agent(inst.right)
            .cloned()
            .ok_or(NetworkError::UnknownAgent(inst.right))?;
        let commands =
            handler(&mut left, &mut right, self.view()).map_err(|source| NetworkError::Handler {
                rule: rule.name().to_owned(),
                source,
            })?;

        let mut journal = Journal::default();
        let outcome = self.commit_action(
            &mut journal,
            [(inst.left, left), (inst.right, right)],
            commands,
        );
        if let Err(err) = outcome {
            debug!(rule = rule.name(), %err, "action rolled back");
            journal.rollback(self);
            return Err(err);
        }
        Ok(())
    }

    fn commit_action(
        &mut self,
        journal: &mut Journal,
        copies: [(AgentId, Agent); 2],
        commands: Vec<ActionCommand>,
    ) -> Result<(), NetworkError> {
        for (id, copy) in copies {
            let entry = self
                .agent_entry_mut(id)
                .ok_or(NetworkError::UnknownAgent(id))?;
            let previous = entry.replace_value(copy.into_value());
            journal.replaced_value(id, previous);
        }
        for command in commands {
            trace!(?command, "apply");
            match command {
                ActionCommand::AddAgent(agent) => {
                    let id = self.add_agent(agent)?;
                    journal.added_agent(id);
                }
                ActionCommand::AddConnection { from, to, name } => {
                    let key = self.connect_with(from, to, name)?;
                    journal.added_connection(key);
                }
                ActionCommand::RemoveAgent(id) => {
                    if let Some((agent, connections)) = self.detach_agent(id) {
                        journal.removed_agent(agent, connections);
                    }
                }
                ActionCommand::RemoveConnection { a, b } => {
                    if let Some(conn) = self.take_connection(&ConnectionKey::new(&a, &b)) {
                        journal.removed_connection(conn);
                    }
                }
            }
        }
        Ok(())
    }
}
