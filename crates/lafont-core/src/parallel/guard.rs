// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Footprint enforcement for batch-executed instances.
//!
//! After an instance runs on its isolated copy, its diff is checked against
//! the footprint it was scheduled with. Anything outside the footprint means
//! the analyzer's independence judgement could be wrong, so the batch stops
//! with [`NetworkError::FootprintViolation`](crate::NetworkError::FootprintViolation)
//! before the diff is merged.
use thiserror::Error;

use crate::connection::ConnectionKey;
use crate::ident::AgentId;
use crate::network::Network;
use crate::port::PortRef;

use super::diff::NetworkDiff;
use super::footprint::Footprint;

/// Classification of a footprint violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// Removed an agent outside the write set.
    AgentRemovalNotDeclared(AgentId),
    /// Changed the value of an agent outside the write set.
    ValueWriteNotDeclared(AgentId),
    /// Removed a connection touching no written agent.
    ConnectionRemovalNotDeclared(ConnectionKey),
    /// Connected a port that is neither new, written, nor freed by rewiring.
    ConnectionAddNotDeclared(PortRef),
}

/// A batch-executed rule touched state outside its footprint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rule `{rule}` violated its footprint: {kind:?}")]
pub struct FootprintViolation {
    /// Rule name.
    pub rule: String,
    /// What was touched.
    pub kind: ViolationKind,
}

/// Checks `diff` (computed on `isolated`, before firing) against `footprint`.
///
/// Added connection endpoints must be new agents, written agents, or ports
/// that were connected to a written agent before the step.
pub(crate) fn check_diff(
    rule: &str,
    footprint: &Footprint,
    isolated: &Network,
    diff: &NetworkDiff,
) -> Result<(), FootprintViolation> {
    let violation = |kind| FootprintViolation {
        rule: rule.to_owned(),
        kind,
    };
    for id in diff.removed_agents() {
        if !footprint.writes(*id) {
            return Err(violation(ViolationKind::AgentRemovalNotDeclared(*id)));
        }
    }
    for (id, _) in diff.value_updates() {
        if !footprint.writes(*id) {
            return Err(violation(ViolationKind::ValueWriteNotDeclared(*id)));
        }
    }
    for key in diff.removed_connections() {
        if !footprint.writes(key.low().agent) && !footprint.writes(key.high().agent) {
            return Err(violation(ViolationKind::ConnectionRemovalNotDeclared(key.clone())));
        }
    }
    let is_new = |agent: AgentId| diff.added_agents().iter().any(|a| a.id() == agent);
    for conn in diff.added_connections() {
        for port in conn.endpoints() {
            let rewired = isolated
                .neighbor(port)
                .is_some_and(|peer| footprint.writes(peer.agent));
            if !(is_new(port.agent) || footprint.writes(port.agent) || rewired) {
                return Err(violation(ViolationKind::ConnectionAddNotDeclared(port.clone())));
            }
        }
    }
    Ok(())
}
