// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and hashing utilities.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use blake3::Hasher;

/// Canonical 256-bit hash used for rule identities and state digests.
pub type Hash = [u8; 32];

/// Process-wide source of agent identities. Zero is never issued.
static NEXT_AGENT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique identifier for an agent.
///
/// Ids are issued by [`AgentId::fresh`] from a monotonically increasing
/// counter, so agents built by the factory before they are added to any
/// network can never collide with agents already living in one. Ids are
/// immutable for the lifetime of the agent and are never reused.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentId(pub u64);

impl AgentId {
    /// Upper bound, exclusive, for ids accepted from records.
    ///
    /// The ids above it stay free for [`AgentId::fresh`] after any restore.
    pub const RESTORE_LIMIT: u64 = u64::MAX >> 1;

    /// Issues a new identifier that has never been handed out in this process.
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_AGENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    /// Ensures future [`AgentId::fresh`] calls never return `id` or anything below it.
    ///
    /// Used when agents are restored from records so that restored ids and
    /// freshly issued ids stay disjoint.
    ///
    /// Callers reject ids at or above [`AgentId::RESTORE_LIMIT`] first.
    pub(crate) fn reserve_through(id: Self) {
        NEXT_AGENT_ID.fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Stable identifier for a registered rule.
///
/// Derived from the rule name by [`make_rule_id`], so every execution context
/// that registers the same rule set agrees on the ids without exchanging
/// handler code.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleId(pub Hash);

impl RuleId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Returns the first eight bytes as lowercase hex, for log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

/// Produces a stable, domain-separated rule identifier (prefix `b"rule:"`) using BLAKE3.
pub fn make_rule_id(name: &str) -> RuleId {
    let mut hasher = Hasher::new();
    hasher.update(b"rule:");
    hasher.update(name.as_bytes());
    RuleId(hasher.finalize().into())
}

/// Writes a length-prefixed string into `hasher` (8-byte little-endian length).
pub(crate) fn hash_str(hasher: &mut Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
