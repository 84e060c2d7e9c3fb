// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Conflict-free batch rewriting.
//!
//! Batch, partition, execute in isolation, diff, merge.

mod analyzer;
mod diff;
mod exec;
mod footprint;
mod guard;

pub use analyzer::{DependencyAnalyzer, InstanceGroup};
pub use diff::{diff_networks, MergeConflict, NetworkDiff};
pub use exec::{BatchExecutor, BatchReport};
pub use footprint::Footprint;
pub use guard::{FootprintViolation, ViolationKind};
