// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! lafont-core: interaction-net reduction engine.
//!
//! A [`Network`] holds agents (nodes with a name, a [`Value`] and typed
//! ports), connections binding pairs of ports, and a registry of [`Rule`]s
//! keyed by the canonical pattern of the two ports they join. Reduction
//! repeatedly finds a connection matching a rule and fires it: action rules
//! run a handler that edits values and returns structural commands, rewrite
//! rules splice a [`RewriteTemplate`] into the place of the matched pair.
//!
//! [`parallel`] partitions the current active pairs into conflict-free groups
//! and executes each group on isolated copies, merging the resulting diffs.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod agent;
mod config;
mod connection;
mod ident;
mod journal;
mod network;
/// Conflict-free batch execution: footprints, analyzer, diffs and executor.
pub mod parallel;
mod port;
mod record;
mod reduce;
mod registry;
mod rule;
mod snapshot;
mod splice;
mod template;
mod value;
mod view;

/// Agents and their construction errors.
pub use agent::{Agent, AgentError};
/// Engine and analyzer configuration.
pub use config::{
    AccessMode, AnalyzerConfig, NetworkConfig, DEFAULT_MAX_GROUP_SIZE, DEFAULT_MAX_STEPS,
    DEFAULT_MIN_GROUP_SIZE,
};
/// Connections and their order-independent keys.
pub use connection::{Connection, ConnectionKey};
/// Identifiers and hashing.
pub use ident::{make_rule_id, AgentId, Hash, RuleId};
/// The network, its errors and counters.
pub use network::{Network, NetworkError, ReductionStats};
/// Ports.
pub use port::{Port, PortKind, PortRef, PortSpec, MAIN_PORT};
#[cfg(feature = "serde")]
pub use record::CodecError;
/// Plain-data records of network state.
pub use record::{AgentRecord, ConnectionRecord, NetworkRecords};
/// Reduction results and matched instances.
pub use reduce::{ReduceReport, RewriteInstance};
/// Rule registry.
pub use registry::{RuleQuery, RuleRegistry};
/// Rules, patterns and handler types.
pub use rule::{
    Access, ActionCommand, ActionFn, HandlerError, PatternKey, PortPattern, Rule, RuleAccess,
    RuleBehavior, RuleError, RuleKind, RulePattern, TemplateFn,
};
/// Rewrite templates.
pub use template::{
    AgentTemplate, MatchedSide, RewriteTemplate, TemplateError, TemplateId, TemplateLink,
    TemplatePort,
};
/// Agent values.
pub use value::{Value, ValueError};
/// Read-only network view for action handlers.
pub use view::NetworkView;
