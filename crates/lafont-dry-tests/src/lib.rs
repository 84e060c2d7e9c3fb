// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared fixtures for lafont tests.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`demo_rules`] - Demo agents and rules (counters, increments, erasers)
//! - [`logging`] - Test log capture
//! - [`network`] - Network builders and scene constructors
//! - [`rng`] - Deterministic xorshift generator

pub mod demo_rules;
pub mod logging;
pub mod network;
pub mod rng;

// Re-export commonly used items at crate root for convenience
pub use demo_rules::{
    all_rules, con, counter, counter_increment_rule, decrement, eraser_annihilation_rule,
    eraser_con_rule, fault_rule, increment, increment_decrement_rule, overreach_rule, tick_rule,
    COUNTER_INCREMENT, ERASER_ANNIHILATION, ERASER_CON, FAULT, INCREMENT_DECREMENT, OVERREACH,
    TICK,
};
pub use network::{
    add, con_tree, counter_pair, counters, inc_dec_scene, int_of, shape, wire, CounterPair,
    IncDecScene, NetworkBuilder,
};
pub use logging::init_test_tracing;
pub use rng::XorShift64;
