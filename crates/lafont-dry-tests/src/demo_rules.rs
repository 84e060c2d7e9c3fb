// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Demo rules used across integration tests.
//!
//! Agent vocabulary:
//! - `Counter { count }`: accumulates amounts.
//! - `Increment { amount }` / `Decrement { amount }`: ports `main`,
//!   `secondary`, and (increment only) `debug`.
//! - `Tick`: bumps a counter by one without consuming the connection.
//! - `Fault`: its handler always fails.
//! - `Overreach`: its commands fail halfway through.
//! - `Eraser`, `Con { l, r }`, `Leaf`: a tiny erasure calculus.
use lafont_core::{
    ActionCommand, Agent, HandlerError, NetworkView, PortPattern, PortSpec, RewriteTemplate, Rule,
    TemplatePort, Value,
};

/// Name of [`counter_increment_rule`].
pub const COUNTER_INCREMENT: &str = "counter/increment";
/// Name of [`increment_decrement_rule`].
pub const INCREMENT_DECREMENT: &str = "increment/decrement";
/// Name of [`tick_rule`].
pub const TICK: &str = "counter/tick";
/// Name of [`fault_rule`].
pub const FAULT: &str = "counter/fault";
/// Name of [`overreach_rule`].
pub const OVERREACH: &str = "counter/overreach";
/// Name of [`eraser_annihilation_rule`].
pub const ERASER_ANNIHILATION: &str = "eraser/annihilate";
/// Name of [`eraser_con_rule`].
pub const ERASER_CON: &str = "eraser/con";

/// `Counter { count }` with a lone main port.
pub fn counter(count: i64) -> Agent {
    Agent::new("Counter", Value::map([("count", Value::Int(count))]))
}

/// `Increment { amount }` with ports `main`, `secondary`, `debug`.
#[allow(clippy::expect_used)]
pub fn increment(amount: i64) -> Agent {
    Agent::with_ports(
        "Increment",
        Value::map([("amount", Value::Int(amount))]),
        increment_ports(),
    )
    .expect("increment ports are distinct")
}

fn increment_ports() -> [PortSpec; 3] {
    [
        PortSpec::main("main"),
        PortSpec::aux("secondary"),
        PortSpec::aux("debug"),
    ]
}

/// `Decrement { amount }` with ports `main`, `secondary`.
#[allow(clippy::expect_used)]
pub fn decrement(amount: i64) -> Agent {
    Agent::with_ports(
        "Decrement",
        Value::map([("amount", Value::Int(amount))]),
        [PortSpec::main("main"), PortSpec::aux("secondary")],
    )
    .expect("decrement ports are distinct")
}

/// `Con` with auxiliary ports `l` and `r`; the principal port is synthesized.
#[allow(clippy::expect_used)]
pub fn con() -> Agent {
    Agent::with_ports("Con", Value::Null, [PortSpec::aux("l"), PortSpec::aux("r")])
        .expect("con ports are distinct")
}

fn counter_increment(
    counter: &mut Agent,
    inc: &mut Agent,
    _: NetworkView<'_>,
) -> Result<Vec<ActionCommand>, HandlerError> {
    let amount = inc.value().int_field("amount")?;
    *counter.value_mut().int_field_mut("count")? += amount;
    Ok(vec![ActionCommand::disconnect(counter.main(), inc.main())])
}

/// `Counter.main >< Increment.main`: `count += amount`, then severs the
/// matched connection.
#[allow(clippy::expect_used)]
pub fn counter_increment_rule() -> Rule {
    Rule::action(
        COUNTER_INCREMENT,
        PortPattern::new("Counter", "main"),
        PortPattern::new("Increment", "main"),
        counter_increment,
    )
    .expect("demo rule definition is well formed")
}

fn tick(
    counter: &mut Agent,
    _: &mut Agent,
    _: NetworkView<'_>,
) -> Result<Vec<ActionCommand>, HandlerError> {
    *counter.value_mut().int_field_mut("count")? += 1;
    Ok(Vec::new())
}

/// `Counter.main >< Tick.main`: `count += 1` and leaves the connection in
/// place, so it fires forever.
#[allow(clippy::expect_used)]
pub fn tick_rule() -> Rule {
    Rule::action(
        TICK,
        PortPattern::new("Counter", "main"),
        PortPattern::new("Tick", "main"),
        tick,
    )
    .expect("demo rule definition is well formed")
}

fn fault(
    counter: &mut Agent,
    _: &mut Agent,
    _: NetworkView<'_>,
) -> Result<Vec<ActionCommand>, HandlerError> {
    *counter.value_mut().int_field_mut("count")? += 1_000;
    Err(HandlerError::new("fault injected"))
}

/// `Counter.main >< Fault.main`: mutates its copy of the counter, then fails.
#[allow(clippy::expect_used)]
pub fn fault_rule() -> Rule {
    Rule::action(
        FAULT,
        PortPattern::new("Counter", "main"),
        PortPattern::new("Fault", "main"),
        fault,
    )
    .expect("demo rule definition is well formed")
}

fn overreach(
    counter: &mut Agent,
    other: &mut Agent,
    _: NetworkView<'_>,
) -> Result<Vec<ActionCommand>, HandlerError> {
    *counter.value_mut().int_field_mut("count")? += 100;
    let marker = Agent::new("Marker", Value::Null);
    let marker_main = marker.main();
    Ok(vec![
        ActionCommand::AddAgent(marker),
        ActionCommand::disconnect(counter.main(), other.main()),
        ActionCommand::connect(marker_main.clone(), counter.main()),
        // marker.main is taken by now
        ActionCommand::connect(marker_main, other.main()),
    ])
}

/// `Counter.main >< Overreach.main`: its last command fails, so every
/// earlier effect must be rolled back.
#[allow(clippy::expect_used)]
pub fn overreach_rule() -> Rule {
    Rule::action(
        OVERREACH,
        PortPattern::new("Counter", "main"),
        PortPattern::new("Overreach", "main"),
        overreach,
    )
    .expect("demo rule definition is well formed")
}

fn increment_decrement(inc: &Agent, dec: &Agent) -> RewriteTemplate {
    let amount = |agent: &Agent| agent.value().int_field("amount").unwrap_or(0);
    RewriteTemplate::new()
        .agent_with_ports(
            "net",
            "Increment",
            Value::map([("amount", Value::Int(amount(inc) - amount(dec)))]),
            increment_ports(),
        )
        .map_left("main", TemplatePort::new("net", "main"))
        .drop_left("debug")
        .drop_right("main")
}

/// `Increment.secondary >< Decrement.secondary`: replaces both with one
/// `Increment { amount: inc - dec }`. The increment's `main` wire moves to
/// the new agent; its `debug` wire and the decrement's `main` wire are
/// dropped.
#[allow(clippy::expect_used)]
pub fn increment_decrement_rule() -> Rule {
    Rule::rewrite_with(
        INCREMENT_DECREMENT,
        PortPattern::new("Increment", "secondary"),
        PortPattern::new("Decrement", "secondary"),
        increment_decrement,
    )
    .expect("demo rule definition is well formed")
}

/// `Eraser.main >< Eraser.main`: both vanish.
#[allow(clippy::expect_used)]
pub fn eraser_annihilation_rule() -> Rule {
    Rule::rewrite(
        ERASER_ANNIHILATION,
        PortPattern::new("Eraser", "main"),
        PortPattern::new("Eraser", "main"),
        RewriteTemplate::new(),
    )
    .expect("demo rule definition is well formed")
}

/// `Eraser.main >< Con.main`: the eraser is copied onto both of the
/// constructor's auxiliary wires.
#[allow(clippy::expect_used)]
pub fn eraser_con_rule() -> Rule {
    Rule::rewrite(
        ERASER_CON,
        PortPattern::new("Eraser", "main"),
        PortPattern::new("Con", "main"),
        RewriteTemplate::new()
            .agent("e1", "Eraser", Value::Null)
            .agent("e2", "Eraser", Value::Null)
            .map_right("l", TemplatePort::new("e1", "main"))
            .map_right("r", TemplatePort::new("e2", "main")),
    )
    .expect("demo rule definition is well formed")
}

/// Every demo rule.
pub fn all_rules() -> Vec<Rule> {
    vec![
        counter_increment_rule(),
        increment_decrement_rule(),
        tick_rule(),
        fault_rule(),
        overreach_rule(),
        eraser_annihilation_rule(),
        eraser_con_rule(),
    ]
}

