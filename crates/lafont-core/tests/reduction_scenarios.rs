// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

use lafont_core::{
    Agent, ConnectionKey, NetworkConfig, NetworkError, PortRef, RuleKind, RuleQuery, Value,
};
use lafont_dry_tests::{
    add, all_rules, con_tree, counter, counter_increment_rule, counter_pair, eraser_con_rule,
    eraser_annihilation_rule, inc_dec_scene, increment, increment_decrement_rule,
    init_test_tracing, int_of, shape, tick_rule, wire, NetworkBuilder, COUNTER_INCREMENT, TICK,
};

#[test]
fn counter_absorbs_increment_and_drops_the_connection() {
    init_test_tracing();
    let mut net = NetworkBuilder::new().rule(counter_increment_rule()).build();
    let pair = counter_pair(&mut net, 0, 5);

    assert!(net.step().expect("step"));
    assert_eq!(int_of(&net, pair.counter, "count"), Some(5));
    assert_eq!(net.connection_count(), 0);
    assert!(!net.is_port_connected(&PortRef::new(pair.counter, "main")));
    // both agents survive an action
    assert_eq!(net.agent_count(), 2);
    assert_eq!(net.stats().actions, 1);
    assert!(!net.step().expect("second step"));
}

#[test]
fn increment_and_decrement_fuse_into_one_increment() {
    init_test_tracing();
    let mut net = NetworkBuilder::new().rule(increment_decrement_rule()).build();
    let scene = inc_dec_scene(&mut net);

    assert!(net.step().expect("step"));
    assert!(!net.contains_agent(scene.increment));
    assert!(!net.contains_agent(scene.decrement));

    let fused: Vec<&Agent> = net.agents_named("Increment").collect();
    assert_eq!(fused.len(), 1);
    let fused = fused[0];
    assert_eq!(fused.value().int_field("amount"), Ok(2));
    assert!(net.agents_named("Decrement").next().is_none());

    assert_eq!(net.connection_count(), 1);
    assert_eq!(
        net.neighbor(&fused.port_ref("main")),
        Some(&PortRef::new(scene.x, "main"))
    );
    assert!(!net.is_port_connected(&PortRef::new(scene.y, "main")));
    assert!(!net.is_port_connected(&PortRef::new(scene.z, "main")));
    assert_eq!(net.stats().rewrites, 1);
}

#[test]
fn step_without_active_pair_changes_nothing() {
    let mut net = NetworkBuilder::new().rules(all_rules()).build();
    let c = add(&mut net, counter(3));
    let x = add(&mut net, Agent::new("X", Value::Null));
    wire(&mut net, c, "main", x, "main");
    let before = net.state_digest();

    assert_eq!(net.step(), Ok(false));
    assert_eq!(net.state_digest(), before);
    assert_eq!(net.stats().reductions, 0);
}

#[test]
fn matching_is_independent_of_connection_orientation() {
    let mut net = NetworkBuilder::new().rule(counter_increment_rule()).build();
    let i = add(&mut net, increment(4));
    let c = add(&mut net, counter(1));
    // increment is the source this time
    wire(&mut net, i, "main", c, "main");
    let pairs = net.active_pairs();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].left, pairs[0].right), (c, i));
    assert!(net.step().expect("step"));
    assert_eq!(int_of(&net, c, "count"), Some(5));
}

#[test]
fn action_leaves_the_matched_connection_unless_told_otherwise() {
    let mut net = NetworkBuilder::new().rule(tick_rule()).build();
    let c = add(&mut net, counter(0));
    let t = add(&mut net, Agent::new("Tick", Value::Null));
    wire(&mut net, c, "main", t, "main");

    assert!(net.step().expect("step"));
    assert_eq!(int_of(&net, c, "count"), Some(1));
    assert!(net
        .connection(&ConnectionKey::new(
            &PortRef::new(c, "main"),
            &PortRef::new(t, "main")
        ))
        .is_some());
    assert!(net.has_active_pair());
}

#[test]
fn reduce_stops_at_normal_form() {
    let mut net = NetworkBuilder::new().rules(all_rules()).build();
    let pairs: Vec<_> = (1..=4).map(|k| counter_pair(&mut net, 10, k)).collect();

    let report = net.reduce(None).expect("reduce");
    assert_eq!(report.steps, 4);
    assert!(!report.budget_exhausted);
    for (k, pair) in (1..=4).zip(&pairs) {
        assert_eq!(int_of(&net, pair.counter, "count"), Some(10 + k));
    }
}

#[test]
fn reduce_respects_its_budget() {
    init_test_tracing();
    let mut net = NetworkBuilder::new()
        .config(NetworkConfig::default().with_max_steps(7))
        .rule(tick_rule())
        .build();
    let c = add(&mut net, counter(0));
    let t = add(&mut net, Agent::new("Tick", Value::Null));
    wire(&mut net, c, "main", t, "main");

    let report = net.reduce(None).expect("reduce");
    assert_eq!(report.steps, 7);
    assert!(report.budget_exhausted);
    assert_eq!(int_of(&net, c, "count"), Some(7));

    let report = net.reduce(Some(3)).expect("explicit cap");
    assert_eq!(report.steps, 3);
    assert_eq!(int_of(&net, c, "count"), Some(10));

    assert_eq!(net.reduce(Some(0)).expect("zero cap").steps, 0);
}

#[test]
fn eraser_consumes_a_constructor_tree_down_to_its_leaves() {
    let mut net = NetworkBuilder::new()
        .rule(eraser_con_rule())
        .rule(eraser_annihilation_rule())
        .build();
    con_tree(&mut net, 3);

    let report = net.reduce(None).expect("reduce");
    // one firing per constructor
    assert_eq!(report.steps, 7);
    assert!(net.agents_named("Con").next().is_none());
    let expected: Vec<String> = std::iter::repeat_n("Eraser".to_owned(), 8)
        .chain(std::iter::repeat_n("Leaf".to_owned(), 8))
        .collect();
    assert_eq!(shape(&net), expected);
    for leaf in net.agents_named("Leaf") {
        let peer = net.neighbor(&leaf.main()).expect("leaf is wired");
        assert_eq!(net.agent(peer.agent).map(Agent::name), Some("Eraser"));
    }
}

#[test]
fn erasers_annihilate() {
    let mut net = NetworkBuilder::new().rule(eraser_annihilation_rule()).build();
    let a = add(&mut net, Agent::new("Eraser", Value::Null));
    let b = add(&mut net, Agent::new("Eraser", Value::Null));
    wire(&mut net, a, "main", b, "main");
    assert_eq!(net.reduce(None).expect("reduce").steps, 1);
    assert_eq!(net.agent_count(), 0);
    assert_eq!(net.connection_count(), 0);
}

#[test]
fn stale_instance_is_rejected() {
    let mut net = NetworkBuilder::new().rule(counter_increment_rule()).build();
    counter_pair(&mut net, 0, 1);
    let inst = net.active_pairs()[0];
    net.fire(&inst).expect("first fire");
    assert!(matches!(net.fire(&inst), Err(NetworkError::NoMatch { .. })));
}

#[test]
fn rules_can_be_queried_and_removed() {
    let mut net = NetworkBuilder::new().rules(all_rules()).build();
    let counters = net.find_rules(&RuleQuery::any().involving("Counter"));
    assert_eq!(counters.len(), 4);
    let rewrites = net.find_rules(&RuleQuery::any().of_kind(RuleKind::Rewrite));
    assert_eq!(rewrites.len(), 3);

    let pair = counter_pair(&mut net, 0, 2);
    assert!(net.remove_rule(COUNTER_INCREMENT));
    assert!(!net.remove_rule(COUNTER_INCREMENT));
    assert!(!net.step().expect("no rule, no step"));
    assert_eq!(int_of(&net, pair.counter, "count"), Some(0));
    assert!(net.rule(TICK).is_some());
}
