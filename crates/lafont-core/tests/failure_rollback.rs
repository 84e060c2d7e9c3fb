// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

use lafont_core::{
    Agent, AgentError, MatchedSide, Network, NetworkError, PortPattern, PortRef, PortSpec,
    RewriteTemplate, Rule, RuleError, TemplateError, TemplateId, TemplatePort, Value,
};
use lafont_dry_tests::{
    add, counter, fault_rule, increment, init_test_tracing, int_of, overreach_rule, wire,
    NetworkBuilder, FAULT,
};

#[test]
fn failing_handler_leaves_the_network_untouched() {
    init_test_tracing();
    let mut net = NetworkBuilder::new().rule(fault_rule()).build();
    let c = add(&mut net, counter(1));
    let f = add(&mut net, Agent::new("Fault", Value::Null));
    wire(&mut net, c, "main", f, "main");
    let before = net.state_digest();

    let err = net.step().unwrap_err();
    let NetworkError::Handler { rule, source } = &err else {
        panic!("expected handler error, got {err:?}");
    };
    assert_eq!(rule, FAULT);
    assert_eq!(source.message(), "fault injected");
    assert_eq!(net.state_digest(), before);
    assert_eq!(int_of(&net, c, "count"), Some(1));
    assert_eq!(net.stats().reductions, 0);
}

#[test]
fn failing_command_rolls_back_earlier_commands_and_values() {
    init_test_tracing();
    let mut net = NetworkBuilder::new().rule(overreach_rule()).build();
    let c = add(&mut net, counter(0));
    let o = add(&mut net, Agent::new("Overreach", Value::Null));
    wire(&mut net, c, "main", o, "main");
    let before = net.state_digest();

    let err = net.step().unwrap_err();
    assert!(
        matches!(&err, NetworkError::PortAlreadyConnected { peer, .. } if *peer == PortRef::new(c, "main")),
        "unexpected error {err:?}"
    );
    assert_eq!(net.state_digest(), before);
    assert_eq!(net.agent_count(), 2);
    assert!(net.agents_named("Marker").next().is_none());
    assert_eq!(
        net.neighbor(&PortRef::new(c, "main")),
        Some(&PortRef::new(o, "main"))
    );
    assert_eq!(int_of(&net, c, "count"), Some(0));
}

#[test]
fn reduce_propagates_the_first_error_after_keeping_earlier_steps() {
    let mut net = NetworkBuilder::new()
        .rule(fault_rule())
        .rule(lafont_dry_tests::counter_increment_rule())
        .build();
    let c1 = add(&mut net, counter(0));
    let i = add(&mut net, increment(2));
    let c2 = add(&mut net, counter(0));
    let f = add(&mut net, Agent::new("Fault", Value::Null));
    // counter/increment is scanned first: its agents have lower ids
    wire(&mut net, c1, "main", i, "main");
    wire(&mut net, c2, "main", f, "main");

    let before = net.stats().reductions;
    assert!(matches!(
        net.reduce(None),
        Err(NetworkError::Handler { .. })
    ));
    // only the firing before the fault is counted
    assert_eq!(net.stats().reductions - before, 1);
    assert_eq!(net.stats().actions, 1);
    assert_eq!(int_of(&net, c1, "count"), Some(2));
    assert_eq!(int_of(&net, c2, "count"), Some(0));
}

#[test]
fn template_with_unknown_reference_is_rejected_at_definition() {
    let template = RewriteTemplate::new()
        .agent("a", "A", Value::Null)
        .map_left("main", TemplatePort::new("ghost", "main"));
    let err = Rule::rewrite(
        "broken",
        PortPattern::new("L", "main"),
        PortPattern::new("R", "main"),
        template,
    )
    .unwrap_err();
    assert_eq!(
        err,
        RuleError::Template {
            rule: "broken".to_owned(),
            source: TemplateError::UnresolvedTemplateReference(TemplateId::new("ghost")),
        }
    );
}

#[test]
fn template_reusing_a_port_is_rejected() {
    let template = RewriteTemplate::new()
        .agent("a", "A", Value::Null)
        .agent("b", "B", Value::Null)
        .link(TemplatePort::new("a", "main"), TemplatePort::new("b", "main"))
        .map_right("main", TemplatePort::new("a", "main"));
    assert_eq!(
        template.validate(),
        Err(TemplateError::TemplatePortReused(TemplatePort::new("a", "main")))
    );
}

fn bad_side_template(_: &Agent, _: &Agent) -> RewriteTemplate {
    RewriteTemplate::new()
        .agent("n", "N", Value::Null)
        .map_left("nope", TemplatePort::new("n", "main"))
}

#[test]
fn computed_template_naming_a_missing_matched_port_fails_before_mutation() {
    let mut net = Network::new();
    net.add_rule(
        Rule::rewrite_with(
            "bad-side",
            PortPattern::new("L", "main"),
            PortPattern::new("R", "main"),
            bad_side_template,
        )
        .unwrap(),
    )
    .unwrap();
    let l = add(&mut net, Agent::new("L", Value::Null));
    let r = add(&mut net, Agent::new("R", Value::Null));
    wire(&mut net, l, "main", r, "main");
    let before = net.state_digest();

    let err = net.step().unwrap_err();
    assert_eq!(
        err,
        NetworkError::Template {
            rule: "bad-side".to_owned(),
            source: TemplateError::UnknownMatchedPort {
                side: MatchedSide::Left,
                agent: "L".to_owned(),
                port: "nope".to_owned(),
            },
        }
    );
    assert_eq!(net.state_digest(), before);
}

#[test]
fn duplicate_rule_registrations_are_rejected() {
    let mut net = NetworkBuilder::new().rule(fault_rule()).build();
    assert!(matches!(
        net.add_rule(fault_rule()),
        Err(RuleError::DuplicateRuleName(name)) if name == FAULT
    ));
    let same_pattern = Rule::rewrite(
        "other-name",
        PortPattern::new("Fault", "main"),
        PortPattern::new("Counter", "main"),
        RewriteTemplate::new(),
    )
    .unwrap();
    assert!(matches!(
        net.add_rule(same_pattern),
        Err(RuleError::DuplicatePattern { .. })
    ));
    assert!(matches!(
        Rule::rewrite(
            "",
            PortPattern::new("A", "main"),
            PortPattern::new("B", "main"),
            RewriteTemplate::new()
        ),
        Err(RuleError::InvalidRuleDefinition { .. })
    ));
}

#[test]
fn connection_primitives_enforce_linearity() {
    let mut net = Network::new();
    let a = add(&mut net, Agent::new("A", Value::Null));
    let b = add(&mut net, Agent::new("B", Value::Null));
    let c = add(&mut net, Agent::new("C", Value::Null));
    let pa = PortRef::new(a, "main");
    let pb = PortRef::new(b, "main");
    let pc = PortRef::new(c, "main");

    net.connect_ports(&pa, &pb).unwrap();
    assert_eq!(
        net.connect_ports(&pc, &pa),
        Err(NetworkError::PortAlreadyConnected {
            port: pa.clone(),
            peer: pb.clone(),
        })
    );
    assert_eq!(
        net.connect_ports(&pc, &pc),
        Err(NetworkError::SelfConnection(pc.clone()))
    );
    assert_eq!(
        net.connect_ports(&pc, &PortRef::new(c, "aux")),
        Err(NetworkError::UnknownPort(PortRef::new(c, "aux")))
    );
    let ghost = Agent::new("Ghost", Value::Null).id();
    assert_eq!(
        net.connect_ports(&pc, &PortRef::new(ghost, "main")),
        Err(NetworkError::UnknownAgent(ghost))
    );

    // reversed orientation finds the same connection
    assert!(net.disconnect_ports(&pb, &pa));
    assert!(!net.disconnect_ports(&pa, &pb));
    assert!(!net.is_port_connected(&pa));

    net.connect_named(&pa, &pb, "wire").unwrap();
    assert_eq!(net.connection_at(&pb).map(|conn| conn.name()), Some("wire"));
    assert!(net.remove_agent(a));
    assert!(!net.remove_agent(a));
    assert!(!net.is_port_connected(&pb));
    assert_eq!(net.connection_count(), 0);
}

#[test]
fn malformed_port_sets_are_rejected() {
    assert_eq!(
        Agent::with_ports(
            "Two",
            Value::Null,
            [PortSpec::main("p"), PortSpec::main("q")]
        )
        .unwrap_err(),
        AgentError::MultipleMainPorts {
            first: "p".to_owned(),
            second: "q".to_owned(),
        }
    );
    assert!(matches!(
        Agent::with_ports("Dup", Value::Null, [PortSpec::aux("x"), PortSpec::aux("x")]),
        Err(AgentError::DuplicatePort(_))
    ));
    assert_eq!(
        Agent::with_ports("Empty", Value::Null, [PortSpec::aux("")]).unwrap_err(),
        AgentError::EmptyPortName
    );
    let synthesized =
        Agent::with_ports("Aux", Value::Null, [PortSpec::aux("main")]).unwrap();
    assert_eq!(synthesized.main_port_name(), "main_1");
}
