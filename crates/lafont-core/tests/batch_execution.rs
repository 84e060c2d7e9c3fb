// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};

use lafont_core::parallel::{
    diff_networks, BatchExecutor, DependencyAnalyzer, Footprint, NetworkDiff,
};
use lafont_core::{
    make_rule_id, Access, AccessMode, AgentId, AnalyzerConfig, Network, NetworkConfig,
    RewriteInstance, RuleAccess,
};
use lafont_dry_tests::{
    add, all_rules, con_tree, counter, counter_increment_rule, counters, increment,
    init_test_tracing, int_of, shape, wire, NetworkBuilder, XorShift64,
};

const SEED_BYTES: [u8; 32] = [
    0x1a, 0xf0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0,
];

fn pinned_runner(cases: u32) -> TestRunner {
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    TestRunner::new_with_rng(
        PropConfig {
            cases,
            ..PropConfig::default()
        },
        rng,
    )
}

fn threaded_config(workers: usize) -> NetworkConfig {
    NetworkConfig::default()
        .with_workers(workers)
        .with_analyzer(AnalyzerConfig::default().with_min_group_size(1))
}

#[test]
fn analyzer_groups_are_conflict_free_bounded_and_complete() {
    let rule = make_rule_id("prop");
    let pair = (0u64..12, 0u64..12).prop_filter("distinct agents", |(a, b)| a != b);
    let strategy = (prop::collection::vec(pair, 0..40), 1usize..8);

    pinned_runner(128)
        .run(&strategy, |(pairs, cap)| {
            let instances: Vec<RewriteInstance> = pairs
                .iter()
                .map(|&(l, r)| RewriteInstance {
                    rule,
                    left: AgentId(l),
                    right: AgentId(r),
                })
                .collect();
            let analyzer =
                DependencyAnalyzer::new(AnalyzerConfig::default().with_max_group_size(cap));
            let groups = analyzer.partition(&instances);

            let mut seen: Vec<RewriteInstance> = Vec::new();
            for group in &groups {
                prop_assert!(!group.is_empty());
                prop_assert!(group.len() <= cap);
                for (n, a) in group.instances.iter().enumerate() {
                    for b in &group.instances[n + 1..] {
                        prop_assert!(!a.shares_agent(b), "{a} and {b} share an agent");
                    }
                }
                seen.extend(group.instances.iter().copied());
            }
            let mut expected = instances.clone();
            expected.sort();
            seen.sort();
            prop_assert_eq!(seen, expected);
            Ok(())
        })
        .expect("analyzer property");
}

fn random_scene(config: NetworkConfig, seed: u64, pairs: usize, trees: u32) -> Network {
    let mut rng = XorShift64::new(seed);
    let mut net = NetworkBuilder::new().config(config).rules(all_rules()).build();
    for _ in 0..pairs {
        let amount = i64::try_from(rng.below(9)).unwrap_or(0) + 1;
        let c = add(&mut net, counter(0));
        let i = add(&mut net, increment(amount));
        wire(&mut net, c, "main", i, "main");
    }
    for _ in 0..trees {
        let depth = u32::try_from(rng.below(3)).unwrap_or(0) + 1;
        con_tree(&mut net, depth);
    }
    net
}

fn diff_of(net: &Network, inst: &RewriteInstance) -> NetworkDiff {
    let fp = net.footprint(inst, AccessMode::Exclusive);
    let isolated = net.isolate(&fp);
    let mut after = isolated.clone();
    after.fire(inst).expect("fire on isolated copy");
    diff_networks(&isolated, &after)
}

#[test]
fn diffs_within_a_group_commute() {
    let strategy = (any::<u64>(), 1usize..6, 0u32..4, any::<u64>());

    pinned_runner(64)
        .run(&strategy, |(seed, pairs, trees, order_seed)| {
            let net = random_scene(NetworkConfig::default(), seed, pairs, trees);
            let analyzer = DependencyAnalyzer::new(AnalyzerConfig::default());
            let groups = analyzer.partition_in(&net, &net.active_pairs());
            prop_assert!(!groups.is_empty());

            for group in &groups {
                let diffs: Vec<NetworkDiff> =
                    group.instances.iter().map(|inst| diff_of(&net, inst)).collect();

                let mut forward = net.clone();
                for diff in &diffs {
                    diff.apply_to(&mut forward).expect("forward merge");
                }
                let mut backward = net.clone();
                for diff in diffs.iter().rev() {
                    diff.apply_to(&mut backward).expect("backward merge");
                }
                prop_assert_eq!(forward.state_digest(), backward.state_digest());

                let mut order: Vec<usize> = (0..diffs.len()).collect();
                XorShift64::new(order_seed).shuffle(&mut order);
                let mut shuffled = net.clone();
                for &k in &order {
                    diffs[k].apply_to(&mut shuffled).expect("shuffled merge");
                }
                prop_assert_eq!(forward.state_digest(), shuffled.state_digest());

                let mut sequential = net.clone();
                for inst in &group.instances {
                    sequential.fire(inst).expect("sequential fire");
                }
                prop_assert_eq!(shape(&forward), shape(&sequential));
                prop_assert_eq!(forward.connection_count(), sequential.connection_count());
            }
            Ok(())
        })
        .expect("commutativity property");
}

#[test]
fn parallel_reduction_matches_sequential_on_counters() {
    init_test_tracing();
    let mut seq = NetworkBuilder::new().rule(counter_increment_rule()).build();
    let seq_pairs = counters(&mut seq, 64);
    let mut par = NetworkBuilder::new()
        .config(threaded_config(4))
        .rule(counter_increment_rule())
        .build();
    let par_pairs = counters(&mut par, 64);

    let seq_report = seq.reduce(None).expect("sequential");
    let par_report = par.reduce_parallel(None).expect("parallel");
    assert_eq!(seq_report, par_report);
    assert_eq!(par_report.steps, 64);
    for (s, p) in seq_pairs.iter().zip(&par_pairs) {
        assert_eq!(
            int_of(&seq, s.counter, "count"),
            int_of(&par, p.counter, "count")
        );
    }
    assert_eq!(par.connection_count(), 0);
    assert_eq!(par.stats().actions, 64);
}

#[test]
fn parallel_reduction_matches_sequential_on_trees() {
    let mut seq = NetworkBuilder::new().rules(all_rules()).build();
    let mut par = NetworkBuilder::new()
        .config(threaded_config(3))
        .rules(all_rules())
        .build();
    for net in [&mut seq, &mut par] {
        con_tree(net, 5);
        con_tree(net, 2);
    }
    let seq_report = seq.reduce(None).expect("sequential");
    let par_report = par.reduce_parallel(None).expect("parallel");
    assert_eq!(seq_report.steps, par_report.steps);
    assert_eq!(shape(&seq), shape(&par));
    assert!(!par.has_active_pair());
}

#[test]
fn worker_count_does_not_change_the_result() {
    let results: Vec<Vec<String>> = [1usize, 2, 8]
        .into_iter()
        .map(|workers| {
            let mut net = random_scene(threaded_config(workers), 0xDEAD_BEEF, 12, 3);
            net.reduce_parallel(None).expect("parallel");
            shape(&net)
        })
        .collect();
    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
}

#[test]
fn parallel_budget_is_exact() {
    let mut net = NetworkBuilder::new()
        .config(threaded_config(2))
        .rule(counter_increment_rule())
        .build();
    counters(&mut net, 10);
    let report = net.reduce_parallel(Some(4)).expect("parallel");
    assert_eq!(report.steps, 4);
    assert!(report.budget_exhausted);
    assert_eq!(net.active_pairs().len(), 6);
}

#[test]
fn executor_skips_instances_consumed_by_an_earlier_group() {
    let mut net = NetworkBuilder::new().rules(all_rules()).build();
    let c = add(&mut net, counter(0));
    let i = add(&mut net, increment(3));
    wire(&mut net, c, "main", i, "main");
    let inst = net.active_pairs()[0];

    let executor = BatchExecutor::new(AnalyzerConfig::default(), 2);
    // the same instance twice lands in two groups; the second is stale
    let report = executor.execute(&mut net, &[inst, inst]).expect("batch");
    assert_eq!(report.groups, 2);
    assert_eq!(report.fired, 1);
    assert_eq!(report.stale, 1);
    assert_eq!(int_of(&net, c, "count"), Some(3));
}

#[test]
fn declared_reads_let_readers_share_an_agent() {
    let shared = AgentId(1);
    let rule = make_rule_id("reader");
    let a = RewriteInstance {
        rule,
        left: shared,
        right: AgentId(2),
    };
    let b = RewriteInstance {
        rule,
        left: shared,
        right: AgentId(3),
    };
    let analyzer = DependencyAnalyzer::new(AnalyzerConfig::default());
    let reads_left = |inst: &RewriteInstance| Footprint {
        write: [inst.right].into_iter().collect(),
        read: [inst.left].into_iter().collect(),
    };
    assert_eq!(analyzer.partition_with(&[a, b], reads_left).len(), 1);
    assert_eq!(analyzer.partition(&[a, b]).len(), 2);

    let mut net = NetworkBuilder::new()
        .rule(counter_increment_rule().with_access(RuleAccess {
            left: Access::Write,
            right: Access::Read,
        }))
        .build();
    let c = add(&mut net, counter(0));
    let i = add(&mut net, increment(1));
    wire(&mut net, c, "main", i, "main");
    let inst = net.active_pairs()[0];
    let fp = net.footprint(&inst, AccessMode::Declared);
    assert!(fp.writes(c));
    assert!(!fp.writes(i));
    assert!(net.footprint(&inst, AccessMode::Exclusive).writes(i));
}

#[test]
fn isolated_copy_holds_only_the_footprint() {
    let mut net = NetworkBuilder::new().rules(all_rules()).build();
    let eraser = con_tree(&mut net, 2);
    let root = net
        .neighbor(&net.agent(eraser).expect("eraser").main())
        .expect("root wired")
        .agent;
    let inst = net.active_pairs()[0];
    let fp = net.footprint(&inst, AccessMode::Exclusive);
    let isolated = net.isolate(&fp);
    // eraser, root, and the root's two children
    assert_eq!(isolated.agent_count(), 4);
    assert_eq!(isolated.connection_count(), 3);
    assert!(isolated.contains_agent(root));
    assert_eq!(isolated.active_pairs(), vec![inst]);
}
