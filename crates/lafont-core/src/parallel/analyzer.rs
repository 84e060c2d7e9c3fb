// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rule dependency analyzer: partitions instances into conflict-free groups.
//!
//! # Algorithm
//!
//! 1. Compute a [`Footprint`] per instance.
//! 2. Build the conflict graph: an edge joins two instances whose footprints
//!    are not [`independent`](Footprint::independent). Candidate pairs come
//!    from an agent-to-instance index, so only instances touching a common
//!    agent are compared.
//! 3. First-fit scan: walk the unassigned instances in input order, adding
//!    each one to the current group when it conflicts with no member and the
//!    group is below `max_group_size`. When a scan assigns nothing more, the
//!    group is closed and a new scan starts.
//!
//! Groups are emitted in creation order and preserve input order inside each
//! group. No two instances in a group conflict.
//!
//! Every instance left out of a group either conflicts with one of its
//! members or found it full, so two first-fit groups can never be merged
//! without breaking independence or the size bound. Small groups are instead
//! run inline by the executor (see [`AnalyzerConfig::min_group_size`]).
use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::ident::AgentId;
use crate::network::Network;
use crate::reduce::RewriteInstance;

use super::footprint::Footprint;

/// A conflict-free set of instances, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceGroup {
    /// Members.
    pub instances: Vec<RewriteInstance>,
}

impl InstanceGroup {
    /// Number of members.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` for an empty group.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Partitions rewrite instances into independent groups.
#[derive(Clone, Copy, Debug, Default)]
pub struct DependencyAnalyzer {
    config: AnalyzerConfig,
}

impl DependencyAnalyzer {
    /// Creates an analyzer with `config`.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Baseline partition: instances sharing an agent id conflict.
    pub fn partition(&self, instances: &[RewriteInstance]) -> Vec<InstanceGroup> {
        self.partition_with(instances, Footprint::of_instance)
    }

    /// Partition against `network`, using [`Network::footprint`] with the
    /// configured access mode.
    pub fn partition_in(&self, network: &Network, instances: &[RewriteInstance]) -> Vec<InstanceGroup> {
        let mode = self.config.access_mode;
        self.partition_with(instances, |inst| network.footprint(inst, mode))
    }

    /// Partition using caller-supplied footprints.
    pub fn partition_with<F>(&self, instances: &[RewriteInstance], footprint_of: F) -> Vec<InstanceGroup>
    where
        F: FnMut(&RewriteInstance) -> Footprint,
    {
        let footprints: Vec<Footprint> = instances.iter().map(footprint_of).collect();
        let conflicts = conflict_graph(&footprints);
        let groups = first_fit(&conflicts, self.config.group_cap());
        debug!(
            instances = instances.len(),
            groups = groups.len(),
            "partitioned rewrite instances"
        );
        groups
            .into_iter()
            .map(|members| InstanceGroup {
                instances: members.into_iter().map(|i| instances[i]).collect(),
            })
            .collect()
    }
}

/// Adjacency sets of the conflict graph, indexed like `footprints`.
fn conflict_graph(footprints: &[Footprint]) -> Vec<BTreeSet<usize>> {
    let mut touching: FxHashMap<AgentId, Vec<usize>> = FxHashMap::default();
    for (i, fp) in footprints.iter().enumerate() {
        for agent in fp.agents() {
            touching.entry(agent).or_default().push(i);
        }
    }
    let mut conflicts = vec![BTreeSet::new(); footprints.len()];
    for members in touching.values() {
        for (n, &i) in members.iter().enumerate() {
            for &j in &members[n + 1..] {
                if !footprints[i].independent(&footprints[j]) {
                    conflicts[i].insert(j);
                    conflicts[j].insert(i);
                }
            }
        }
    }
    conflicts
}

fn first_fit(conflicts: &[BTreeSet<usize>], cap: usize) -> Vec<Vec<usize>> {
    let mut remaining: Vec<usize> = (0..conflicts.len()).collect();
    let mut groups = Vec::new();
    while !remaining.is_empty() {
        let mut group = Vec::new();
        let mut blocked: BTreeSet<usize> = BTreeSet::new();
        let mut deferred = Vec::new();
        for i in remaining {
            if group.len() < cap && !blocked.contains(&i) {
                blocked.extend(conflicts[i].iter().copied());
                group.push(i);
            } else {
                deferred.push(i);
            }
        }
        groups.push(group);
        remaining = deferred;
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::make_rule_id;

    fn inst(left: u64, right: u64) -> RewriteInstance {
        RewriteInstance {
            rule: make_rule_id("r"),
            left: AgentId(left),
            right: AgentId(right),
        }
    }

    #[test]
    fn disjoint_instances_share_one_group() {
        let groups = DependencyAnalyzer::default().partition(&[inst(1, 2), inst(3, 4), inst(5, 6)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn chain_alternates_between_groups() {
        let input = [inst(1, 2), inst(2, 3), inst(3, 4), inst(4, 5)];
        let groups = DependencyAnalyzer::default().partition(&input);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].instances, vec![input[0], input[2]]);
        assert_eq!(groups[1].instances, vec![input[1], input[3]]);
    }

    #[test]
    fn group_size_is_capped() {
        let input: Vec<_> = (0..5).map(|i| inst(2 * i, 2 * i + 1)).collect();
        let analyzer = DependencyAnalyzer::new(AnalyzerConfig::default().with_max_group_size(2));
        let sizes: Vec<usize> = analyzer.partition(&input).iter().map(InstanceGroup::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn every_instance_is_assigned_once() {
        let input = [inst(1, 2), inst(1, 3), inst(1, 4), inst(5, 6)];
        let groups = DependencyAnalyzer::default().partition(&input);
        let total: usize = groups.iter().map(InstanceGroup::len).sum();
        assert_eq!(total, input.len());
        assert_eq!(groups.len(), 3);
    }
}
