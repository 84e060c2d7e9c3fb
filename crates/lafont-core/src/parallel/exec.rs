// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Batch execution: partition, execute in isolation, diff, merge.
//!
//! Groups run one after another. Within a group every instance runs on its
//! own isolated copy of its footprint; workers claim instances through an
//! atomic counter. Diffs are guard-checked and merged in input order, so the
//! result does not depend on which worker ran what.
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, instrument, warn};

use crate::config::AnalyzerConfig;
use crate::network::{Network, NetworkError};
use crate::reduce::{ReduceReport, RewriteInstance};
use crate::rule::{Rule, RuleKind};

use super::analyzer::DependencyAnalyzer;
use super::diff::{diff_networks, NetworkDiff};
use super::footprint::Footprint;
use super::guard::check_diff;

/// Outcome of [`BatchExecutor::execute`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Groups produced by the analyzer.
    pub groups: usize,
    /// Instances fired and merged.
    pub fired: usize,
    /// Instances skipped because an earlier group consumed their pair.
    pub stale: usize,
    /// Instances skipped because earlier groups made them conflict with a
    /// member of their own group. They stay active for the next batch.
    pub deferred: usize,
}

/// One instance ready for isolated execution.
struct Job {
    instance: RewriteInstance,
    footprint: Footprint,
    isolated: Network,
}

type JobResult = Result<(NetworkDiff, RuleKind), NetworkError>;

/// Executes batches of instances group by group.
#[derive(Clone, Copy, Debug)]
pub struct BatchExecutor {
    analyzer: DependencyAnalyzer,
    workers: usize,
}

impl BatchExecutor {
    /// Creates an executor using `workers` threads (at least one).
    pub fn new(config: AnalyzerConfig, workers: usize) -> Self {
        Self {
            analyzer: DependencyAnalyzer::new(config),
            workers: workers.max(1),
        }
    }

    /// The analyzer used to form groups.
    pub fn analyzer(&self) -> &DependencyAnalyzer {
        &self.analyzer
    }

    /// Partitions `instances` against `network` and fires every group.
    ///
    /// # Errors
    /// The first failing instance's error, or a footprint violation or merge
    /// conflict. Groups merged before the failure stay applied; nothing from
    /// the failing group is merged.
    #[instrument(level = "debug", skip_all, fields(instances = instances.len()))]
    pub fn execute(
        &self,
        network: &mut Network,
        instances: &[RewriteInstance],
    ) -> Result<BatchReport, NetworkError> {
        let groups = self.analyzer.partition_in(network, instances);
        let mut report = BatchReport {
            groups: groups.len(),
            ..BatchReport::default()
        };
        let mode = self.analyzer.config().access_mode;
        for group in &groups {
            let mut jobs: Vec<Job> = Vec::with_capacity(group.len());
            for inst in &group.instances {
                if !network.is_firable(inst) {
                    warn!(instance = %inst, "skipping stale instance");
                    report.stale += 1;
                    continue;
                }
                let footprint = network.footprint(inst, mode);
                if jobs.iter().any(|j| !j.footprint.independent(&footprint)) {
                    debug!(instance = %inst, "deferring instance that now conflicts");
                    report.deferred += 1;
                    continue;
                }
                jobs.push(Job {
                    instance: *inst,
                    isolated: network.isolate(&footprint),
                    footprint,
                });
            }
            let inline = jobs.len() < self.analyzer.config().min_group_size;
            let results = if inline || self.workers == 1 {
                jobs.iter().map(run_job).collect()
            } else {
                run_parallel(&jobs, self.workers)
            };

            let mut diffs = Vec::with_capacity(jobs.len());
            for (job, result) in jobs.iter().zip(results) {
                let (diff, kind) = result?;
                let rule = network
                    .rules
                    .get_by_id(job.instance.rule)
                    .map_or_else(|| job.instance.rule.to_string(), |r| r.name().to_owned());
                check_diff(&rule, &job.footprint, &job.isolated, &diff)?;
                diffs.push((diff, kind));
            }
            for (diff, kind) in diffs {
                diff.apply_to(network)?;
                network.stats.reductions += 1;
                match kind {
                    RuleKind::Action => network.stats.actions += 1,
                    RuleKind::Rewrite => network.stats.rewrites += 1,
                }
                report.fired += 1;
            }
        }
        debug!(?report, "batch complete");
        Ok(report)
    }
}

fn run_job(job: &Job) -> JobResult {
    let mut after = job.isolated.clone();
    after.fire(&job.instance)?;
    let kind = after
        .rules
        .get_by_id(job.instance.rule)
        .map_or(RuleKind::Rewrite, Rule::kind);
    Ok((diff_networks(&job.isolated, &after), kind))
}

fn run_parallel(jobs: &[Job], workers: usize) -> Vec<JobResult> {
    let next = AtomicUsize::new(0);
    let workers = workers.min(jobs.len()).max(1);
    let mut indexed: Vec<(usize, JobResult)> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let next = &next;
                s.spawn(move || {
                    let mut out = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some(job) = jobs.get(i) else {
                            break;
                        };
                        out.push((i, run_job(job)));
                    }
                    out
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(out) => out,
                Err(e) => std::panic::resume_unwind(e),
            })
            .collect()
    });
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, r)| r).collect()
}

impl Network {
    /// Copy of just `footprint`'s agents and the connections among them,
    /// sharing this network's rules and configuration.
    pub fn isolate(&self, footprint: &Footprint) -> Self {
        let agents: BTreeSet<_> = footprint.agents();
        let mut out = self.empty_like();
        for agent in agents.iter().filter_map(|id| self.agent(*id)) {
            out.insert_agent(agent.clone());
            for port in agent.ports() {
                let Some(conn) = self.connection_at(&port.port_ref()) else {
                    continue;
                };
                let key = conn.key();
                if agents.contains(&key.low().agent) && agents.contains(&key.high().agent) {
                    out.insert_connection(conn.clone());
                }
            }
        }
        out
    }

    /// Reduces through repeated batch execution until no active pair remains
    /// or `max_steps` instances fired.
    ///
    /// Each batch takes the current active pairs (truncated to the remaining
    /// budget), so the step count is exact.
    ///
    /// # Errors
    /// Propagates [`BatchExecutor::execute`] errors.
    #[instrument(level = "debug", skip(self), fields(agents = self.agent_count()))]
    pub fn reduce_parallel(&mut self, max_steps: Option<usize>) -> Result<ReduceReport, NetworkError> {
        let cap = max_steps.unwrap_or(self.config.max_steps);
        let executor = BatchExecutor::new(self.config.analyzer, self.config.workers);
        let mut steps = 0;
        while steps < cap {
            let mut pairs = self.active_pairs();
            if pairs.is_empty() {
                return Ok(ReduceReport {
                    steps,
                    budget_exhausted: false,
                });
            }
            pairs.truncate(cap - steps);
            let report = executor.execute(self, &pairs)?;
            if report.fired == 0 {
                break;
            }
            steps += report.fired;
        }
        let budget_exhausted = self.has_active_pair();
        if budget_exhausted {
            warn!(cap, "parallel reduce hit its step budget with active pairs remaining");
        }
        Ok(ReduceReport {
            steps,
            budget_exhausted,
        })
    }
}
