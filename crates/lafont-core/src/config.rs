// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine and analyzer configuration.
use std::num::NonZeroUsize;

/// Default cap on reductions performed by a single `reduce` call.
pub const DEFAULT_MAX_STEPS: usize = 100_000;
/// Default upper bound on instances per analyzer group.
pub const DEFAULT_MAX_GROUP_SIZE: usize = 256;
/// Default size below which a group runs inline on the calling thread.
pub const DEFAULT_MIN_GROUP_SIZE: usize = 8;

/// How the analyzer derives per-instance footprints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessMode {
    /// Both matched agents are written. Always sound.
    #[default]
    Exclusive,
    /// Matched agents declared [`Access::Read`](crate::Access::Read) by their
    /// rule are treated as reads, so two instances may share them. Opt-in:
    /// a rule that writes an agent it declared read fails at execution time
    /// with [`NetworkError::FootprintViolation`](crate::NetworkError::FootprintViolation).
    Declared,
}

/// Dependency analyzer settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyzerConfig {
    /// Maximum instances in one group. Values below 1 are treated as 1.
    pub max_group_size: usize,
    /// Groups smaller than this are executed on the calling thread.
    pub min_group_size: usize,
    /// Footprint derivation.
    pub access_mode: AccessMode,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            access_mode: AccessMode::Exclusive,
        }
    }
}

impl AnalyzerConfig {
    /// Sets [`AnalyzerConfig::max_group_size`].
    #[must_use]
    pub fn with_max_group_size(mut self, max_group_size: usize) -> Self {
        self.max_group_size = max_group_size;
        self
    }

    /// Sets [`AnalyzerConfig::min_group_size`].
    #[must_use]
    pub fn with_min_group_size(mut self, min_group_size: usize) -> Self {
        self.min_group_size = min_group_size;
        self
    }

    /// Sets [`AnalyzerConfig::access_mode`].
    #[must_use]
    pub fn with_access_mode(mut self, access_mode: AccessMode) -> Self {
        self.access_mode = access_mode;
        self
    }

    pub(crate) fn group_cap(&self) -> usize {
        self.max_group_size.max(1)
    }
}

/// Network settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkConfig {
    /// Step cap used by `reduce(None)` and `reduce_parallel(None)`.
    pub max_steps: usize,
    /// Worker threads used by batch execution. Values below 1 are treated as 1.
    pub workers: usize,
    /// Analyzer settings used by `reduce_parallel`.
    pub analyzer: AnalyzerConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            workers: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl NetworkConfig {
    /// Sets [`NetworkConfig::max_steps`].
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets [`NetworkConfig::workers`].
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets [`NetworkConfig::analyzer`].
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }
}
