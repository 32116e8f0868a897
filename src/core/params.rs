//! Tree configuration: a chained-setter builder mirroring the host
//! library's own `with_*` configuration idiom, producing a validated
//! [`crate::core::tree::CfTree`] or a descriptive [`CfTreeError`].

use crate::constants::{MIN_BRANCHING_FACTOR, NODE_HEADER_BYTES, PAGE_SIZE};
use crate::core::entry::CfMetric;
use crate::core::tree::CfTree;
use crate::error::CfTreeError;
use crate::number::Number;

/// How the per-node fanout `B` is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branching {
    /// Derive `B` from [`PAGE_SIZE`] and the entry size implied by the
    /// tree's dimensionality and scalar type.
    FromPageSize,
    /// Use a caller-supplied fixed fanout (still floored at
    /// [`MIN_BRANCHING_FACTOR`]).
    Fixed(usize),
}

impl Branching {
    fn resolve(self, entry_bytes: usize) -> usize {
        match self {
            Branching::Fixed(b) => b.max(MIN_BRANCHING_FACTOR),
            Branching::FromPageSize => {
                let usable = PAGE_SIZE.saturating_sub(NODE_HEADER_BYTES);
                let per_entry = entry_bytes.max(1);
                (usable / per_entry).max(MIN_BRANCHING_FACTOR)
            }
        }
    }
}

/// Builder for a [`CfTree`]. Construct with [`CfTreeParams::new`], chain
/// `with_*` calls, then [`CfTreeParams::build`].
#[derive(Debug, Clone)]
pub struct CfTreeParams {
    dim: usize,
    branching: Branching,
    threshold: f64,
    metric: CfMetric,
    leaf_budget: usize,
    rebuild_interval: usize,
}

impl CfTreeParams {
    /// A builder for trees over `dim`-dimensional points, with reasonable
    /// defaults: page-derived branching, threshold `1.0`, [`CfMetric::D0`],
    /// a 10,000-entry leaf budget, and a rebuild check after every insert.
    pub fn new(dim: usize) -> Self {
        CfTreeParams {
            dim,
            branching: Branching::FromPageSize,
            threshold: 1.0,
            metric: CfMetric::default(),
            leaf_budget: 10_000,
            rebuild_interval: 1,
        }
    }

    /// Sets how the branching factor is derived.
    pub fn with_branching(mut self, branching: Branching) -> Self {
        self.branching = branching;
        self
    }

    /// Sets the initial absorption threshold `T` (must be `> 0`).
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the distance/shape function used for both descent and
    /// absorption decisions.
    pub fn with_metric(mut self, metric: CfMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Sets the maximum number of leaf entries the tree may hold before a
    /// rebuild is triggered to compact it back down. `0` means unbounded:
    /// the tree never rebuilds on account of its size.
    pub fn with_leaf_budget(mut self, leaf_budget: usize) -> Self {
        self.leaf_budget = leaf_budget;
        self
    }

    /// Sets how many insertions elapse between leaf-budget checks (must be
    /// `>= 1`).
    pub fn with_rebuild_interval(mut self, rebuild_interval: usize) -> Self {
        self.rebuild_interval = rebuild_interval;
        self
    }

    /// Validates the configuration and constructs an empty [`CfTree`].
    pub fn build<U: Number>(self) -> Result<CfTree<U>, CfTreeError> {
        if self.dim == 0 {
            return Err(CfTreeError::InvalidParams(
                "dimension must be at least 1".to_string(),
            ));
        }
        if !(self.threshold > 0.0) || !self.threshold.is_finite() {
            return Err(CfTreeError::InvalidParams(
                "threshold must be a finite, positive number".to_string(),
            ));
        }
        if self.rebuild_interval == 0 {
            return Err(CfTreeError::InvalidParams(
                "rebuild_interval must be at least 1".to_string(),
            ));
        }

        let entry_bytes = self.dim * std::mem::size_of::<U>() + 2 * std::mem::size_of::<usize>();
        let branching_factor = self.branching.resolve(entry_bytes);

        if self.leaf_budget != 0 && self.leaf_budget < branching_factor {
            return Err(CfTreeError::InvalidParams(format!(
                "leaf_budget ({}) must be 0 (unbounded) or at least the branching factor ({branching_factor})",
                self.leaf_budget
            )));
        }

        Ok(CfTree::from_params(
            self.dim,
            branching_factor,
            U::from_f64(self.threshold),
            self.metric,
            self.leaf_budget,
            self.rebuild_interval,
        ))
    }
}
