//! The CF-tree itself (sub-modules C/D/E of the design): insertion descent,
//! absorb/split decisions, farthest-pair splitting, and the rebuild
//! controller that keeps the tree within its configured leaf budget by
//! escalating the absorption threshold and re-merging existing entries.

use crate::constants::{MAX_REBUILDS_PER_INSERT, THRESHOLD_GUARD_FACTOR};
use crate::error::CfTreeError;
use crate::number::Number;

use super::entry::{CfEntry, CfMetric};
use super::node::{Node, NodeId, DUMMY};

/// A clustering-feature tree over `dim`-dimensional points.
///
/// Construct via [`crate::core::params::CfTreeParams`]; insert points with
/// [`CfTree::insert`]; read back the current leaf summaries with
/// [`CfTree::entries`] or walk them in leaf-chain order with
/// [`CfTree::leaf_iter`].
#[derive(Debug, Clone)]
pub struct CfTree<U: Number> {
    dim: usize,
    branching_factor: usize,
    threshold: U,
    metric: CfMetric,
    leaf_budget: usize,
    rebuild_interval: usize,
    insert_counter: usize,
    arena: Vec<Node<U>>,
    root: NodeId,
    n_points: usize,
    rebuild_count: usize,
}

impl<U: Number> CfTree<U> {
    pub(crate) fn from_params(
        dim: usize,
        branching_factor: usize,
        threshold: U,
        metric: CfMetric,
        leaf_budget: usize,
        rebuild_interval: usize,
    ) -> Self {
        let arena = vec![Node::dummy()];
        let mut tree = CfTree {
            dim,
            branching_factor,
            threshold,
            metric,
            leaf_budget,
            rebuild_interval,
            insert_counter: 0,
            arena,
            root: DUMMY,
            n_points: 0,
            rebuild_count: 0,
        };
        let root_id = tree.alloc_node(Node::empty_leaf());
        tree.arena[root_id.index()].set_prev(DUMMY);
        tree.arena[root_id.index()].set_next(DUMMY);
        tree.arena[DUMMY.index()].set_prev(root_id);
        tree.arena[DUMMY.index()].set_next(root_id);
        tree.root = root_id;
        tree
    }

    /// The dimensionality this tree was built for.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The per-node fanout in effect.
    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    /// The current absorption threshold `T`.
    pub fn threshold(&self) -> U {
        self.threshold
    }

    /// The number of points that have been inserted over the tree's
    /// lifetime (including points later merged away by rebuilds).
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Whether the tree has never absorbed a point.
    pub fn empty(&self) -> bool {
        self.n_points == 0
    }

    /// The number of nodes currently allocated in the tree, excluding the
    /// leaf-chain's dummy sentinel.
    pub fn node_count(&self) -> usize {
        self.arena.len() - 1
    }

    /// How many times the rebuild controller has run over this tree's
    /// lifetime.
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    /// The leaf summaries, in leaf-chain order.
    pub fn entries(&self) -> Vec<CfEntry<U>> {
        self.leaf_ids().into_iter().flat_map(|id| self.arena[id.index()].entries().to_vec()).collect()
    }

    /// Iterates the leaf summaries in leaf-chain order (left-to-right as
    /// produced by successive splits).
    pub fn leaf_iter(&self) -> impl Iterator<Item = &CfEntry<U>> {
        self.leaf_ids().into_iter().flat_map(move |id| self.arena[id.index()].entries().iter())
    }

    /// Total number of leaf entries currently held across all leaves.
    pub fn leaf_entry_count(&self) -> usize {
        self.leaf_ids().iter().map(|id| self.arena[id.index()].len()).sum()
    }

    fn alloc_node(&mut self, node: Node<U>) -> NodeId {
        self.arena.push(node);
        NodeId(self.arena.len() - 1)
    }

    /// Leaf node ids, in chain order, starting right after the dummy
    /// sentinel and walking `next` until the sentinel is reached again.
    fn leaf_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut cur = self.arena[DUMMY.index()].next();
        while cur != DUMMY {
            ids.push(cur);
            cur = self.arena[cur.index()].next();
        }
        ids
    }

    /// The true summary of a node's current contents, with its child link
    /// set to `id` itself (used to refresh a parent's entry for `id` after
    /// descent changes what `id` holds).
    fn node_summary(&self, id: NodeId) -> CfEntry<U> {
        let node = &self.arena[id.index()];
        let mut acc = CfEntry::zero(self.dim);
        for e in node.entries() {
            acc.merge(e);
        }
        acc.set_child(id);
        acc
    }

    /// Inserts a point into the tree, creating or absorbing leaf entries
    /// and triggering splits and rebuilds as needed.
    pub fn insert(&mut self, point: &[U]) -> Result<(), CfTreeError> {
        if point.len() != self.dim {
            return Err(CfTreeError::DimensionMismatch {
                expected: self.dim,
                actual: point.len(),
            });
        }
        self.insert_entry(CfEntry::from_point(point))?;
        self.n_points += 1;

        self.insert_counter += 1;
        if self.insert_counter >= self.rebuild_interval {
            self.insert_counter = 0;
            if self.leaf_budget > 0 && self.leaf_entry_count() > self.leaf_budget {
                self.rebuild(true)?;
            }
        }
        Ok(())
    }

    /// Merges an already-aggregated entry into the tree. Used both by
    /// [`insert`](Self::insert) (for a freshly observed point) and by the
    /// rebuild controller (for whole leaf summaries being re-merged at a
    /// higher threshold).
    fn insert_entry(&mut self, entry: CfEntry<U>) -> Result<(), CfTreeError> {
        if let Some(new_sibling) = self.insert_into(self.root, entry)? {
            let mut new_root = Node::empty_internal();
            let e1 = self.node_summary(self.root);
            let e2 = self.node_summary(new_sibling);
            new_root.push(e1);
            new_root.push(e2);
            self.root = self.alloc_node(new_root);
        }
        Ok(())
    }

    /// Descends into `id`, absorbing or placing `entry`. Returns the id of
    /// a newly split-off sibling node, if `id` (or one of its descendants)
    /// overflowed and had to split.
    fn insert_into(&mut self, id: NodeId, entry: CfEntry<U>) -> Result<Option<NodeId>, CfTreeError> {
        if self.arena[id.index()].is_leaf() {
            return Ok(self.insert_into_leaf(id, entry));
        }

        let best_idx = self.closest_entry_index(id, &entry);
        let child_id = self.arena[id.index()].entries()[best_idx]
            .child()
            .expect("internal entry missing a child link");

        let maybe_new_child = self.insert_into(child_id, entry)?;

        let refreshed = self.node_summary(child_id);
        self.arena[id.index()].replace(best_idx, refreshed);

        match maybe_new_child {
            None => Ok(None),
            Some(new_child_id) => {
                let new_entry = self.node_summary(new_child_id);
                Ok(self.add_entry_with_split(id, new_entry, false))
            }
        }
    }

    /// The index of the entry in node `id` closest to `entry` by the
    /// tree's configured metric. Panics if `id` holds no entries (only
    /// possible transiently, never on a node reachable from a completed
    /// insert).
    fn closest_entry_index(&self, id: NodeId, entry: &CfEntry<U>) -> usize {
        let entries = self.arena[id.index()].entries();
        debug_assert!(!entries.is_empty());
        let mut best_idx = 0;
        let mut best_dist = self.metric.distance(&entries[0], entry);
        for (i, candidate) in entries.iter().enumerate().skip(1) {
            let d = self.metric.distance(candidate, entry);
            if d < best_dist {
                best_dist = d;
                best_idx = i;
            }
        }
        best_idx
    }

    fn insert_into_leaf(&mut self, id: NodeId, entry: CfEntry<U>) -> Option<NodeId> {
        if self.arena[id.index()].is_empty() {
            self.arena[id.index()].push(entry);
            return None;
        }

        let best_idx = self.closest_entry_index(id, &entry);
        let best_dist = self.metric.distance(&self.arena[id.index()].entries()[best_idx], &entry);

        if best_dist <= self.threshold {
            let merged = self.arena[id.index()].entries()[best_idx].merged(&entry);
            self.arena[id.index()].replace(best_idx, merged);
            return None;
        }

        if !self.arena[id.index()].is_full(self.branching_factor) {
            self.arena[id.index()].push(entry);
            return None;
        }

        self.add_entry_with_split(id, entry, true)
    }

    /// Adds `entry` to node `id`, splitting it via farthest-pair partition
    /// if it is already at capacity. `is_leaf_node` controls whether the
    /// freshly allocated sibling is spliced into the leaf chain.
    fn add_entry_with_split(&mut self, id: NodeId, entry: CfEntry<U>, is_leaf_node: bool) -> Option<NodeId> {
        if !self.arena[id.index()].is_full(self.branching_factor) {
            self.arena[id.index()].push(entry);
            return None;
        }

        let mut entries = self.arena[id.index()].take_entries();
        entries.push(entry);
        let (group_a, group_b) = self.farthest_pair_partition(entries);

        for e in group_a {
            self.arena[id.index()].push(e);
        }

        let new_node = if is_leaf_node { Node::empty_leaf() } else { Node::empty_internal() };
        let new_id = self.alloc_node(new_node);
        for e in group_b {
            self.arena[new_id.index()].push(e);
        }

        if is_leaf_node {
            let old_next = self.arena[id.index()].next();
            self.arena[new_id.index()].set_prev(id);
            self.arena[new_id.index()].set_next(old_next);
            self.arena[id.index()].set_next(new_id);
            self.arena[old_next.index()].set_prev(new_id);
        }

        Some(new_id)
    }

    /// Farthest-pair seeded two-way partition (§5): finds the pair of
    /// entries with maximal mutual distance, then assigns every entry
    /// (seeds included) to whichever seed it is closer to.
    fn farthest_pair_partition(&self, entries: Vec<CfEntry<U>>) -> (Vec<CfEntry<U>>, Vec<CfEntry<U>>) {
        let m = entries.len();
        debug_assert!(m >= 2, "cannot split a node with fewer than 2 entries");

        let mut seed_a = 0;
        let mut seed_b = 1;
        let mut best = self.metric.distance(&entries[0], &entries[1]);
        for i in 0..m {
            for j in (i + 1)..m {
                let d = self.metric.distance(&entries[i], &entries[j]);
                if d > best {
                    best = d;
                    seed_a = i;
                    seed_b = j;
                }
            }
        }

        let a = entries[seed_a].clone();
        let b = entries[seed_b].clone();

        let mut group_a = Vec::new();
        let mut group_b = Vec::new();
        for e in entries {
            let da = self.metric.distance(&e, &a);
            let db = self.metric.distance(&e, &b);
            if da <= db {
                group_a.push(e);
            } else {
                group_b.push(e);
            }
        }

        if group_a.is_empty() {
            let moved = group_b.pop().expect("both groups cannot be empty");
            group_a.push(moved);
        } else if group_b.is_empty() {
            let moved = group_a.pop().expect("both groups cannot be empty");
            group_b.push(moved);
        }

        (group_a, group_b)
    }

    /// Rebuild controller (§6). `extend = true` derives a new, larger
    /// threshold from the tree's current geometry before rebuilding (used
    /// for budget enforcement); `extend = false` rebuilds at the existing
    /// threshold unchanged (used to merge overlap without escalating `T`).
    /// If the first rebuild still leaves the tree over budget, escalates
    /// further, up to [`MAX_REBUILDS_PER_INSERT`] rounds.
    ///
    /// Also called automatically from [`insert`](Self::insert) once every
    /// configured rebuild interval, while the leaf-entry count exceeds the
    /// leaf budget.
    pub fn rebuild(&mut self, extend: bool) -> Result<(), CfTreeError> {
        let mut rounds = 0usize;

        loop {
            let current_entries = self.entries_by_leaf();
            let next_threshold = if extend || rounds > 0 {
                let candidate = Self::derive_threshold(&current_entries, self.metric);
                let guarded = self.threshold * U::from_f64(THRESHOLD_GUARD_FACTOR);
                if guarded > candidate {
                    guarded
                } else {
                    candidate
                }
            } else {
                self.threshold
            };

            let mut fresh = CfTree::from_params(
                self.dim,
                self.branching_factor,
                next_threshold,
                self.metric,
                self.leaf_budget,
                self.rebuild_interval,
            );
            for leaf in &current_entries {
                for e in leaf {
                    fresh.insert_entry(e.clone())?;
                }
            }
            fresh.n_points = self.n_points;
            fresh.rebuild_count = self.rebuild_count + 1;

            let new_count = fresh.leaf_entry_count();
            let fits = self.leaf_budget == 0 || new_count <= self.leaf_budget;
            let threshold_for_log = fresh.threshold;
            *self = fresh;

            rounds += 1;
            if fits {
                log::debug!(
                    "rebuild converged after {rounds} round(s): threshold {:.6} -> {new_count} leaf entries",
                    threshold_for_log.as_f64()
                );
                break;
            }
            if rounds >= MAX_REBUILDS_PER_INSERT {
                log::warn!(
                    "rebuild stalled after {rounds} round(s): {new_count} leaf entries still exceed budget {}",
                    self.leaf_budget
                );
                break;
            }
            log::trace!("rebuild round {rounds} did not converge, escalating threshold further");
        }

        Ok(())
    }

    /// The current leaf entries, grouped by the leaf node holding them (in
    /// leaf-chain order), needed by [`derive_threshold`](Self::derive_threshold)
    /// since it restricts nearest-neighbour search to entries sharing a leaf.
    fn entries_by_leaf(&self) -> Vec<Vec<CfEntry<U>>> {
        self.leaf_ids().into_iter().map(|id| self.arena[id.index()].entries().to_vec()).collect()
    }

    /// Derives a new candidate threshold (§4.5): for every entry in a leaf
    /// holding at least two entries, the distance to its nearest neighbour
    /// *within that same leaf* is measured, square-rooted, and averaged
    /// across all qualifying entries to get `d̄`. The candidate threshold is
    /// `(d̄/2)²`. Leaves with fewer than two entries, and a tree with no
    /// qualifying leaf at all, contribute nothing (the caller's `1.05×`
    /// guard then provides the only forward progress).
    fn derive_threshold(leaves: &[Vec<CfEntry<U>>], metric: CfMetric) -> U {
        let mut sum_sqrt_dist = U::zero();
        let mut count = 0usize;

        for leaf in leaves {
            if leaf.len() < 2 {
                continue;
            }
            for i in 0..leaf.len() {
                let mut nearest = None;
                for j in 0..leaf.len() {
                    if i == j {
                        continue;
                    }
                    let d = metric.distance(&leaf[i], &leaf[j]);
                    nearest = Some(match nearest {
                        Some(best) if best <= d => best,
                        _ => d,
                    });
                }
                if let Some(d) = nearest {
                    sum_sqrt_dist += d.clamp_non_negative().sqrt();
                    count += 1;
                }
            }
        }

        if count == 0 {
            return U::zero();
        }

        let d_bar = sum_sqrt_dist / U::from_usize(count);
        let half = d_bar / U::from_f64(2.0);
        half * half
    }

    /// Depth (root = 0) of every leaf currently reachable from `root`.
    /// Exposed only to back the height-balance property test: callers have
    /// no legitimate use for per-leaf depth, since the tree's only promise
    /// is that all leaves sit at equal depth.
    #[cfg(test)]
    fn leaf_depths(&self) -> Vec<usize> {
        fn walk<U: Number>(tree: &CfTree<U>, id: NodeId, depth: usize, out: &mut Vec<usize>) {
            if tree.arena[id.index()].is_leaf() {
                out.push(depth);
            } else {
                for e in tree.arena[id.index()].entries() {
                    walk(tree, e.child().expect("internal entry missing a child link"), depth + 1, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, self.root, 0, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::CfTreeParams;

    fn small_tree() -> CfTree<f64> {
        CfTreeParams::new(2)
            .with_threshold(0.25)
            .with_branching(crate::core::params::Branching::Fixed(4))
            .with_leaf_budget(1_000)
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_wrong_dimension() {
        let mut tree = small_tree();
        let err = tree.insert(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            CfTreeError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn single_point_forms_one_entry() {
        let mut tree = small_tree();
        tree.insert(&[1.0, 1.0]).unwrap();
        assert_eq!(tree.leaf_entry_count(), 1);
        assert_eq!(tree.n_points(), 1);
    }

    #[test]
    fn nearby_points_absorb_into_one_entry() {
        let mut tree = small_tree();
        tree.insert(&[0.0, 0.0]).unwrap();
        tree.insert(&[0.01, 0.01]).unwrap();
        assert_eq!(tree.leaf_entry_count(), 1);
        let e = &tree.entries()[0];
        assert_eq!(e.n(), 2);
    }

    #[test]
    fn far_points_form_distinct_entries() {
        let mut tree = small_tree();
        tree.insert(&[0.0, 0.0]).unwrap();
        tree.insert(&[100.0, 100.0]).unwrap();
        assert_eq!(tree.leaf_entry_count(), 2);
    }

    #[test]
    fn filling_a_leaf_past_capacity_splits_it() {
        let mut tree = small_tree();
        for i in 0..10 {
            let x = (i as f64) * 50.0;
            tree.insert(&[x, x]).unwrap();
        }
        assert!(tree.node_count() > 1);
        assert_eq!(tree.leaf_entry_count(), 10);
    }

    #[test]
    fn point_conservation_across_splits() {
        let mut tree = small_tree();
        let mut total_n = 0usize;
        for i in 0..40 {
            let x = (i as f64) * 3.0;
            tree.insert(&[x, -x]).unwrap();
            total_n += 1;
        }
        let sum_n: usize = tree.entries().iter().map(|e| e.n()).sum();
        assert_eq!(sum_n, total_n);
        assert_eq!(tree.n_points(), total_n);
    }

    #[test]
    fn leaf_chain_visits_every_entry_exactly_once() {
        let mut tree = small_tree();
        for i in 0..40 {
            let x = (i as f64) * 7.0;
            tree.insert(&[x, x * 0.5]).unwrap();
        }
        let via_iter: usize = tree.leaf_iter().count();
        assert_eq!(via_iter, tree.leaf_entry_count());
    }

    #[test]
    fn rebuild_keeps_leaf_entries_within_budget() {
        let mut tree = CfTreeParams::new(2)
            .with_threshold(1e-6)
            .with_branching(crate::core::params::Branching::Fixed(4))
            .with_leaf_budget(8)
            .build::<f64>()
            .unwrap();
        for i in 0..60 {
            let x = (i as f64) * 10.0;
            tree.insert(&[x, x]).unwrap();
        }
        assert!(tree.leaf_entry_count() <= 8 || tree.rebuild_count() >= crate::constants::MAX_REBUILDS_PER_INSERT);
        assert_eq!(tree.n_points(), 60);
    }

    #[test]
    fn rebuild_threshold_is_monotonically_non_decreasing() {
        let mut tree = CfTreeParams::new(1)
            .with_threshold(1e-6)
            .with_branching(crate::core::params::Branching::Fixed(3))
            .with_leaf_budget(4)
            .build::<f64>()
            .unwrap();
        let mut last = tree.threshold();
        for i in 0..30 {
            tree.insert(&[i as f64]).unwrap();
            assert!(tree.threshold() >= last - 1e-9);
            last = tree.threshold();
        }
    }

    #[test]
    fn empty_tree_reports_empty() {
        let tree = small_tree();
        assert!(tree.empty());
        assert_eq!(tree.leaf_entry_count(), 0);
    }

    /// Every leaf-chain walk, forward from `dummy.next` and backward from
    /// `dummy.prev`, must visit every leaf exactly once and reach no cycle.
    fn assert_leaf_chain_well_formed<U: Number>(tree: &CfTree<U>) {
        let forward = tree.leaf_ids();
        let mut backward = Vec::new();
        let mut cur = tree.arena[DUMMY.index()].prev();
        while cur != DUMMY {
            backward.push(cur);
            cur = tree.arena[cur.index()].prev();
        }
        backward.reverse();
        assert_eq!(forward, backward, "forward and backward leaf-chain walks disagree");

        let mut seen = std::collections::HashSet::new();
        for id in &forward {
            assert!(seen.insert(*id), "leaf chain visited {id:?} more than once");
        }
    }

    fn scenario_tree(threshold: f64, branching: usize) -> CfTree<f64> {
        CfTreeParams::new(2)
            .with_threshold(threshold)
            .with_branching(crate::core::params::Branching::Fixed(branching))
            .with_leaf_budget(0)
            .build()
            .unwrap()
    }

    #[test]
    fn s1_absorption() {
        let mut tree = scenario_tree(0.5, 4);
        tree.insert(&[0.0, 0.0]).unwrap();
        tree.insert(&[0.1, 0.0]).unwrap();
        tree.insert(&[0.0, 0.1]).unwrap();

        assert_eq!(tree.leaf_entry_count(), 1);
        let e = &tree.entries()[0];
        assert_eq!(e.n(), 3);
        assert!((e.ls()[0] - 0.1).abs() < 1e-9);
        assert!((e.ls()[1] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn s2_leaf_fill_without_split() {
        let mut tree = scenario_tree(0.5, 4);
        for p in [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]] {
            tree.insert(&p).unwrap();
        }
        assert_eq!(tree.leaf_entry_count(), 4);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn s3_first_split() {
        let mut tree = scenario_tree(0.5, 4);
        for p in [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0], [-10.0, -10.0]] {
            tree.insert(&p).unwrap();
        }
        assert_eq!(tree.leaf_entry_count(), 5);
        assert!(tree.node_count() > 1, "root should have split into an internal root with two leaf children");

        for depth in tree.leaf_depths() {
            assert_eq!(depth, 1, "all leaves must sit at the same depth after a root split");
        }

        for leaf_entries in tree.entries_by_leaf() {
            let summed: CfEntry<f64> = {
                let mut acc = CfEntry::zero(2);
                for e in &leaf_entries {
                    acc.merge(e);
                }
                acc
            };
            assert_eq!(summed.n(), leaf_entries.iter().map(|e| e.n()).sum::<usize>());
        }
    }

    #[test]
    fn s4_rebuild_raises_threshold_and_does_not_increase_leaf_count() {
        let mut tree = CfTreeParams::new(2)
            .with_threshold(1e-6)
            .with_branching(crate::core::params::Branching::Fixed(4))
            .with_leaf_budget(1_000)
            .build::<f64>()
            .unwrap();
        for i in 0..20 {
            let x = (i as f64) * 5.0;
            tree.insert(&[x, x]).unwrap();
        }
        let before_threshold = tree.threshold();
        let before_count = tree.leaf_entry_count();

        tree.rebuild(true).unwrap();

        assert!(tree.threshold() >= before_threshold * 1.05 - 1e-9);
        assert!(tree.leaf_entry_count() <= before_count);
    }

    #[test]
    fn s5_idempotent_rebuild_without_extend() {
        let mut tree = scenario_tree(0.5, 4);
        for i in 0..15 {
            let x = (i as f64) * 3.0;
            tree.insert(&[x, x]).unwrap();
        }
        tree.rebuild(false).unwrap();
        let first = tree.entries();

        tree.rebuild(false).unwrap();
        let second = tree.entries();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.n(), b.n());
            assert_eq!(a.ls(), b.ls());
        }
    }

    #[test]
    fn s6_dimension_mismatch_leaves_tree_unchanged() {
        let mut tree = scenario_tree(0.5, 4);
        tree.insert(&[1.0, 1.0]).unwrap();
        let before = tree.entries();

        let err = tree.insert(&[1.0, 1.0, 1.0]).unwrap_err();
        assert_eq!(err, CfTreeError::DimensionMismatch { expected: 2, actual: 3 });
        assert_eq!(tree.entries(), before);
    }

    #[test]
    fn height_balance_holds_after_many_splits() {
        let mut tree = scenario_tree(0.5, 4);
        for i in 0..200 {
            let x = (i as f64) * 1.7;
            tree.insert(&[x, -x]).unwrap();
        }
        let depths = tree.leaf_depths();
        let first = depths[0];
        assert!(depths.iter().all(|&d| d == first), "leaves are not height-balanced: {depths:?}");
    }

    #[test]
    fn leaf_chain_well_formed_after_many_splits() {
        let mut tree = scenario_tree(0.5, 4);
        for i in 0..200 {
            let x = (i as f64) * 2.3;
            tree.insert(&[x, -x]).unwrap();
        }
        assert_leaf_chain_well_formed(&tree);
    }

    #[test]
    fn sum_consistency_holds_after_splits_and_rebuilds() {
        let mut tree = CfTreeParams::new(2)
            .with_threshold(1e-6)
            .with_branching(crate::core::params::Branching::Fixed(4))
            .with_leaf_budget(6)
            .build::<f64>()
            .unwrap();
        for i in 0..50 {
            let x = (i as f64) * 4.0;
            tree.insert(&[x, x]).unwrap();
        }

        fn check<U: Number>(tree: &CfTree<U>, id: NodeId) -> CfEntry<U> {
            let node = &tree.arena[id.index()];
            let mut acc = CfEntry::zero(tree.dim);
            if node.is_leaf() {
                for e in node.entries() {
                    acc.merge(e);
                }
            } else {
                for e in node.entries() {
                    let child_id = e.child().expect("internal entry missing a child link");
                    let child_sum = check(tree, child_id);
                    assert_eq!(e.n(), child_sum.n(), "internal entry's n disagrees with its child's true sum");
                    acc.merge(e);
                }
            }
            acc
        }

        let total = check(&tree, tree.root);
        assert_eq!(total.n(), tree.n_points());
        assert_eq!(total.n(), tree.entries().iter().map(|e| e.n()).sum::<usize>());
    }
}
