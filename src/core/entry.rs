//! CF-entry arithmetic: the sufficient-statistics algebra that every other
//! part of the tree builds on (sub-module A of the design).

use crate::number::Number;

use super::node::NodeId;

/// A clustering feature: `(n, ls, ss)` summarising a set of points, plus an
/// optional link to the node holding its children.
///
/// An entry with `child = Some(_)` is an *internal* entry; one with
/// `child = None` is a *leaf* entry representing an actual sub-cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct CfEntry<U: Number> {
    n: usize,
    ls: Vec<U>,
    ss: U,
    child: Option<NodeId>,
}

impl<U: Number> CfEntry<U> {
    /// An empty entry over `dim` dimensions, with no children.
    pub fn zero(dim: usize) -> Self {
        CfEntry {
            n: 0,
            ls: vec![U::zero(); dim],
            ss: U::zero(),
            child: None,
        }
    }

    /// A leaf entry summarising the single given point.
    pub fn from_point(point: &[U]) -> Self {
        let ss = point.iter().copied().map(|x| x * x).sum();
        CfEntry {
            n: 1,
            ls: point.to_vec(),
            ss,
            child: None,
        }
    }

    /// An empty internal entry pointing at `child`, ready to accumulate the
    /// statistics of whatever gets placed under it.
    pub fn for_child(dim: usize, child: NodeId) -> Self {
        CfEntry {
            n: 0,
            ls: vec![U::zero(); dim],
            ss: U::zero(),
            child: Some(child),
        }
    }

    /// The number of points summarised by this entry.
    pub fn n(&self) -> usize {
        self.n
    }

    /// The per-dimension linear sum.
    pub fn ls(&self) -> &[U] {
        &self.ls
    }

    /// The sum of squared magnitudes.
    pub fn ss(&self) -> U {
        self.ss
    }

    /// The dimensionality this entry was built for.
    pub fn dim(&self) -> usize {
        self.ls.len()
    }

    /// The child node this entry points to, if it is an internal entry.
    pub fn child(&self) -> Option<NodeId> {
        self.child
    }

    /// Whether this entry has no child link (a raw cluster summary).
    pub fn is_leaf(&self) -> bool {
        self.child.is_none()
    }

    /// Re-points this entry's child link. Used only when wiring a freshly
    /// allocated node into a new parent-level entry; never re-parents an
    /// existing, populated entry.
    pub(crate) fn set_child(&mut self, child: NodeId) {
        self.child = Some(child);
    }

    /// The per-dimension centroid (`ls / n`). Panics if `n == 0`, since a
    /// centroid is only meaningful once the entry has absorbed a point.
    pub fn centroid(&self) -> Vec<U> {
        debug_assert!(self.n > 0, "centroid of an empty CfEntry is undefined");
        let n = U::from_usize(self.n);
        self.ls.iter().map(|&s| s / n).collect()
    }

    /// Merges `other`'s statistics into `self` in place. The result is
    /// always a summary (child link is never set by merging).
    pub fn merge(&mut self, other: &CfEntry<U>) {
        debug_assert_eq!(self.dim(), other.dim(), "cannot merge CfEntries of different dimension");
        self.n += other.n;
        for (a, &b) in self.ls.iter_mut().zip(other.ls.iter()) {
            *a += b;
        }
        self.ss += other.ss;
    }

    /// Removes `other`'s statistics from `self` in place (the inverse of
    /// [`merge`](Self::merge)).
    #[allow(dead_code)]
    pub fn unmerge(&mut self, other: &CfEntry<U>) {
        debug_assert_eq!(self.dim(), other.dim(), "cannot unmerge CfEntries of different dimension");
        self.n -= other.n;
        for (a, &b) in self.ls.iter_mut().zip(other.ls.iter()) {
            *a -= b;
        }
        self.ss -= other.ss;
    }

    /// Returns a new entry that is the componentwise merge of `self` and
    /// `other`, leaving both inputs untouched.
    pub fn merged(&self, other: &CfEntry<U>) -> CfEntry<U> {
        let mut out = self.clone();
        out.child = None;
        out.merge(other);
        out
    }

    /// Diameter² (§4.1): average pairwise squared distance between points
    /// within this entry, clamped to `>= 0`.
    pub fn diameter_sq(&self) -> U {
        if self.n < 2 {
            return U::zero();
        }
        let n = U::from_usize(self.n);
        let norm_ls_sq: U = self.ls.iter().copied().map(|x| x * x).sum();
        let numerator = n * self.ss - norm_ls_sq;
        let denom = n * (n - U::one());
        (U::from_f64(2.0) * numerator / denom).clamp_non_negative()
    }

    /// Radius² (§4.1): average squared distance from this entry's own
    /// points to its centroid, clamped to `>= 0`.
    pub fn radius_sq(&self) -> U {
        if self.n < 1 {
            return U::zero();
        }
        let n = U::from_usize(self.n);
        let norm_ls_sq: U = self.ls.iter().copied().map(|x| x * x).sum();
        (self.ss / n - norm_ls_sq / (n * n)).clamp_non_negative()
    }
}

/// D0 — squared Euclidean distance between two entries' centroids.
///
/// This is the reference choice for both descent and absorption. Per
/// §9 open-question (c): this is a **squared** distance, so a threshold `T`
/// compared against it must itself be squared.
pub fn d0<U: Number>(a: &CfEntry<U>, b: &CfEntry<U>) -> U {
    debug_assert_eq!(a.dim(), b.dim());
    let na = U::from_usize(a.n.max(1));
    let nb = U::from_usize(b.n.max(1));
    a.ls
        .iter()
        .zip(b.ls.iter())
        .map(|(&la, &lb)| {
            let d = la / na - lb / nb;
            d * d
        })
        .sum::<U>()
        .clamp_non_negative()
}

/// D1 — Manhattan distance between two entries' centroids.
pub fn d1<U: Number>(a: &CfEntry<U>, b: &CfEntry<U>) -> U {
    debug_assert_eq!(a.dim(), b.dim());
    let na = U::from_usize(a.n.max(1));
    let nb = U::from_usize(b.n.max(1));
    a.ls
        .iter()
        .zip(b.ls.iter())
        .map(|(&la, &lb)| {
            let d = la / na - lb / nb;
            if d < U::zero() {
                U::zero() - d
            } else {
                d
            }
        })
        .sum::<U>()
        .clamp_non_negative()
}

/// D2 — average inter-point distance between two *distinct* clusters.
pub fn d2<U: Number>(a: &CfEntry<U>, b: &CfEntry<U>) -> U {
    debug_assert_eq!(a.dim(), b.dim());
    let na = U::from_usize(a.n);
    let nb = U::from_usize(b.n);
    let dot: U = a.ls.iter().zip(b.ls.iter()).map(|(&x, &y)| x * y).sum();
    let numerator = nb * a.ss + na * b.ss - U::from_f64(2.0) * dot;
    (numerator / (na * nb)).clamp_non_negative()
}

/// D3 — average inter-point distance within the *combined* cluster that
/// would result from merging `a` and `b`.
pub fn d3<U: Number>(a: &CfEntry<U>, b: &CfEntry<U>) -> U {
    debug_assert_eq!(a.dim(), b.dim());
    let n = U::from_usize(a.n + b.n);
    let norm_sum_sq: U = a
        .ls
        .iter()
        .zip(b.ls.iter())
        .map(|(&x, &y)| {
            let s = x + y;
            s * s
        })
        .sum();
    let numerator = a.ss + b.ss - norm_sum_sq / n;
    (U::from_f64(2.0) / (n - U::one()) * numerator).clamp_non_negative()
}

/// A named distance/shape function over `CfEntry` pairs, analogous to the
/// host library's `Metric` enum-of-named-functions (`metric::cheap`,
/// `metric::expensive`) rather than a bare function pointer at every call
/// site: callers configuring a tree pick a `CfMetric` once and the tree
/// stores it as a plain `fn` pointer for the descent and absorb roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfMetric {
    /// Squared Euclidean distance between centroids (§4.1 D0).
    D0,
    /// Manhattan distance between centroids (§4.1 D1).
    D1,
    /// Average inter-point distance across distinct clusters (§4.1 D2).
    D2,
    /// Average inter-point distance within the combined cluster (§4.1 D3).
    D3,
}

impl CfMetric {
    /// The underlying distance function for this metric.
    pub fn distance_fn<U: Number>(self) -> fn(&CfEntry<U>, &CfEntry<U>) -> U {
        match self {
            CfMetric::D0 => d0,
            CfMetric::D1 => d1,
            CfMetric::D2 => d2,
            CfMetric::D3 => d3,
        }
    }

    /// Evaluates this metric between two entries.
    pub fn distance<U: Number>(self, a: &CfEntry<U>, b: &CfEntry<U>) -> U {
        self.distance_fn()(a, b)
    }
}

impl Default for CfMetric {
    fn default() -> Self {
        CfMetric::D0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn entry(points: &[[f64; 2]]) -> CfEntry<f64> {
        let mut e = CfEntry::zero(2);
        for p in points {
            e.merge(&CfEntry::from_point(p));
        }
        e
    }

    #[test]
    fn merge_and_centroid() {
        let e = entry(&[[0.0, 0.0], [2.0, 0.0]]);
        assert_eq!(e.n(), 2);
        assert_eq!(e.centroid(), vec![1.0, 0.0]);
    }

    #[test]
    fn merge_associative() {
        let a = entry(&[[0.0, 0.0]]);
        let b = entry(&[[1.0, 1.0]]);
        let c = entry(&[[2.0, -1.0]]);

        let left = a.merged(&b).merged(&c);
        let right = a.merged(&b.merged(&c));

        assert!(approx_eq!(f64, left.n() as f64, right.n() as f64));
        for (l, r) in left.ls().iter().zip(right.ls().iter()) {
            assert!(approx_eq!(f64, *l, *r));
        }
        assert!(approx_eq!(f64, left.ss(), right.ss()));
    }

    #[test]
    fn unmerge_is_inverse_of_merge() {
        let mut a = entry(&[[0.0, 0.0], [1.0, 1.0]]);
        let b = entry(&[[3.0, -2.0]]);
        let original = a.clone();
        a.merge(&b);
        a.unmerge(&b);
        assert_eq!(a.n(), original.n());
        assert_eq!(a.ls(), original.ls());
        assert!(approx_eq!(f64, a.ss(), original.ss()));
    }

    #[test]
    fn distances_are_non_negative() {
        let a = entry(&[[0.0, 0.0], [1.0, 0.0]]);
        let b = entry(&[[5.0, 5.0], [5.0, 6.0], [4.0, 5.0]]);

        assert!(d0(&a, &b) >= 0.0);
        assert!(d1(&a, &b) >= 0.0);
        assert!(d2(&a, &b) >= 0.0);
        assert!(d3(&a, &b) >= 0.0);
        assert!(a.diameter_sq() >= 0.0);
        assert!(a.radius_sq() >= 0.0);
        assert!(b.diameter_sq() >= 0.0);
        assert!(b.radius_sq() >= 0.0);
    }

    #[test]
    fn singleton_has_zero_diameter_and_radius() {
        let e = entry(&[[3.0, 4.0]]);
        assert_eq!(e.diameter_sq(), 0.0);
        assert_eq!(e.radius_sq(), 0.0);
    }

    #[test]
    fn d0_matches_squared_euclidean_of_centroids() {
        let a = entry(&[[0.0, 0.0], [0.0, 0.0]]);
        let b = entry(&[[3.0, 4.0]]);
        // centroid(a) = (0,0), centroid(b) = (3,4) => squared dist = 25
        assert!(approx_eq!(f64, d0(&a, &b), 25.0));
    }
}
