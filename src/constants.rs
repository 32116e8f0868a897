//! Hard-coded constants for the CF-tree.

/// Reference page size (bytes) used to derive the branching factor `B` when
/// a caller does not ask for a fixed `B`.
pub const PAGE_SIZE: usize = 4 * 1024;

/// Estimated per-node header size (bytes): the `prev`/`next` leaf links plus
/// a size field plus a leaf/internal dispatch tag. Used only to derive `B`
/// from `PAGE_SIZE`; the arena-backed `Node` itself does not need to fit
/// exactly in a page since it no longer holds raw entry storage inline in a
/// way that maps to real memory pages the way the original C++ `CFNode` did.
pub const NODE_HEADER_BYTES: usize = 2 * std::mem::size_of::<usize>() + std::mem::size_of::<usize>() + 8;

/// Minimum viable branching factor, regardless of what page-size derivation
/// would otherwise compute for very high dimensions.
pub const MIN_BRANCHING_FACTOR: usize = 4;

/// For avoiding divide-by-zero and near-zero floating point noise.
pub const EPSILON: f64 = 1e-8;

/// Forward-progress guard multiplier applied to the old threshold during a
/// `rebuild(extend = true)` when the geometry-derived candidate threshold
/// does not itself exceed the old one.
pub const THRESHOLD_GUARD_FACTOR: f64 = 1.05;

/// Safety cap on the number of compaction rounds a single `insert` may
/// trigger before giving up and logging a stall rather than looping forever.
pub const MAX_REBUILDS_PER_INSERT: usize = 64;
