//! Errors surfaced by the public `CfTree` API.
//!
//! Following the corpus's small-named-variants idiom (e.g. `borscht`'s
//! `InvalidBounds`/`MinBoundExceeded`) rather than a single catch-all
//! `Box<dyn Error>`, every failure mode the tree can report to a caller gets
//! its own variant with a `thiserror`-derived message.

use thiserror::Error;

/// Errors returned by [`crate::CfTree::insert`] and tree construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CfTreeError {
    /// The point passed to `insert` did not have the tree's configured
    /// dimensionality.
    #[error("point has dimension {actual}, but this tree was built for dimension {expected}")]
    DimensionMismatch {
        /// The dimension the tree was constructed with.
        expected: usize,
        /// The length of the offending point.
        actual: usize,
    },

    /// A tree parameter failed validation at construction time.
    #[error("invalid CfTree parameter: {0}")]
    InvalidParams(String),
}
