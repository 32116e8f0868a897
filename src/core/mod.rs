//! Core CF-tree types: entries (A), node storage (B), and the tree itself,
//! which owns insertion (C), splitting (D), and rebuilding (E).

pub mod entry;
pub mod node;
pub mod params;
pub mod tree;
