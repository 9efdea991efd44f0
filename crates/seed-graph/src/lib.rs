#![deny(missing_docs)]
//! Deterministic dependency resolution for registered seeders.
//!
//! Edges run from a dependency to its dependents. The resolver emits a single total order
//! that is reproducible for identical input: ready nodes are taken by ascending
//! `(priority, name)`, never by insertion order.

mod resolve;

pub use resolve::{resolve, resolve_subset, DependencyGraph};
