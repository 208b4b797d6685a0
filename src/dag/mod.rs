// src/dag/mod.rs

//! Dependency graph and the forest derived from it.
//!
//! - [`graph`] stores unit identities and `(dependent, dependency)` edges,
//!   checks for cycles and builds the forest.
//! - [`node`] is the immutable tree node the warm-up tasks walk.

pub mod graph;
pub mod node;

pub use graph::DependencyGraph;
pub use node::DependencyNode;
