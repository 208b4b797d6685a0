// src/dag/node.rs

use std::sync::Arc;

/// A position in the dependency forest.
///
/// Children are the unit's direct dependencies. The same unit may appear at
/// several positions; nodes say nothing about how often a unit executes.
#[derive(Debug)]
pub struct DependencyNode<K> {
    unit: K,
    children: Vec<Arc<DependencyNode<K>>>,
}

impl<K> DependencyNode<K> {
    pub fn new(unit: K, children: Vec<Arc<DependencyNode<K>>>) -> Self {
        Self { unit, children }
    }

    pub fn unit(&self) -> &K {
        &self.unit
    }

    pub fn children(&self) -> &[Arc<DependencyNode<K>>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Pre-order traversal; `visit` receives each unit with its depth
    /// (the node itself is depth 0).
    pub fn walk(&self, visit: &mut impl FnMut(&K, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at(&self, depth: usize, visit: &mut impl FnMut(&K, usize)) {
        visit(&self.unit, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }
}
