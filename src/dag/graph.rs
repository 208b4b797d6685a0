// src/dag/graph.rs

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::node::DependencyNode;
use crate::errors::{Result, WarmdagError};
use crate::types::UnitId;

/// Internal node structure: stores immediate deps and dependents by index.
#[derive(Debug, Clone)]
struct GraphNode<K> {
    unit: K,
    /// Direct dependencies, in the order their edges were added.
    deps: Vec<usize>,
    /// Direct dependents: units that declared a dependency on this one.
    dependents: Vec<usize>,
}

/// In-memory dependency graph keyed by unit identity.
///
/// Edges are `(dependent, dependency)` pairs and are indexed in both
/// directions. Units keep their registration order, which is what makes
/// [`build_tree`](Self::build_tree) deterministic.
#[derive(Debug, Clone)]
pub struct DependencyGraph<K> {
    nodes: Vec<GraphNode<K>>,
    index: HashMap<K, usize>,
    edge_count: usize,
}

impl<K: UnitId> Default for DependencyGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: UnitId> DependencyGraph<K> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            edge_count: 0,
        }
    }

    /// Register a unit without any edges. Registering twice is a no-op.
    pub fn add_unit(&mut self, unit: K) {
        self.intern(unit);
    }

    /// Record that `dependent` must wait for `dependency`.
    ///
    /// Both units are registered if unseen. Returns `false` if the edge was
    /// already present.
    pub fn add_dependency(&mut self, dependent: K, dependency: K) -> bool {
        let from = self.intern(dependent);
        let to = self.intern(dependency);

        if self.nodes[from].deps.contains(&to) {
            return false;
        }

        self.nodes[from].deps.push(to);
        self.nodes[to].dependents.push(from);
        self.edge_count += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains<Q>(&self, unit: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(unit)
    }

    /// All units in registration order.
    pub fn units(&self) -> impl Iterator<Item = &K> {
        self.nodes.iter().map(|n| &n.unit)
    }

    /// All `(dependent, dependency)` edges, grouped by dependent.
    pub fn edges(&self) -> Vec<(&K, &K)> {
        self.nodes
            .iter()
            .flat_map(|n| n.deps.iter().map(move |&d| (&n.unit, &self.nodes[d].unit)))
            .collect()
    }

    /// Immediate dependencies of a unit (what it waits for).
    pub fn dependencies_of<Q>(&self, unit: &Q) -> Vec<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.neighbours(unit, |n| &n.deps)
    }

    /// Immediate dependents of a unit (who waits for it).
    pub fn dependents_of<Q>(&self, unit: &Q) -> Vec<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.neighbours(unit, |n| &n.dependents)
    }

    /// Build the dependency forest used by the warm-up tasks.
    ///
    /// Roots are units nothing depends on; each node's children are its
    /// direct dependencies. A unit reachable through several paths shows up
    /// once per path (the sub-tree instance is shared). Fails with
    /// [`WarmdagError::DagCycle`] if the edges contain a cycle.
    pub fn build_tree(&self) -> Result<Vec<Arc<DependencyNode<K>>>> {
        self.ensure_acyclic()?;

        let mut memo: HashMap<usize, Arc<DependencyNode<K>>> = HashMap::new();
        let roots: Vec<_> = (0..self.nodes.len())
            .filter(|&idx| self.nodes[idx].dependents.is_empty())
            .map(|idx| self.build_node(idx, &mut memo))
            .collect();

        debug!(
            units = self.nodes.len(),
            edges = self.edge_count,
            roots = roots.len(),
            "built dependency forest"
        );

        Ok(roots)
    }

    fn intern(&mut self, unit: K) -> usize {
        if let Some(&idx) = self.index.get(&unit) {
            return idx;
        }

        let idx = self.nodes.len();
        self.index.insert(unit.clone(), idx);
        self.nodes.push(GraphNode {
            unit,
            deps: Vec::new(),
            dependents: Vec::new(),
        });
        idx
    }

    fn neighbours<Q>(&self, unit: &Q, pick: impl Fn(&GraphNode<K>) -> &Vec<usize>) -> Vec<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(unit) {
            Some(&idx) => pick(&self.nodes[idx])
                .iter()
                .map(|&n| &self.nodes[n].unit)
                .collect(),
            None => Vec::new(),
        }
    }

    fn build_node(
        &self,
        idx: usize,
        memo: &mut HashMap<usize, Arc<DependencyNode<K>>>,
    ) -> Arc<DependencyNode<K>> {
        if let Some(node) = memo.get(&idx) {
            return Arc::clone(node);
        }

        let children = self.nodes[idx]
            .deps
            .iter()
            .map(|&dep| self.build_node(dep, memo))
            .collect();

        let node = Arc::new(DependencyNode::new(self.nodes[idx].unit.clone(), children));
        memo.insert(idx, Arc::clone(&node));
        node
    }

    fn ensure_acyclic(&self) -> Result<()> {
        // Edge direction: dependency -> dependent, so a topological order is
        // a valid warm-up order.
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

        for idx in 0..self.nodes.len() {
            graph.add_node(idx);
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            for &dep in &node.deps {
                graph.add_edge(dep, idx, ());
            }
        }

        // A topological sort fails on any cycle, self loops included.
        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(WarmdagError::DagCycle(format!(
                "cycle detected in dependency graph involving unit '{}'",
                self.nodes[cycle.node_id()].unit
            ))),
        }
    }
}
