use std::error::Error;
use std::sync::Arc;

use warmdag::dag::{DependencyGraph, DependencyNode};
use warmdag::errors::WarmdagError;

type TestResult = Result<(), Box<dyn Error>>;

/// Pre-order `(unit, depth)` listing of a forest.
fn flatten(forest: &[Arc<DependencyNode<&'static str>>]) -> Vec<(String, usize)> {
    let mut out = Vec::new();
    for root in forest {
        root.walk(&mut |unit, depth| out.push((unit.to_string(), depth)));
    }
    out
}

#[test]
fn simple_fan_out_tree_shape() -> TestResult {
    let mut graph = DependencyGraph::new();
    graph.add_dependency("A", "B");
    graph.add_dependency("A", "C");

    let forest = graph.build_tree()?;

    assert_eq!(forest.len(), 1);
    let root = &forest[0];
    assert_eq!(*root.unit(), "A");
    let children: Vec<_> = root.children().iter().map(|c| *c.unit()).collect();
    assert_eq!(children, vec!["B", "C"]);
    assert!(root.children().iter().all(|c| c.is_leaf()));
    Ok(())
}

#[test]
fn repeated_edges_are_idempotent() -> TestResult {
    let mut once = DependencyGraph::new();
    once.add_dependency("A", "B");
    once.add_dependency("B", "C");

    let mut many = DependencyGraph::new();
    for _ in 0..3 {
        many.add_dependency("A", "B");
        many.add_dependency("B", "C");
    }

    assert_eq!(many.edge_count(), 2);
    assert!(!many.add_dependency("A", "B"));
    assert_eq!(flatten(&once.build_tree()?), flatten(&many.build_tree()?));
    Ok(())
}

#[test]
fn building_twice_gives_the_same_forest() -> TestResult {
    let mut graph = DependencyGraph::new();
    graph.add_dependency("web", "api");
    graph.add_dependency("api", "db");
    graph.add_dependency("worker", "db");
    graph.add_unit("standalone");

    let first = flatten(&graph.build_tree()?);
    let second = flatten(&graph.build_tree()?);

    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![
            ("web".to_string(), 0),
            ("api".to_string(), 1),
            ("db".to_string(), 2),
            ("worker".to_string(), 0),
            ("db".to_string(), 1),
            ("standalone".to_string(), 0),
        ]
    );
    Ok(())
}

#[test]
fn diamond_shares_the_dependency_subtree() -> TestResult {
    let mut graph = DependencyGraph::new();
    graph.add_dependency("top", "left");
    graph.add_dependency("top", "right");
    graph.add_dependency("left", "bottom");
    graph.add_dependency("right", "bottom");

    let forest = graph.build_tree()?;
    assert_eq!(forest.len(), 1);

    let left = &forest[0].children()[0];
    let right = &forest[0].children()[1];
    assert!(Arc::ptr_eq(&left.children()[0], &right.children()[0]));
    Ok(())
}

#[test]
fn only_units_without_dependents_are_roots() -> TestResult {
    let mut graph = DependencyGraph::new();
    graph.add_dependency("A1", "B1");
    graph.add_dependency("A2", "B1");
    graph.add_dependency("B1", "C1");

    let roots: Vec<_> = graph.build_tree()?.iter().map(|r| *r.unit()).collect();
    assert_eq!(roots, vec!["A1", "A2"]);
    Ok(())
}

#[test]
fn neighbour_queries() {
    let mut graph = DependencyGraph::new();
    graph.add_dependency("api", "db");
    graph.add_dependency("api", "cache");
    graph.add_dependency("worker", "db");

    assert_eq!(graph.len(), 4);
    assert!(graph.contains("cache"));
    assert!(!graph.contains("nope"));
    assert_eq!(graph.dependencies_of("api"), vec![&"db", &"cache"]);
    assert_eq!(graph.dependents_of("db"), vec![&"api", &"worker"]);
    assert!(graph.dependencies_of("nope").is_empty());
    assert_eq!(graph.edges().len(), 3);
}

#[test]
fn cycle_is_reported() {
    let mut graph = DependencyGraph::new();
    graph.add_dependency("a", "b");
    graph.add_dependency("b", "a");

    match graph.build_tree() {
        Err(WarmdagError::DagCycle(msg)) => assert!(msg.contains("cycle detected")),
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn self_loop_is_reported() {
    let mut graph = DependencyGraph::new();
    graph.add_dependency("a", "a");

    assert!(matches!(graph.build_tree(), Err(WarmdagError::DagCycle(_))));
}

#[test]
fn empty_graph_builds_empty_forest() -> TestResult {
    let graph: DependencyGraph<String> = DependencyGraph::new();
    assert!(graph.is_empty());
    assert!(graph.build_tree()?.is_empty());
    Ok(())
}
