use std::error::Error;
use std::time::Duration;

use warmdag::engine::{CoordinatorOptions, LifecycleState, WarmupCoordinator};
use warmdag::errors::WarmdagError;
use warmdag_test_utils::{Probe, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn second_start_is_rejected() -> TestResult {
    init_tracing();
    let probe = Probe::new();

    let mut coordinator: WarmupCoordinator<String> = WarmupCoordinator::default();
    coordinator.register_action("only", probe.succeed("only"));

    with_timeout(coordinator.start()).await?;
    let second = with_timeout(coordinator.start()).await;

    assert!(matches!(second, Err(WarmdagError::AlreadyStarted)));
    assert_eq!(probe.calls("only"), 1);
    Ok(())
}

#[tokio::test]
async fn timed_out_coordinator_cannot_be_reused() -> TestResult {
    init_tracing();
    let probe = Probe::new();

    let options = CoordinatorOptions::default().with_grace_period(Duration::from_millis(20));
    let mut coordinator: WarmupCoordinator<String> = WarmupCoordinator::new(options);
    coordinator.register_action("hang", probe.stuck("hang"));

    let completed = with_timeout(coordinator.start_with_timeout(Duration::from_millis(30))).await?;
    assert!(!completed);

    let again = with_timeout(coordinator.start_with_timeout(Duration::from_secs(1))).await;
    assert!(matches!(again, Err(WarmdagError::AlreadyStarted)));
    assert_eq!(probe.calls("hang"), 1);
    Ok(())
}

#[tokio::test]
async fn cycle_fails_fast_without_running_anything() -> TestResult {
    init_tracing();
    let probe = Probe::new();

    let mut coordinator: WarmupCoordinator<String> = WarmupCoordinator::default();
    coordinator.add_dependency("a", "b");
    coordinator.add_dependency("b", "c");
    coordinator.add_dependency("c", "a");
    for unit in ["a", "b", "c"] {
        coordinator.register_action(unit, probe.succeed(unit));
    }

    let result = with_timeout(coordinator.start()).await;

    assert!(matches!(result, Err(WarmdagError::DagCycle(_))));
    assert!(probe.start_order().is_empty());
    assert_eq!(coordinator.state("a"), Some(LifecycleState::Pending));
    Ok(())
}

#[tokio::test]
async fn self_dependency_is_a_cycle() -> TestResult {
    init_tracing();

    let mut coordinator: WarmupCoordinator<String> = WarmupCoordinator::default();
    coordinator.add_dependency("loop", "loop");

    assert!(matches!(coordinator.build_tree(), Err(WarmdagError::DagCycle(_))));
    let result = with_timeout(coordinator.start_with_timeout(Duration::from_secs(1))).await;
    assert!(matches!(result, Err(WarmdagError::DagCycle(_))));
    Ok(())
}

#[tokio::test]
async fn unknown_unit_has_no_state() -> TestResult {
    init_tracing();

    let mut coordinator: WarmupCoordinator<String> = WarmupCoordinator::default();
    coordinator.add_dependency("a", "b");

    assert_eq!(coordinator.state("a"), Some(LifecycleState::Pending));
    assert_eq!(coordinator.state("missing"), None);

    with_timeout(coordinator.start()).await?;
    assert_eq!(coordinator.state("missing"), None);
    Ok(())
}
