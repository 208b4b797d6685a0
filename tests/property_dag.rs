use std::collections::BTreeSet;

use proptest::prelude::*;
use warmdag::engine::{CoordinatorOptions, LifecycleState, WarmupCoordinator};
use warmdag_test_utils::Probe;

/// Random DAG: unit `i` may only depend on units `0..i`, plus a flag per
/// unit saying whether its action fails.
#[derive(Debug, Clone)]
struct DagCase {
    deps: Vec<BTreeSet<usize>>,
    failing: Vec<bool>,
}

fn dag_strategy(max_units: usize) -> impl Strategy<Value = DagCase> {
    (1..=max_units).prop_flat_map(|n| {
        (
            proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n),
            proptest::collection::vec(proptest::bool::weighted(0.2), n),
        )
            .prop_map(|(raw, failing)| {
                let deps = raw
                    .into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        if i == 0 {
                            BTreeSet::new()
                        } else {
                            picks.into_iter().map(|p| p % i).collect()
                        }
                    })
                    .collect();
                DagCase { deps, failing }
            })
    })
}

fn name(i: usize) -> String {
    format!("unit_{i}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_unit_runs_once_after_its_dependencies(case in dag_strategy(12), pool in 1usize..4) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let probe = Probe::new();
        let options = CoordinatorOptions::default().with_pool_size(pool);
        let mut coordinator: WarmupCoordinator<String> = WarmupCoordinator::new(options);

        for (i, deps) in case.deps.iter().enumerate() {
            let action = if case.failing[i] {
                probe.fail(&name(i), "generated failure")
            } else {
                probe.succeed(&name(i))
            };
            coordinator.register_action(name(i), action);
            for &d in deps {
                coordinator.add_dependency(name(i), name(d));
            }
        }

        let _ = runtime.block_on(coordinator.start());

        for (i, deps) in case.deps.iter().enumerate() {
            prop_assert_eq!(probe.calls(&name(i)), 1);

            let expected = if case.failing[i] {
                LifecycleState::Failed
            } else {
                LifecycleState::Active
            };
            prop_assert_eq!(coordinator.state(name(i).as_str()), Some(expected));

            for &d in deps {
                prop_assert!(probe.finished_before(&name(d), &name(i)));
            }
        }
        prop_assert!(probe.max_concurrency() <= pool);
        prop_assert_eq!(
            coordinator.errors().len(),
            case.failing.iter().filter(|f| **f).count()
        );
    }
}
