// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{PlanFile, load_and_validate, parse_duration};
use crate::engine::{CoordinatorOptions, TracingListener, UnitName, WarmupCoordinator};
use crate::errors::WarmdagError;
use crate::exec::shell_action;
use crate::types::UnitId;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading + validation
/// - coordinator construction (CLI flags override `[config]`)
/// - Ctrl-C handling
/// - the optional run timeout
pub async fn run(args: CliArgs) -> Result<()> {
    let plan = load_and_validate(&args.plan)?;

    if args.dry_run {
        print_dry_run(&plan)?;
        return Ok(());
    }

    let coordinator = coordinator_from_plan(&plan, args.pool_size)?;
    coordinator.add_listener(TracingListener);

    // Ctrl-C → interrupt the run; reported apart from a timeout.
    let interrupt = CancellationToken::new();
    {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; cancelling warm-up");
            interrupt.cancel();
        });
    }

    let timeout = match args.timeout {
        Some(t) => Some(t),
        None => plan.config.timeout.as_deref().map(parse_duration).transpose()?,
    };

    let outcome = run_coordinator(&coordinator, timeout, interrupt).await;

    print_summary(&coordinator);
    outcome?;

    info!("all units warmed up");
    Ok(())
}

/// Run `coordinator` once, optionally bounded by `timeout`.
///
/// Cancelling `interrupt` stops the run like a timeout does, but a bounded
/// run cut short that way fails with [`WarmdagError::Interrupted`] rather
/// than [`WarmdagError::TimedOut`].
pub async fn run_coordinator<K: UnitId>(
    coordinator: &WarmupCoordinator<K>,
    timeout: Option<Duration>,
    interrupt: CancellationToken,
) -> errors::Result<()> {
    let forward = {
        let cancel = coordinator.cancellation_token();
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            interrupt.cancelled().await;
            cancel.cancel();
        })
    };

    let outcome = match timeout {
        Some(max_wait) => match coordinator.start_with_timeout(max_wait).await {
            Ok(true) => Ok(()),
            Ok(false) if interrupt.is_cancelled() => Err(WarmdagError::Interrupted),
            Ok(false) => Err(WarmdagError::TimedOut(max_wait)),
            Err(e) => Err(e),
        },
        None => coordinator.start().await,
    };

    forward.abort();
    outcome
}

/// Build a coordinator for every unit of a validated plan.
///
/// Each unit gets a [`shell_action`]; `after` entries become edges.
/// `pool_size` overrides `[config].pool_size` when given.
pub fn coordinator_from_plan(
    plan: &PlanFile,
    pool_size: Option<usize>,
) -> errors::Result<WarmupCoordinator<UnitName>> {
    let mut options = CoordinatorOptions::from_config(&plan.config)?;
    if let Some(pool_size) = pool_size {
        options = options.with_pool_size(pool_size);
    }

    let mut coordinator = WarmupCoordinator::new(options);
    for (name, unit) in plan.units() {
        coordinator.register_action(name.clone(), shell_action(name.clone(), unit.cmd.clone()));
        for dep in &unit.after {
            coordinator.add_dependency(name.clone(), dep.clone());
        }
    }

    debug!(
        units = coordinator.graph().len(),
        edges = coordinator.graph().edge_count(),
        "coordinator built from plan"
    );

    Ok(coordinator)
}

/// Final per-unit states, sorted by name.
fn print_summary(coordinator: &WarmupCoordinator<UnitName>) {
    let states: BTreeMap<_, _> = coordinator.states().into_iter().collect();
    let elapsed = coordinator.record().elapsed();

    println!("warm-up summary ({} units):", states.len());
    for (unit, state) in &states {
        match coordinator.record().get(unit).and_then(|r| r.duration()) {
            Some(d) => println!("  {unit:<24} {state:<12} {d:?}"),
            None => println!("  {unit:<24} {state}"),
        }
    }
    if let Some(elapsed) = elapsed {
        println!("elapsed: {elapsed:?}");
    }
}

/// Dry-run output: settings plus the dependency forest, one line per node.
///
/// Shared dependencies appear under every dependent; they still only run
/// once.
fn print_dry_run(plan: &PlanFile) -> Result<()> {
    let coordinator = coordinator_from_plan(plan, None)?;
    let options = coordinator.options();
    let forest = coordinator.build_tree()?;

    println!("warmdag dry-run");
    println!("  config.pool_size = {}", options.pool_size);
    println!("  config.grace_period = {:?}", options.grace_period);
    if let Some(ref timeout) = plan.config.timeout {
        println!("  config.timeout = {timeout}");
    }
    println!(
        "  config.on_dependency_failure = {:?}",
        options.dependency_failure_policy
    );
    println!();

    println!("units ({}):", plan.unit.len());
    for root in &forest {
        root.walk(&mut |unit: &UnitName, depth| {
            let cmd = plan.unit.get(unit).map(|u| u.cmd.as_str()).unwrap_or("");
            println!("  {:indent$}- {unit}: {cmd}", "", indent = depth * 2);
        });
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
