// src/engine/coordinator.rs

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::{DependencyGraph, DependencyNode};
use crate::engine::action::Action;
use crate::engine::lifecycle::LifecycleState;
use crate::engine::options::CoordinatorOptions;
use crate::engine::record::ExecutionRecord;
use crate::engine::state_tracker::{StateListener, StateTracker};
use crate::engine::task::{RunContext, WarmupTask};
use crate::errors::{Result, UnitError, UnitErrorKind, WarmdagError, WarmupReport};
use crate::types::UnitId;

/// Scheduler facade: collects units, edges and actions, then runs the
/// whole plan once.
///
/// ```no_run
/// # async fn demo() -> warmdag::errors::Result<()> {
/// use warmdag::engine::{Action, WarmupCoordinator};
///
/// let mut coordinator: WarmupCoordinator<String> = WarmupCoordinator::default();
/// coordinator.add_dependency("api", "database");
/// coordinator.register_action("database", Action::from_fn(|| Ok(())));
/// coordinator.register_action("api", Action::from_fn(|| Ok(())));
/// coordinator.start().await?;
/// # Ok(())
/// # }
/// ```
///
/// A coordinator runs at most once; build a new one for another run.
pub struct WarmupCoordinator<K: UnitId> {
    graph: DependencyGraph<K>,
    actions: HashMap<K, Action>,
    options: CoordinatorOptions,
    states: Arc<StateTracker<K>>,
    record: Arc<ExecutionRecord<K>>,
    cancel: CancellationToken,
    started: AtomicBool,
}

impl<K: UnitId> fmt::Debug for WarmupCoordinator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarmupCoordinator")
            .field("graph", &self.graph)
            .field("options", &self.options)
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<K: UnitId> Default for WarmupCoordinator<K> {
    fn default() -> Self {
        Self::new(CoordinatorOptions::default())
    }
}

impl<K: UnitId> WarmupCoordinator<K> {
    pub fn new(options: CoordinatorOptions) -> Self {
        Self {
            graph: DependencyGraph::new(),
            actions: HashMap::new(),
            options,
            states: Arc::new(StateTracker::new()),
            record: Arc::new(ExecutionRecord::new()),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    pub fn graph(&self) -> &DependencyGraph<K> {
        &self.graph
    }

    /// Record that `dependent` must wait for `dependency`.
    pub fn add_dependency(&mut self, dependent: impl Into<K>, dependency: impl Into<K>) {
        let dependent = dependent.into();
        let dependency = dependency.into();

        if self
            .graph
            .add_dependency(dependent.clone(), dependency.clone())
        {
            debug!(dependent = %dependent, dependency = %dependency, "registered dependency");
        }

        self.states.register(dependent);
        self.states.register(dependency);
    }

    /// Attach the warm-up action of `unit`, registering the unit if needed.
    ///
    /// Units that never get an action warm up as no-ops.
    pub fn register_action(&mut self, unit: impl Into<K>, action: Action) {
        let unit = unit.into();
        self.graph.add_unit(unit.clone());
        self.states.register(unit.clone());

        if self.actions.insert(unit.clone(), action).is_some() {
            warn!(unit = %unit, "replacing previously registered action");
        }
    }

    pub fn add_listener(&self, listener: impl StateListener<K> + 'static) {
        self.states.add_listener(Arc::new(listener));
    }

    /// Snapshot of the dependency forest that a run would execute.
    pub fn build_tree(&self) -> Result<Vec<Arc<DependencyNode<K>>>> {
        self.graph.build_tree()
    }

    /// Current state of `unit`, or `None` if it was never registered.
    pub fn state<Q>(&self, unit: &Q) -> Option<LifecycleState>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.states.get(unit)
    }

    pub fn states(&self) -> HashMap<K, LifecycleState> {
        self.states.snapshot()
    }

    /// Every unit that failed or was interrupted in the run.
    pub fn errors(&self) -> Vec<UnitError<K>> {
        self.record.errors()
    }

    pub fn record(&self) -> &ExecutionRecord<K> {
        &self.record
    }

    /// Token that cancels the run the same way a timeout does.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every unit, with no time bound.
    ///
    /// Fails with [`WarmdagError::WarmupFailed`] listing every unit that
    /// failed or was interrupted (external cancellation).
    pub async fn start(&self) -> Result<()> {
        self.run(None).await?;
        self.failure_report()
    }

    /// Run every unit, giving up after `max_wait`.
    ///
    /// - `Ok(true)`: all units reached a terminal state and none failed.
    /// - `Ok(false)`: the bound elapsed (or the run was cancelled); units that
    ///   had not finished are `Interrupted` and listed in [`errors`](Self::errors).
    /// - `Err(WarmupFailed)`: the run completed but some units failed.
    pub async fn start_with_timeout(&self, max_wait: Duration) -> Result<bool> {
        if !self.run(Some(max_wait)).await? {
            return Ok(false);
        }
        self.failure_report().map(|()| true)
    }

    /// Drive one run; returns `true` if it finished without being cut off.
    async fn run(&self, max_wait: Option<Duration>) -> Result<bool> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(WarmdagError::AlreadyStarted);
        }

        let roots = self.graph.build_tree()?;

        info!(
            units = self.graph.len(),
            roots = roots.len(),
            pool_size = self.options.pool_size,
            ?max_wait,
            "starting warm-up run"
        );

        self.record.begin_run();

        let ctx = Arc::new(RunContext::new(
            self.actions.clone(),
            Arc::clone(&self.states),
            Arc::clone(&self.record),
            self.options.pool_size,
            self.cancel.clone(),
            self.options.dependency_failure_policy,
        ));

        let mut handle = tokio::spawn(WarmupTask::super_root(roots).run(ctx));

        let deadline = async {
            match max_wait {
                Some(max_wait) => tokio::time::sleep(max_wait).await,
                None => std::future::pending::<()>().await,
            }
        };

        let joined = tokio::select! {
            joined = &mut handle => Some(joined),
            _ = deadline => {
                warn!(?max_wait, "warm-up timed out; cancelling outstanding units");
                None
            }
            _ = self.cancel.cancelled() => {
                warn!("warm-up cancelled; stopping outstanding units");
                None
            }
        };

        let finished = match joined {
            Some(Ok(_)) => !self.cancel.is_cancelled(),
            Some(Err(err)) => {
                error!(error = %err, "warm-up root task ended abnormally");
                false
            }
            None => {
                self.cancel.cancel();
                self.drain(handle).await;
                false
            }
        };

        self.interrupt_unfinished();
        self.record.finish_run();

        let failed = self.record.errors().len();
        info!(
            finished,
            failed,
            elapsed = ?self.record.elapsed(),
            "warm-up run finished"
        );

        Ok(finished)
    }

    /// Give in-flight work the grace period to observe cancellation, then
    /// drop whatever is still running.
    async fn drain(&self, mut handle: JoinHandle<LifecycleState>) {
        let grace = self.options.grace_period;

        if tokio::time::timeout(grace, &mut handle).await.is_err() {
            warn!(?grace, "in-flight actions ignored cancellation; aborting them");
            handle.abort();
            let _ = handle.await;
        }
    }

    fn interrupt_unfinished(&self) {
        for unit in self.states.non_terminal() {
            if self.states.transition(&unit, LifecycleState::Interrupted) {
                let error = UnitError::new(unit.clone(), UnitErrorKind::Interrupted);
                self.record
                    .unit_finished(&unit, LifecycleState::Interrupted, Some(error));
            }
        }
    }

    fn failure_report(&self) -> Result<()> {
        let errors = self.record.errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WarmdagError::WarmupFailed(WarmupReport::from_errors(&errors)))
        }
    }
}
