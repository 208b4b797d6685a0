// src/engine/task.rs

//! Recursive fan-out/fan-in warm-up task.
//!
//! A [`WarmupTask`] for a node spawns one child task per dependency, joins
//! all of them, and only then invokes the node's own action. Units that
//! appear at several places in the forest are claimed by the first task to
//! reach them; every other task for the same unit waits on that claim.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dag::DependencyNode;
use crate::engine::action::Action;
use crate::engine::lifecycle::LifecycleState;
use crate::engine::record::ExecutionRecord;
use crate::engine::state_tracker::StateTracker;
use crate::errors::{UnitError, UnitErrorKind};
use crate::types::{DependencyFailurePolicy, UnitId};

/// Shared state for every task of one run.
pub(crate) struct RunContext<K> {
    actions: HashMap<K, Action>,
    /// unit -> eventual terminal state published by the claiming task.
    claims: Mutex<HashMap<K, watch::Receiver<Option<LifecycleState>>>>,
    states: Arc<StateTracker<K>>,
    record: Arc<ExecutionRecord<K>>,
    permits: Semaphore,
    cancel: CancellationToken,
    policy: DependencyFailurePolicy,
}

enum Claim {
    Owner(watch::Sender<Option<LifecycleState>>),
    Waiter(watch::Receiver<Option<LifecycleState>>),
}

impl<K: UnitId> RunContext<K> {
    pub(crate) fn new(
        actions: HashMap<K, Action>,
        states: Arc<StateTracker<K>>,
        record: Arc<ExecutionRecord<K>>,
        pool_size: usize,
        cancel: CancellationToken,
        policy: DependencyFailurePolicy,
    ) -> Self {
        Self {
            actions,
            claims: Mutex::new(HashMap::new()),
            states,
            record,
            permits: Semaphore::new(pool_size.clamp(1, Semaphore::MAX_PERMITS)),
            cancel,
            policy,
        }
    }

    fn claim(&self, unit: &K) -> Claim {
        let mut claims = self
            .claims
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(rx) = claims.get(unit) {
            return Claim::Waiter(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        claims.insert(unit.clone(), rx);
        Claim::Owner(tx)
    }

    /// Move `unit` to a terminal state and record it.
    ///
    /// If the transition is rejected (someone else already finalized the
    /// unit), the unit's current state wins.
    fn finish(&self, unit: &K, state: LifecycleState, kind: Option<UnitErrorKind>) -> LifecycleState {
        if self.states.transition(unit, state) {
            let error = kind.map(|kind| UnitError::new(unit.clone(), kind));
            self.record.unit_finished(unit, state, error);
            state
        } else {
            self.states.get(unit).unwrap_or(state)
        }
    }

    fn interrupt(&self, unit: &K) -> LifecycleState {
        debug!(unit = %unit, "cancellation observed before action; interrupting unit");
        self.finish(unit, LifecycleState::Interrupted, Some(UnitErrorKind::Interrupted))
    }
}

/// One unit of concurrent work: a unit plus the dependency nodes to warm
/// up first.
///
/// The super-root task has no unit of its own; it only fans out to the
/// roots of the forest.
#[derive(Debug)]
pub(crate) struct WarmupTask<K> {
    unit: Option<K>,
    children: Vec<Arc<DependencyNode<K>>>,
}

impl<K: UnitId> WarmupTask<K> {
    pub(crate) fn for_node(node: &DependencyNode<K>) -> Self {
        Self {
            unit: Some(node.unit().clone()),
            children: node.children().to_vec(),
        }
    }

    pub(crate) fn super_root(roots: Vec<Arc<DependencyNode<K>>>) -> Self {
        Self {
            unit: None,
            children: roots,
        }
    }

    /// Run this task to completion and return the unit's terminal state.
    ///
    /// The super-root returns `Active` only if every root did.
    pub(crate) fn run(self, ctx: Arc<RunContext<K>>) -> BoxFuture<'static, LifecycleState> {
        Box::pin(async move {
            match self.unit {
                Some(unit) => run_unit(unit, self.children, ctx).await,
                None => {
                    let outcomes = join_children(&self.children, &ctx).await;
                    if outcomes.iter().all(|(_, state)| *state == LifecycleState::Active) {
                        LifecycleState::Active
                    } else {
                        LifecycleState::Failed
                    }
                }
            }
        })
    }
}

async fn run_unit<K: UnitId>(
    unit: K,
    children: Vec<Arc<DependencyNode<K>>>,
    ctx: Arc<RunContext<K>>,
) -> LifecycleState {
    let claim = match ctx.claim(&unit) {
        Claim::Owner(tx) => tx,
        Claim::Waiter(rx) => return wait_for_claim(&unit, rx, &ctx).await,
    };

    let outcome = execute(&unit, &children, &ctx).await;
    claim.send_replace(Some(outcome));
    outcome
}

/// Another task owns `unit`; wait for its outcome instead of running again.
async fn wait_for_claim<K: UnitId>(
    unit: &K,
    mut rx: watch::Receiver<Option<LifecycleState>>,
    ctx: &RunContext<K>,
) -> LifecycleState {
    debug!(unit = %unit, "unit already claimed; waiting for its outcome");

    // A dropped sender means the owning task was aborted.
    let published = async { rx.wait_for(Option::is_some).await.map(|state| *state).ok().flatten() };

    tokio::select! {
        state = published => state.unwrap_or(LifecycleState::Interrupted),
        _ = ctx.cancel.cancelled() => LifecycleState::Interrupted,
    }
}

async fn execute<K: UnitId>(
    unit: &K,
    children: &[Arc<DependencyNode<K>>],
    ctx: &Arc<RunContext<K>>,
) -> LifecycleState {
    if ctx.cancel.is_cancelled() {
        return ctx.interrupt(unit);
    }

    let outcomes = join_children(children, ctx).await;

    if ctx.cancel.is_cancelled() {
        return ctx.interrupt(unit);
    }

    if let Some((dependency, state)) = outcomes
        .iter()
        .find(|(_, state)| *state != LifecycleState::Active)
    {
        match ctx.policy {
            DependencyFailurePolicy::Continue => {
                debug!(
                    unit = %unit,
                    dependency = %dependency,
                    dependency_state = %state,
                    "dependency did not warm up; running action anyway"
                );
            }
            DependencyFailurePolicy::Skip => {
                warn!(
                    unit = %unit,
                    dependency = %dependency,
                    dependency_state = %state,
                    "dependency did not warm up; skipping action"
                );
                ctx.states.transition(unit, LifecycleState::Warming);
                return ctx.finish(
                    unit,
                    LifecycleState::Failed,
                    Some(UnitErrorKind::DependencyFailed {
                        dependency: dependency.to_string(),
                    }),
                );
            }
        }
    }

    // Only running actions hold a pool slot; waiting on children does not.
    let _permit = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return ctx.interrupt(unit),
        permit = ctx.permits.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return ctx.interrupt(unit),
        },
    };

    if !ctx.states.transition(unit, LifecycleState::Warming) {
        return ctx.states.get(unit).unwrap_or(LifecycleState::Interrupted);
    }
    ctx.record.unit_started(unit);

    let started = Instant::now();
    debug!(unit = %unit, "invoking warm-up action");

    let result = match ctx.actions.get(unit) {
        Some(action) => {
            AssertUnwindSafe(action.invoke(ctx.cancel.clone()))
                .catch_unwind()
                .await
        }
        None => {
            debug!(unit = %unit, "no action registered; treating as no-op");
            Ok(Ok(()))
        }
    };

    let elapsed = started.elapsed();

    match result {
        Ok(Ok(())) => {
            info!(unit = %unit, ?elapsed, "unit warmed up");
            ctx.finish(unit, LifecycleState::Active, None)
        }
        Ok(Err(err)) if ctx.cancel.is_cancelled() => {
            debug!(unit = %unit, error = %err, "action stopped after cancellation");
            ctx.finish(unit, LifecycleState::Interrupted, Some(UnitErrorKind::Interrupted))
        }
        Ok(Err(err)) => {
            warn!(unit = %unit, ?elapsed, error = %err, "warm-up action failed");
            ctx.finish(
                unit,
                LifecycleState::Failed,
                Some(UnitErrorKind::Action(Arc::new(err))),
            )
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(unit = %unit, panic = %message, "warm-up action panicked");
            ctx.finish(
                unit,
                LifecycleState::Failed,
                Some(UnitErrorKind::Panicked(message)),
            )
        }
    }
}

/// Spawn one task per child node and wait for all of them.
///
/// Returns each child's unit with its terminal state, in completion order.
async fn join_children<K: UnitId>(
    children: &[Arc<DependencyNode<K>>],
    ctx: &Arc<RunContext<K>>,
) -> Vec<(K, LifecycleState)> {
    let mut set = JoinSet::new();
    let mut spawned = HashMap::new();

    for child in children {
        let task = WarmupTask::for_node(child);
        let handle = set.spawn(task.run(Arc::clone(ctx)));
        spawned.insert(handle.id(), child.unit().clone());
    }

    let mut outcomes = Vec::with_capacity(children.len());

    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((id, state)) => {
                if let Some(unit) = spawned.remove(&id) {
                    outcomes.push((unit, state));
                }
            }
            Err(err) => {
                if let Some(unit) = spawned.remove(&err.id()) {
                    warn!(unit = %unit, error = %err, "warm-up task ended abnormally");
                    outcomes.push((unit, LifecycleState::Failed));
                }
            }
        }
    }

    outcomes
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
