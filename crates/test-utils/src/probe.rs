//! Instrumented actions for coordinator tests.
//!
//! A [`Probe`] hands out [`Action`]s that record when each unit's action
//! started and finished, so tests can assert ordering, single execution and
//! concurrency bounds without real processes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use warmdag::engine::Action;

/// One execution of a unit's action.
#[derive(Debug, Clone, Copy)]
pub struct Invocation {
    pub started: Instant,
    /// Set when the action returned, panicked or was dropped.
    pub finished: Option<Instant>,
    /// `true` only if the action's future ran to completion.
    pub completed: bool,
}

#[derive(Debug, Default)]
struct ProbeState {
    invocations: HashMap<String, Vec<Invocation>>,
    start_order: Vec<String>,
    running: usize,
    max_running: usize,
}

/// Shared recorder; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    state: Arc<Mutex<ProbeState>>,
}

/// Marks the invocation finished even when the action panics or is dropped.
struct FinishGuard {
    probe: Probe,
    unit: String,
    completed: bool,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        let mut state = self.probe.lock();
        state.running = state.running.saturating_sub(1);
        if let Some(inv) = state
            .invocations
            .get_mut(&self.unit)
            .and_then(|v| v.iter_mut().rev().find(|i| i.finished.is_none()))
        {
            inv.finished = Some(Instant::now());
            inv.completed = self.completed;
        }
    }
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, unit: &str) -> FinishGuard {
        let mut state = self.lock();
        state.running += 1;
        state.max_running = state.max_running.max(state.running);
        state.start_order.push(unit.to_string());
        state
            .invocations
            .entry(unit.to_string())
            .or_default()
            .push(Invocation {
                started: Instant::now(),
                finished: None,
                completed: false,
            });

        FinishGuard {
            probe: self.clone(),
            unit: unit.to_string(),
            completed: false,
        }
    }

    /// Wrap an async body so every call to it is recorded under `unit`.
    pub fn action<F, Fut>(&self, unit: &str, body: F) -> Action
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let probe = self.clone();
        let unit = unit.to_string();
        let body = Arc::new(body);

        Action::new(move |cancel| {
            let probe = probe.clone();
            let unit = unit.clone();
            let body = Arc::clone(&body);
            async move {
                let mut guard = probe.begin(&unit);
                let res = body(cancel).await;
                guard.completed = true;
                res
            }
        })
    }

    /// Succeeds immediately.
    pub fn succeed(&self, unit: &str) -> Action {
        self.action(unit, |_| async { Ok(()) })
    }

    /// Sleeps for `delay`, then succeeds.
    pub fn sleep(&self, unit: &str, delay: Duration) -> Action {
        self.action(unit, move |_| async move {
            tokio::time::sleep(delay).await;
            Ok(())
        })
    }

    /// Fails with `message`.
    pub fn fail(&self, unit: &str, message: &str) -> Action {
        let message = message.to_string();
        self.action(unit, move |_| {
            let message = message.clone();
            async move { Err(anyhow!(message)) }
        })
    }

    /// Sleeps for `delay`, then fails.
    pub fn fail_after(&self, unit: &str, delay: Duration, message: &str) -> Action {
        let message = message.to_string();
        self.action(unit, move |_| {
            let message = message.clone();
            async move {
                tokio::time::sleep(delay).await;
                Err(anyhow!(message))
            }
        })
    }

    /// Never returns and ignores cancellation.
    pub fn stuck(&self, unit: &str) -> Action {
        self.action(unit, |_| async {
            std::future::pending::<()>().await;
            Ok(())
        })
    }

    /// Waits for cancellation, then returns an error.
    pub fn cooperative(&self, unit: &str) -> Action {
        self.action(unit, |cancel| async move {
            cancel.cancelled().await;
            Err(anyhow!("stopped on cancellation"))
        })
    }

    /// Panics with `message`.
    #[allow(unreachable_code)]
    pub fn panic(&self, unit: &str, message: &'static str) -> Action {
        self.action(unit, move |_| async move {
            panic!("{message}");
            Ok(())
        })
    }

    /// Number of times `unit`'s action was invoked.
    pub fn calls(&self, unit: &str) -> usize {
        self.lock().invocations.get(unit).map_or(0, Vec::len)
    }

    pub fn invocations(&self, unit: &str) -> Vec<Invocation> {
        self.lock().invocations.get(unit).cloned().unwrap_or_default()
    }

    /// Units in the order their actions started.
    pub fn start_order(&self) -> Vec<String> {
        self.lock().start_order.clone()
    }

    /// Highest number of recorded actions running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.lock().max_running
    }

    /// `true` if every invocation of `dependency` finished before any
    /// invocation of `dependent` started. Vacuously true if either never ran.
    pub fn finished_before(&self, dependency: &str, dependent: &str) -> bool {
        let state = self.lock();
        let (Some(deps), Some(dents)) = (
            state.invocations.get(dependency),
            state.invocations.get(dependent),
        ) else {
            return true;
        };

        deps.iter().all(|d| {
            d.finished
                .is_some_and(|fin| dents.iter().all(|t| fin <= t.started))
        })
    }

    /// `true` if some invocation of `a` overlapped some invocation of `b`.
    pub fn overlapped(&self, a: &str, b: &str) -> bool {
        let state = self.lock();
        let (Some(xs), Some(ys)) = (state.invocations.get(a), state.invocations.get(b)) else {
            return false;
        };
        let far = Instant::now() + Duration::from_secs(3600);

        xs.iter().any(|x| {
            ys.iter().any(|y| {
                let x_end = x.finished.unwrap_or(far);
                let y_end = y.finished.unwrap_or(far);
                x.started < y_end && y.started < x_end
            })
        })
    }
}
