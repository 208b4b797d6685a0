// src/engine/state_tracker.rs

//! Concurrent unit → lifecycle state map with transition listeners.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, trace};

use crate::engine::lifecycle::LifecycleState;
use crate::types::UnitId;

/// Observer of state transitions.
///
/// Called synchronously from the task that performed the transition, after
/// the state map's lock has been released. Notifications are serialized, so
/// every listener sees a unit's transitions in the order they were applied.
/// Keep implementations short, and never call [`StateTracker::transition`]
/// from inside one.
pub trait StateListener<K>: Send + Sync {
    fn on_transition(&self, unit: &K, from: LifecycleState, to: LifecycleState);
}

impl<K, F> StateListener<K> for F
where
    F: Fn(&K, LifecycleState, LifecycleState) + Send + Sync,
{
    fn on_transition(&self, unit: &K, from: LifecycleState, to: LifecycleState) {
        self(unit, from, to)
    }
}

/// Listener that reports every transition through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl<K: fmt::Display> StateListener<K> for TracingListener {
    fn on_transition(&self, unit: &K, from: LifecycleState, to: LifecycleState) {
        match to {
            LifecycleState::Failed | LifecycleState::Interrupted => {
                tracing::warn!(unit = %unit, %from, %to, "unit state changed")
            }
            _ => tracing::info!(unit = %unit, %from, %to, "unit state changed"),
        }
    }
}

/// Owns the lifecycle state of every unit.
///
/// Transitions are validated against [`LifecycleState::can_transition_to`],
/// so a unit never leaves a terminal state.
pub struct StateTracker<K> {
    states: Mutex<HashMap<K, LifecycleState>>,
    /// Held from the state change until every listener has been notified.
    notifying: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn StateListener<K>>>>,
}

impl<K: UnitId> fmt::Debug for StateTracker<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTracker")
            .field("states", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl<K: UnitId> Default for StateTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: UnitId> StateTracker<K> {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            notifying: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn StateListener<K>>) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    /// Seed a unit as `Pending` unless it is already tracked.
    pub fn register(&self, unit: K) {
        self.lock().entry(unit).or_insert(LifecycleState::Pending);
    }

    pub fn get<Q>(&self, unit: &Q) -> Option<LifecycleState>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().get(unit).copied()
    }

    /// Move `unit` to `to`.
    ///
    /// Returns `false` (and changes nothing) if the unit is unknown or the
    /// transition is not allowed from its current state.
    pub fn transition(&self, unit: &K, to: LifecycleState) -> bool {
        let _ordered = self
            .notifying
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let from = {
            let mut states = self.lock();
            let Some(current) = states.get_mut(unit) else {
                debug!(unit = %unit, %to, "transition for unknown unit; ignoring");
                return false;
            };

            if !current.can_transition_to(to) {
                trace!(unit = %unit, from = %current, %to, "transition rejected");
                return false;
            }

            let from = *current;
            *current = to;
            from
        };

        self.notify(unit, from, to);
        true
    }

    /// Copy of every unit's current state.
    pub fn snapshot(&self) -> HashMap<K, LifecycleState> {
        self.lock().clone()
    }

    /// Units that are still `Pending` or `Warming`.
    pub fn non_terminal(&self) -> Vec<K> {
        self.lock()
            .iter()
            .filter(|(_, state)| !state.is_terminal())
            .map(|(unit, _)| unit.clone())
            .collect()
    }

    fn notify(&self, unit: &K, from: LifecycleState, to: LifecycleState) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for listener in listeners {
            listener.on_transition(unit, from, to);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, LifecycleState>> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
