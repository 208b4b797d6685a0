// src/engine/record.rs

//! Run-scoped ledger of unit outcomes, timestamps and errors.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::engine::lifecycle::LifecycleState;
use crate::errors::UnitError;
use crate::types::UnitId;

/// What the ledger knows about one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitRecord {
    /// When the unit's action was invoked (entered `Warming`).
    pub started_at: Option<Instant>,
    /// When the unit reached a terminal state.
    pub finished_at: Option<Instant>,
    /// Terminal state, once reached.
    pub outcome: Option<LifecycleState>,
}

impl UnitRecord {
    pub fn duration(&self) -> Option<Duration> {
        Some(self.finished_at?.duration_since(self.started_at?))
    }
}

#[derive(Debug)]
struct Ledger<K> {
    units: HashMap<K, UnitRecord>,
    errors: Vec<UnitError<K>>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

/// Ledger for a single run, shared between the coordinator and its tasks.
#[derive(Debug)]
pub struct ExecutionRecord<K> {
    inner: Mutex<Ledger<K>>,
}

impl<K: UnitId> Default for ExecutionRecord<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: UnitId> ExecutionRecord<K> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Ledger {
                units: HashMap::new(),
                errors: Vec::new(),
                started_at: None,
                finished_at: None,
            }),
        }
    }

    pub(crate) fn begin_run(&self) {
        let mut ledger = self.lock();
        ledger.units.clear();
        ledger.errors.clear();
        ledger.started_at = Some(Instant::now());
        ledger.finished_at = None;
    }

    pub(crate) fn finish_run(&self) {
        self.lock().finished_at = Some(Instant::now());
    }

    pub(crate) fn unit_started(&self, unit: &K) {
        let mut ledger = self.lock();
        let entry = ledger.units.entry(unit.clone()).or_default();
        entry.started_at = Some(Instant::now());
    }

    /// Record a terminal state, plus the error if the unit did not succeed.
    pub(crate) fn unit_finished(&self, unit: &K, outcome: LifecycleState, error: Option<UnitError<K>>) {
        let mut ledger = self.lock();
        let entry = ledger.units.entry(unit.clone()).or_default();
        entry.finished_at = Some(Instant::now());
        entry.outcome = Some(outcome);

        if let Some(error) = error {
            ledger.errors.push(error);
        }
    }

    pub fn get<Q>(&self, unit: &Q) -> Option<UnitRecord>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().units.get(unit).copied()
    }

    pub fn units(&self) -> HashMap<K, UnitRecord> {
        self.lock().units.clone()
    }

    /// Every failed or interrupted unit, in the order it was recorded.
    pub fn errors(&self) -> Vec<UnitError<K>> {
        self.lock().errors.clone()
    }

    /// Wall-clock length of the run, once it has finished.
    pub fn elapsed(&self) -> Option<Duration> {
        let ledger = self.lock();
        Some(ledger.finished_at?.duration_since(ledger.started_at?))
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished_at.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger<K>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

