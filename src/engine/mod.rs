// src/engine/mod.rs

//! Warm-up engine.
//!
//! This module ties together:
//! - the per-unit lifecycle state machine and its tracker
//! - the run-scoped execution record
//! - the recursive fan-out/fan-in warm-up task
//! - the coordinator facade that owns the worker pool, the timeout and the
//!   cancellation protocol
//!
//! The coordinator is the entry point; everything else is reachable from it.

pub mod action;
pub mod coordinator;
pub mod lifecycle;
pub mod options;
pub mod record;
pub mod state_tracker;
mod task;

pub use action::{Action, ActionFuture};
pub use coordinator::WarmupCoordinator;
pub use lifecycle::LifecycleState;
pub use options::{CoordinatorOptions, DEFAULT_GRACE_PERIOD, default_pool_size};
pub use record::{ExecutionRecord, UnitRecord};
pub use state_tracker::{StateListener, StateTracker, TracingListener};
pub use crate::types::DependencyFailurePolicy;

/// Canonical unit name type used by plan files and the CLI.
pub type UnitName = String;
