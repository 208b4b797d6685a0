// src/engine/lifecycle.rs

//! Per-unit lifecycle states.

use std::fmt;

/// Lifecycle state of a unit within a run.
///
/// ```text
/// Pending -> Warming -> Active
///                    -> Failed
///                    -> Interrupted
/// Pending -> Interrupted
/// ```
///
/// `Active`, `Failed` and `Interrupted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Registered, action not started yet.
    Pending,
    /// Action is running.
    Warming,
    /// Action finished successfully.
    Active,
    /// Action returned an error, panicked, or was skipped by policy.
    Failed,
    /// The run was cancelled before the unit finished.
    Interrupted,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LifecycleState::Active | LifecycleState::Failed | LifecycleState::Interrupted
        )
    }

    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Pending, Warming)
                | (Pending, Interrupted)
                | (Warming, Active)
                | (Warming, Failed)
                | (Warming, Interrupted)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Warming => "warming",
            LifecycleState::Active => "active",
            LifecycleState::Failed => "failed",
            LifecycleState::Interrupted => "interrupted",
        };
        f.pad(s)
    }
}
