// src/engine/options.rs

use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::duration::parse_duration;
use crate::config::model::ConfigSection;
use crate::errors::Result;
use crate::types::DependencyFailurePolicy;

/// Grace period granted to in-flight actions after a timeout, unless
/// configured otherwise.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Tuning knobs for a [`WarmupCoordinator`](super::WarmupCoordinator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Maximum number of actions running at the same time.
    pub pool_size: usize,
    /// How long to wait for in-flight work to observe cancellation before
    /// it is dropped.
    pub grace_period: Duration,
    pub dependency_failure_policy: DependencyFailurePolicy,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            grace_period: DEFAULT_GRACE_PERIOD,
            dependency_failure_policy: DependencyFailurePolicy::default(),
        }
    }
}

impl CoordinatorOptions {
    /// Build options from a validated plan `[config]` section.
    pub fn from_config(section: &ConfigSection) -> Result<Self> {
        let mut options = Self::default()
            .with_dependency_failure_policy(section.on_dependency_failure);

        if let Some(pool_size) = section.pool_size {
            options = options.with_pool_size(pool_size);
        }
        if let Some(ref grace) = section.grace_period {
            options = options.with_grace_period(parse_duration(grace)?);
        }

        Ok(options)
    }

    /// Set the pool size, clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_dependency_failure_policy(mut self, policy: DependencyFailurePolicy) -> Self {
        self.dependency_failure_policy = policy;
        self
    }
}

/// Twice the available hardware parallelism (4 if it cannot be queried).
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(4)
}
