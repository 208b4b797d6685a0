#![allow(dead_code)]

use std::collections::BTreeMap;
use warmdag::config::{ConfigSection, PlanFile, RawPlanFile, UnitConfig};
use warmdag::errors::Result;
use warmdag::types::DependencyFailurePolicy;

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanFileBuilder {
    plan: RawPlanFile,
}

impl PlanFileBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                config: ConfigSection::default(),
                unit: BTreeMap::new(),
            },
        }
    }

    pub fn with_unit(mut self, name: &str, unit: UnitConfig) -> Self {
        self.plan.unit.insert(name.to_string(), unit);
        self
    }

    pub fn pool_size(mut self, n: usize) -> Self {
        self.plan.config.pool_size = Some(n);
        self
    }

    pub fn grace_period(mut self, duration: &str) -> Self {
        self.plan.config.grace_period = Some(duration.to_string());
        self
    }

    pub fn timeout(mut self, duration: &str) -> Self {
        self.plan.config.timeout = Some(duration.to_string());
        self
    }

    pub fn on_dependency_failure(mut self, policy: DependencyFailurePolicy) -> Self {
        self.plan.config.on_dependency_failure = policy;
        self
    }

    /// Validate, returning the error instead of panicking.
    pub fn try_build(self) -> Result<PlanFile> {
        PlanFile::try_from(self.plan)
    }

    pub fn build(self) -> PlanFile {
        self.try_build()
            .expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `UnitConfig`.
pub struct UnitConfigBuilder {
    unit: UnitConfig,
}

impl UnitConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            unit: UnitConfig {
                cmd: cmd.to_string(),
                after: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.unit.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> UnitConfig {
        self.unit
    }
}
