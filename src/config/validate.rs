// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::duration::parse_duration;
use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::{Result, WarmdagError};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = WarmdagError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.config, raw.unit))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_units(plan)?;
    validate_global_config(plan)?;
    validate_unit_dependencies(plan)?;
    validate_dag(plan)?;
    Ok(())
}

fn ensure_has_units(plan: &RawPlanFile) -> Result<()> {
    if plan.unit.is_empty() {
        return Err(WarmdagError::ConfigError(
            "plan must contain at least one [unit.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(plan: &RawPlanFile) -> Result<()> {
    if plan.config.pool_size == Some(0) {
        return Err(WarmdagError::ConfigError(
            "[config].pool_size must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(ref grace) = plan.config.grace_period {
        check_duration("grace_period", grace)?;
    }

    if let Some(ref timeout) = plan.config.timeout {
        check_duration("timeout", timeout)?;
    }

    Ok(())
}

fn check_duration(field: &str, value: &str) -> Result<()> {
    match parse_duration(value) {
        Ok(_) => Ok(()),
        Err(WarmdagError::ConfigError(msg)) => Err(WarmdagError::ConfigError(format!(
            "[config].{field}: {msg}"
        ))),
        Err(other) => Err(other),
    }
}

fn validate_unit_dependencies(plan: &RawPlanFile) -> Result<()> {
    for (name, unit) in plan.unit.iter() {
        for dep in unit.after.iter() {
            if !plan.unit.contains_key(dep) {
                return Err(WarmdagError::ConfigError(format!(
                    "unit '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(WarmdagError::ConfigError(format!(
                    "unit '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(plan: &RawPlanFile) -> Result<()> {
    // Edge direction: dependency -> unit.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in plan.unit.keys() {
        graph.add_node(name.as_str());
    }

    for (name, unit) in plan.unit.iter() {
        for dep in unit.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(WarmdagError::DagCycle(format!(
            "cycle detected in plan involving unit '{}'",
            cycle.node_id()
        ))),
    }
}
