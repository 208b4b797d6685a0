use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::Deserialize;

/// Identity of a warm-up unit.
///
/// Any cloneable, hashable, printable value works; plan files use `String`.
pub trait UnitId: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> UnitId for T where T: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

/// What a unit does when one of its dependencies did not become `Active`.
///
/// - `Continue`: run the unit's action anyway; its state only reflects its
///   own action (default behaviour).
/// - `Skip`: do not run the action and mark the unit `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyFailurePolicy {
    Continue,
    Skip,
}

impl Default for DependencyFailurePolicy {
    fn default() -> Self {
        DependencyFailurePolicy::Continue
    }
}

impl FromStr for DependencyFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(DependencyFailurePolicy::Continue),
            "skip" => Ok(DependencyFailurePolicy::Skip),
            other => Err(format!(
                "invalid on_dependency_failure: {other} (expected \"continue\" or \"skip\")"
            )),
        }
    }
}
