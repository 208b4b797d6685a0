// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::DependencyFailurePolicy;

/// Plan file exactly as deserialized, before validation.
///
/// ```toml
/// [config]
/// pool_size = 8
/// grace_period = "500ms"
/// timeout = "30s"
/// on_dependency_failure = "continue"
///
/// [unit.cache]
/// cmd = "./warm-cache.sh"
/// after = ["database"]
///
/// [unit.database]
/// cmd = "echo database"
/// ```
///
/// All sections are optional at this stage; [`PlanFile`] is the validated
/// form the rest of the crate consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    /// Coordinator settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All units from `[unit.<name>]`, keyed by unit name.
    #[serde(default)]
    pub unit: BTreeMap<String, UnitConfig>,
}

/// Validated plan. Construct with `PlanFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub config: ConfigSection,
    pub unit: BTreeMap<String, UnitConfig>,
}

impl PlanFile {
    /// Wrap already-validated parts. Only the validator calls this.
    pub(crate) fn new_unchecked(config: ConfigSection, unit: BTreeMap<String, UnitConfig>) -> Self {
        Self { config, unit }
    }

    /// Parse and validate a plan from TOML text.
    pub fn from_toml_str(contents: &str) -> crate::errors::Result<Self> {
        let raw: RawPlanFile = toml::from_str(contents)?;
        Self::try_from(raw)
    }

    pub fn units(&self) -> impl Iterator<Item = (&String, &UnitConfig)> {
        self.unit.iter()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of concurrently running actions. Defaults to twice the
    /// available parallelism.
    #[serde(default)]
    pub pool_size: Option<usize>,

    /// Duration string (e.g. `"500ms"`) in-flight actions get to observe
    /// cancellation after a timeout.
    #[serde(default)]
    pub grace_period: Option<String>,

    /// Duration string bounding the whole run; unbounded if absent.
    #[serde(default)]
    pub timeout: Option<String>,

    /// `"continue"` (default) or `"skip"`.
    #[serde(default)]
    pub on_dependency_failure: DependencyFailurePolicy,
}

/// `[unit.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    /// Shell command performing the warm-up.
    pub cmd: String,

    /// Units that must finish before this one starts.
    #[serde(default)]
    pub after: Vec<String>,
}
