// src/errors.rs

//! Crate-wide error type, per-unit failure reports and result alias.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WarmdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in dependency graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("warm-up coordinator was already started; build a new one for another run")]
    AlreadyStarted,

    #[error("warm-up did not complete within {0:?}")]
    TimedOut(Duration),

    #[error("warm-up was interrupted before it completed")]
    Interrupted,

    #[error("{0}")]
    WarmupFailed(WarmupReport),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WarmdagError>;

/// Why a single unit did not reach `Active`.
#[derive(Debug, Clone)]
pub enum UnitErrorKind {
    /// The unit's action returned an error.
    Action(Arc<anyhow::Error>),
    /// The unit's action panicked; the payload message is kept.
    Panicked(String),
    /// The action was skipped because a dependency did not become active.
    DependencyFailed { dependency: String },
    /// The run was cancelled (timeout or external) before the unit finished.
    Interrupted,
}

impl fmt::Display for UnitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitErrorKind::Action(err) => write!(f, "action failed: {err:#}"),
            UnitErrorKind::Panicked(msg) => write!(f, "action panicked: {msg}"),
            UnitErrorKind::DependencyFailed { dependency } => {
                write!(f, "skipped because dependency '{dependency}' did not warm up")
            }
            UnitErrorKind::Interrupted => write!(f, "interrupted before completion"),
        }
    }
}

/// One entry of the error report: which unit, and why.
#[derive(Debug, Clone)]
pub struct UnitError<K> {
    pub unit: K,
    pub kind: UnitErrorKind,
}

impl<K> UnitError<K> {
    pub fn new(unit: K, kind: UnitErrorKind) -> Self {
        Self { unit, kind }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.kind, UnitErrorKind::Interrupted)
    }
}

impl<K: fmt::Display> UnitError<K> {
    /// Same entry with the unit identity rendered to a string.
    pub fn rendered(&self) -> UnitError<String> {
        UnitError {
            unit: self.unit.to_string(),
            kind: self.kind.clone(),
        }
    }
}

impl<K: fmt::Display> fmt::Display for UnitError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.kind)
    }
}

/// Aggregate of every unit that failed or was interrupted during a run.
///
/// Entries are kept in the order the failures were observed.
#[derive(Debug, Clone, Default)]
pub struct WarmupReport {
    pub failures: Vec<UnitError<String>>,
}

impl WarmupReport {
    pub fn from_errors<K: fmt::Display>(errors: &[UnitError<K>]) -> Self {
        Self {
            failures: errors.iter().map(UnitError::rendered).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.unit.as_str())
    }
}

impl fmt::Display for WarmupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unit(s) failed to warm up", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}
