// src/config/duration.rs

use std::time::Duration;

use crate::errors::{Result, WarmdagError};

/// Parse durations like `"250ms"`, `"5s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(WarmdagError::ConfigError("empty duration string".to_string()));
    }

    // Find the boundary between digits and suffix.
    let idx = s.chars().position(|c| !c.is_ascii_digit()).ok_or_else(|| {
        WarmdagError::ConfigError(format!("duration '{s}' is missing a unit suffix"))
    })?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part.parse().map_err(|e| {
        WarmdagError::ConfigError(format!("invalid duration number '{num_part}': {e}"))
    })?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        other => {
            return Err(WarmdagError::ConfigError(format!(
                "unsupported duration unit '{other}'; expected ms, s, m, or h"
            )));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| WarmdagError::ConfigError(format!("duration '{s}' is too large")))
}
