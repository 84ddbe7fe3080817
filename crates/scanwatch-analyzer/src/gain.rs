//! Remediation gain estimate
//!
//! The expected time reduction depends only on the size band of the table:
//! small tables benefit most from an index, large ones need deeper work.

use scanwatch_core::{Result, ScanwatchError};
use serde::{Deserialize, Serialize};


/// Upper bound (exclusive) of the small-table band, in megabytes
pub const SMALL_TABLE_MB: f64 = 10.0;
/// Upper bound (exclusive) of the medium-table band, in megabytes
pub const MEDIUM_TABLE_MB: f64 = 50.0;

/// Estimated effect of remediating one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainEstimate {
    /// Expected reduction, 0 to 100
    pub percent: f64,
    pub old_time_micros: f64,
    pub new_time_micros: f64,
    /// Statement or group the estimate was computed for
    pub source_query_id: Option<String>,
}

/// Fraction of the elapsed time a remediation is expected to save
pub fn gain_factor(table_size_mb: f64) -> f64 {
    if table_size_mb < SMALL_TABLE_MB {
        0.6
    } else if table_size_mb < MEDIUM_TABLE_MB {
        0.4
    } else {
        0.2
    }
}

/// Estimate the gain for a statement of `elapsed_micros` against a table of
/// `table_size_mb`. Elapsed time is clamped to at least 1.
pub fn estimate_gain(
    elapsed_micros: f64,
    table_size_mb: f64,
    source_query_id: Option<String>,
) -> Result<GainEstimate> {
    if table_size_mb.is_nan() || table_size_mb < 0.0 {
        return Err(ScanwatchError::InvalidArgument(format!(
            "table size must be a non-negative number of megabytes, got {}",
            table_size_mb
        )));
    }
    if elapsed_micros.is_nan() {
        return Err(ScanwatchError::InvalidArgument(
            "elapsed time must be a number".to_string(),
        ));
    }

    let old_time = elapsed_micros.max(1.0);
    let factor = gain_factor(table_size_mb);

    Ok(GainEstimate {
        percent: round2(factor * 100.0),
        old_time_micros: old_time,
        new_time_micros: round2(old_time * (1.0 - factor)),
        source_query_id,
    })
}

/// Round half away from zero to two decimals
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
