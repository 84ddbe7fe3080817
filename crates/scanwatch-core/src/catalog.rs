//! Collaborator interfaces consumed by the analysis pipeline
//!
//! The pipeline never talks to a database directly. It reads candidate
//! queries from a [`QuerySource`] and per-table storage facts from a
//! [`TableMetadataSource`]; adapters in `scanwatch-monitor` implement both.

use crate::{Result, ScanwatchError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Substring markers that flag a cached statement as a full-table-scan candidate
pub const FULL_SCAN_MARKERS: [&str; 2] = ["TABLE ACCESS FULL", "/*+ FULL("];

/// Returns true if the statement text carries one of the [`FULL_SCAN_MARKERS`].
///
/// Matching is case-sensitive, the same as the `LIKE` filter the Oracle
/// adapter runs against `v$sql`.
pub fn matches_full_scan_heuristic(text: &str) -> bool {
    FULL_SCAN_MARKERS.iter().any(|marker| text.contains(marker))
}

/// A statement read from the shared SQL cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQueryRecord {
    /// Opaque statement identifier (`sql_id`)
    pub id: String,
    /// Statement text
    pub text: String,
    /// Number of executions recorded by the cache
    pub execution_count: u64,
    /// Cumulative elapsed time in microseconds
    pub total_elapsed_micros: u64,
}

impl RawQueryRecord {
    /// Create a new record
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        execution_count: u64,
        total_elapsed_micros: u64,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            execution_count,
            total_elapsed_micros,
        }
    }

    /// Checks the record at the pipeline boundary
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ScanwatchError::InvalidArgument(
                "query record has an empty id".to_string(),
            ));
        }
        Ok(())
    }
}

/// Source of full-table-scan candidate statements
#[async_trait]
pub trait QuerySource: Send + Sync {
    /// Fetch candidate statements ordered by elapsed time, slowest first
    async fn fetch_candidate_queries(&self) -> Result<Vec<RawQueryRecord>>;
}

/// Source of per-table storage facts
///
/// Every lookup takes the canonical (trimmed, upper-case) table name.
/// `Ok(None)` means the table is unknown to the catalog; `Err` means the
/// lookup itself failed.
#[async_trait]
pub trait TableMetadataSource: Send + Sync {
    /// Size of the table segment in megabytes
    async fn size_of(&self, table: &str) -> Result<Option<f64>>;

    /// Owner (schema) of the table
    async fn schema_of(&self, table: &str) -> Result<Option<String>>;

    /// Names of the indexes already defined on the table
    async fn indexes_of(&self, table: &str) -> Result<Vec<String>>;

    /// Probe the collaborator once before a batch of lookups
    async fn check_available(&self) -> Result<()> {
        Ok(())
    }
}
