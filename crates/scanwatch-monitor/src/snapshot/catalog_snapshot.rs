//! In-memory catalog snapshot
//!
//! A `CatalogSnapshot` holds what `OracleCatalog` would read from a live
//! database. It answers the same questions without a connection, which
//! makes runs reproducible and lets the advisor work offline.

use crate::oracle::split_qualified;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scanwatch_core::{
    QuerySource, RawQueryRecord, Result, ScanwatchError, TableMetadataSource,
    matches_full_scan_heuristic,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage facts for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    /// Segment size in megabytes, absent when the table has no segment
    #[serde(default)]
    pub size_mb: Option<f64>,
    #[serde(default)]
    pub indexes: Vec<String>,
}

impl TableSnapshot {
    pub fn new(name: impl Into<String>, size_mb: f64) -> Self {
        Self {
            name: name.into(),
            owner: None,
            size_mb: Some(size_mb),
            indexes: Vec::new(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_indexes<I, S>(mut self, indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes = indexes.into_iter().map(Into::into).collect();
        self
    }

    /// Match an unqualified or `OWNER.TABLE` name, ignoring case
    fn matches(&self, name: &str) -> bool {
        let (owner, table) = split_qualified(name);
        if !self.name.eq_ignore_ascii_case(table) {
            return false;
        }
        match (owner, &self.owner) {
            (None, _) => true,
            (Some(wanted), Some(owner)) => owner.eq_ignore_ascii_case(wanted),
            (Some(_), None) => false,
        }
    }
}

/// Captured shared-cache statements and table metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub queries: Vec<RawQueryRecord>,
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, record: RawQueryRecord) -> Self {
        self.queries.push(record);
        self
    }

    pub fn with_table(mut self, table: TableSnapshot) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot written by `save` or by hand
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScanwatchError::NotFound(format!("snapshot {}: {}", path.display(), e))
        })?;
        let snapshot = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            queries = snapshot.queries.len(),
            tables = snapshot.tables.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Statements the shared-cache query would select, slowest first
    pub fn candidate_queries(&self) -> Vec<RawQueryRecord> {
        let mut candidates: Vec<RawQueryRecord> = self
            .queries
            .iter()
            .filter(|record| matches_full_scan_heuristic(&record.text))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.total_elapsed_micros.cmp(&a.total_elapsed_micros));
        candidates
    }

    /// Find a table by unqualified or `OWNER.TABLE` name, ignoring case
    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.iter().find(|table| table.matches(name.trim()))
    }
}

#[async_trait]
impl QuerySource for CatalogSnapshot {
    async fn fetch_candidate_queries(&self) -> Result<Vec<RawQueryRecord>> {
        Ok(self.candidate_queries())
    }
}

#[async_trait]
impl TableMetadataSource for CatalogSnapshot {
    async fn size_of(&self, table: &str) -> Result<Option<f64>> {
        Ok(self.table(table).and_then(|t| t.size_mb))
    }

    async fn schema_of(&self, table: &str) -> Result<Option<String>> {
        Ok(self.table(table).and_then(|t| t.owner.clone()))
    }

    async fn indexes_of(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .table(table)
            .map(|t| t.indexes.clone())
            .unwrap_or_default())
    }
}
