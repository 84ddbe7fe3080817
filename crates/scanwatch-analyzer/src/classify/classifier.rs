//! Size-tier classifier

use futures::StreamExt;
use scanwatch_core::{
    AdvisorConfig, Result, ScanwatchError, TableMetadataSource, validate_threshold,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Size tier of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Below the size threshold
    #[serde(rename = "T1")]
    Tier1,
    /// At or above the size threshold
    #[serde(rename = "T2")]
    Tier2,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tier1 => "T1",
            Self::Tier2 => "T2",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage facts for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Canonical upper-case name
    pub name: String,
    /// Segment size in megabytes, `None` if unknown
    pub size_mb: Option<f64>,
    /// Owning schema
    pub schema: Option<String>,
    pub existing_indexes: BTreeSet<String>,
}

impl TableInfo {
    pub fn new(name: impl AsRef<str>, size_mb: Option<f64>) -> Self {
        Self {
            name: name.as_ref().trim().to_uppercase(),
            size_mb,
            schema: None,
            existing_indexes: BTreeSet::new(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_indexes<I, S>(mut self, indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.existing_indexes = indexes.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_indexes(&self) -> bool {
        !self.existing_indexes.is_empty()
    }
}

/// Tables split by size tier, each tier ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub tier1: Vec<TableInfo>,
    pub tier2: Vec<TableInfo>,
    /// Tables left out because their metadata could not be retrieved
    pub excluded: Vec<String>,
}

impl ClassificationResult {
    /// True when no table was classified
    pub fn is_empty(&self) -> bool {
        self.tier1.is_empty() && self.tier2.is_empty()
    }

    /// Every classified table with its tier, tier 1 first
    pub fn all_tables(&self) -> impl Iterator<Item = (Tier, &TableInfo)> {
        self.tier1
            .iter()
            .map(|t| (Tier::Tier1, t))
            .chain(self.tier2.iter().map(|t| (Tier::Tier2, t)))
    }

    /// Look a table up by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<(Tier, &TableInfo)> {
        self.all_tables()
            .find(|(_, table)| table.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Trimmed, upper-cased table name; `None` for blank input
pub fn canonical_table_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_uppercase())
}

/// Bucket tables by size. Exactly `threshold_mb` belongs to tier 2.
///
/// Tables without a known size are excluded. The output is sorted by name.
pub fn partition_tables(
    tables: Vec<TableInfo>,
    threshold_mb: f64,
) -> Result<ClassificationResult> {
    validate_threshold(threshold_mb)?;

    let mut tables = tables;
    tables.sort_by(|a, b| a.name.cmp(&b.name));

    let mut result = ClassificationResult::default();
    for table in tables {
        match table.size_mb {
            Some(size) if size < threshold_mb => result.tier1.push(table),
            Some(_) => result.tier2.push(table),
            None => result.excluded.push(table.name),
        }
    }
    Ok(result)
}

/// Classifies tables by looking up their metadata
#[derive(Debug, Clone)]
pub struct TableClassifier {
    threshold_mb: f64,
    lookup_timeout: Duration,
    max_concurrency: usize,
}

impl Default for TableClassifier {
    fn default() -> Self {
        Self::new(&AdvisorConfig::default())
    }
}

impl TableClassifier {
    pub fn new(config: &AdvisorConfig) -> Self {
        Self {
            threshold_mb: config.analysis.size_threshold_mb,
            lookup_timeout: config.lookup.timeout(),
            max_concurrency: config.lookup.max_concurrency.max(1),
        }
    }

    /// Overrides the size threshold
    pub fn with_threshold_mb(mut self, threshold_mb: f64) -> Self {
        self.threshold_mb = threshold_mb;
        self
    }

    pub fn threshold_mb(&self) -> f64 {
        self.threshold_mb
    }

    /// Look up and classify every distinct, non-blank table name.
    ///
    /// Lookups run concurrently up to the configured bound, each under the
    /// lookup timeout. A failed, timed-out or empty lookup excludes the
    /// table. Cancellation discards everything gathered so far.
    pub async fn classify<I, S>(
        &self,
        source: &dyn TableMetadataSource,
        table_names: I,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_threshold(self.threshold_mb)?;

        let names: BTreeSet<String> = table_names
            .into_iter()
            .filter_map(|name| canonical_table_name(name.as_ref()))
            .collect();
        if names.is_empty() {
            return Ok(ClassificationResult::default());
        }
        if cancel.is_cancelled() {
            return Err(ScanwatchError::Cancelled);
        }

        tracing::debug!(
            tables = names.len(),
            concurrency = self.max_concurrency,
            "looking up table metadata"
        );

        let mut lookups = futures::stream::iter(
            names
                .into_iter()
                .map(|name| async move { (name.clone(), self.lookup(source, &name).await) }),
        )
        .buffer_unordered(self.max_concurrency);

        let mut found = Vec::new();
        let mut excluded = Vec::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("classification cancelled, discarding partial results");
                    return Err(ScanwatchError::Cancelled);
                }
                next = lookups.next() => next,
            };

            match next {
                Some((_, Ok(table))) => found.push(table),
                Some((name, Err(err))) if err.is_fatal_for_run() => {
                    tracing::warn!(table = %name, error = %err, "metadata source failed");
                    return Err(err);
                }
                Some((name, Err(err))) => {
                    tracing::warn!(table = %name, error = %err, "excluding table from classification");
                    excluded.push(name);
                }
                None => break,
            }
        }

        let mut result = partition_tables(found, self.threshold_mb)?;
        result.excluded.extend(excluded);
        result.excluded.sort();

        tracing::info!(
            tier1 = result.tier1.len(),
            tier2 = result.tier2.len(),
            excluded = result.excluded.len(),
            "tables classified"
        );
        Ok(result)
    }

    async fn lookup(&self, source: &dyn TableMetadataSource, name: &str) -> Result<TableInfo> {
        let size = self
            .bounded(name, "size", source.size_of(name))
            .await?
            .ok_or_else(|| ScanwatchError::lookup(name, "no segment found"))?;
        if !size.is_finite() || size < 0.0 {
            return Err(ScanwatchError::lookup(
                name,
                format!("invalid segment size {}", size),
            ));
        }

        let indexes = self
            .bounded(name, "indexes", source.indexes_of(name))
            .await?;

        let schema = match self.bounded(name, "schema", source.schema_of(name)).await {
            Ok(schema) => schema,
            Err(err) if err.is_fatal_for_run() => return Err(err),
            Err(err) => {
                tracing::debug!(table = %name, error = %err, "schema lookup failed");
                None
            }
        };

        tracing::debug!(table = %name, size_mb = size, indexes = indexes.len(), "table metadata");
        Ok(TableInfo {
            name: name.to_string(),
            size_mb: Some(size),
            schema,
            existing_indexes: indexes.into_iter().collect(),
        })
    }

    /// Run one lookup under the timeout, folding non-fatal errors into `LookupUnavailable`
    async fn bounded<T>(
        &self,
        table: &str,
        what: &str,
        lookup: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if err.is_fatal_for_run() => Err(err),
            Ok(Err(err @ ScanwatchError::LookupUnavailable { .. })) => Err(err),
            Ok(Err(err)) => Err(ScanwatchError::lookup(table, format!("{} lookup: {}", what, err))),
            Err(_) => Err(ScanwatchError::Timeout(format!(
                "{} lookup for {} exceeded {:?}",
                what, table, self.lookup_timeout
            ))),
        }
    }
}
