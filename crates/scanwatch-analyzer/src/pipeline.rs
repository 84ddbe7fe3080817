//! End-to-end advisor run
//!
//! One run reads a snapshot of candidate statements, processes it fully and
//! returns a report. Nothing is kept between runs.

use crate::classify::{ClassificationResult, TableClassifier};
use crate::extract::{ApproximateExtractor, ExtractionDiagnostic, FeatureExtractor, ParsedQuery};
use crate::grouping::{QueryGroup, QueryGrouper};
use crate::planner::{RemediationPlanner, Suggestion};
use crate::schemas::{SchemaWorkload, classify_schemas};
use scanwatch_core::{
    AdvisorConfig, QuerySource, RawQueryRecord, Result, ScanwatchError, TableMetadataSource,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;


/// A statement whose text could not be analyzed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub query_id: String,
    pub diagnostic: ExtractionDiagnostic,
}

/// Everything one run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvisorReport {
    /// Query groups, highest priority first
    pub groups: Vec<QueryGroup>,
    pub classification: ClassificationResult,
    /// Suggestions, highest priority first
    pub suggestions: Vec<Suggestion>,
    /// Schema workloads, highest priority first
    #[serde(default)]
    pub schemas: Vec<SchemaWorkload>,
    pub parse_failures: Vec<ParseFailure>,
}

impl AdvisorReport {
    /// True when the run found nothing to act on
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.suggestions.is_empty()
    }

    /// The `n` highest-priority groups
    pub fn top_groups(&self, n: usize) -> &[QueryGroup] {
        &self.groups[..n.min(self.groups.len())]
    }

    /// Total number of statements folded into groups
    pub fn query_count(&self) -> usize {
        self.groups.iter().map(QueryGroup::member_count).sum()
    }
}

/// Runs extraction, grouping, classification and planning in order
#[derive(Clone)]
pub struct AdvisorPipeline {
    config: AdvisorConfig,
    extractor: Arc<dyn FeatureExtractor>,
    planner: RemediationPlanner,
}

impl std::fmt::Debug for AdvisorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisorPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for AdvisorPipeline {
    fn default() -> Self {
        Self::new(AdvisorConfig::default())
    }
}

impl AdvisorPipeline {
    pub fn new(config: AdvisorConfig) -> Self {
        Self {
            config,
            extractor: Arc::new(ApproximateExtractor::new()),
            planner: RemediationPlanner::new(),
        }
    }

    /// Replace the statement analysis strategy
    pub fn with_extractor(mut self, extractor: Arc<dyn FeatureExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Fetch candidate statements from `queries` and run the whole pipeline.
    ///
    /// A source that cannot be read fails the run with `DependencyUnavailable`.
    #[tracing::instrument(skip_all)]
    pub async fn run(
        &self,
        queries: &dyn QuerySource,
        metadata: &dyn TableMetadataSource,
        cancel: &CancellationToken,
    ) -> Result<AdvisorReport> {
        self.config.validate()?;
        checkpoint(cancel, "fetch")?;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanwatchError::Cancelled),
            fetched = tokio::time::timeout(
                self.config.lookup.timeout(),
                queries.fetch_candidate_queries(),
            ) => fetched,
        };
        let records = match fetched {
            Ok(Ok(records)) => records,
            Ok(Err(err @ (ScanwatchError::DependencyUnavailable(_) | ScanwatchError::Cancelled))) => {
                return Err(err);
            }
            Ok(Err(err)) => {
                return Err(ScanwatchError::DependencyUnavailable(format!(
                    "query source failed: {}",
                    err
                )));
            }
            Err(_) => {
                return Err(ScanwatchError::DependencyUnavailable(format!(
                    "query source did not answer within {:?}",
                    self.config.lookup.timeout()
                )));
            }
        };
        tracing::info!(queries = records.len(), "fetched candidate statements");

        self.run_records(records, metadata, cancel).await
    }

    /// Run the pipeline on already-fetched records
    pub async fn run_records(
        &self,
        records: Vec<RawQueryRecord>,
        metadata: &dyn TableMetadataSource,
        cancel: &CancellationToken,
    ) -> Result<AdvisorReport> {
        self.config.validate()?;
        for record in &records {
            record.validate()?;
        }

        checkpoint(cancel, "extract")?;
        let mut parse_failures = Vec::new();
        let mut parsed: Vec<ParsedQuery> = Vec::with_capacity(records.len());
        for record in records {
            let features = self.extractor.extract(&record.text);
            if let Some(diagnostic) = &features.diagnostic {
                tracing::debug!(query_id = %record.id, message = %diagnostic.message, "statement not analyzable");
                parse_failures.push(ParseFailure {
                    query_id: record.id.clone(),
                    diagnostic: diagnostic.clone(),
                });
            }
            parsed.push(ParsedQuery::new(record, features));
        }

        let has_tables = parsed.iter().any(|query| !query.tables.is_empty());
        if has_tables {
            checkpoint(cancel, "availability")?;
            if let Err(err) = metadata.check_available().await {
                tracing::warn!(error = %err, "metadata source unavailable");
                return Err(match err {
                    ScanwatchError::DependencyUnavailable(_) | ScanwatchError::Cancelled => err,
                    other => ScanwatchError::DependencyUnavailable(other.to_string()),
                });
            }

            checkpoint(cancel, "schema")?;
            let mut schema_cache = HashMap::new();
            parsed = self
                .canonicalize_tables(parsed, metadata, &mut schema_cache, cancel)
                .await?;
            parsed = self
                .resolve_schemas(parsed, metadata, &mut schema_cache, cancel)
                .await?;
        }

        checkpoint(cancel, "group")?;
        let mut grouper = QueryGrouper::new();
        for query in parsed {
            grouper.add(query);
        }
        let groups = grouper.finish();
        tracing::info!(
            groups = groups.len(),
            parse_failures = parse_failures.len(),
            "statements grouped"
        );
        let schemas = classify_schemas(
            &groups,
            self.config.analysis.schema_low_queries,
            self.config.analysis.schema_regular_queries,
        );

        checkpoint(cancel, "classify")?;
        let tables: BTreeSet<&str> = groups
            .iter()
            .flat_map(|group| group.tables.iter().map(String::as_str))
            .collect();
        let classification = TableClassifier::new(&self.config)
            .classify(metadata, tables, cancel)
            .await?;

        checkpoint(cancel, "plan")?;
        let suggestions = self.planner.plan(&classification, &groups)?;

        Ok(AdvisorReport {
            groups,
            classification,
            suggestions,
            schemas,
            parse_failures,
        })
    }

    /// Fold `TABLE` into `OWNER.TABLE` when both spellings occur in the run
    /// and the catalog places `TABLE` in `OWNER`.
    ///
    /// Only names with exactly one qualified spelling are looked up.
    async fn canonicalize_tables(
        &self,
        parsed: Vec<ParsedQuery>,
        metadata: &dyn TableMetadataSource,
        cache: &mut HashMap<String, Option<String>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ParsedQuery>> {
        let mut owners: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut bare: BTreeSet<String> = BTreeSet::new();
        for table in parsed.iter().flat_map(|query| query.tables.iter()) {
            match table.rsplit_once('.') {
                Some((owner, name)) if !owner.is_empty() => {
                    owners
                        .entry(name.to_string())
                        .or_default()
                        .insert(owner.to_string());
                }
                _ => {
                    bare.insert(table.clone());
                }
            }
        }

        let mut renames: HashMap<String, String> = HashMap::new();
        for table in bare {
            let Some(owner) = owners
                .get(&table)
                .filter(|candidates| candidates.len() == 1)
                .and_then(|candidates| candidates.first())
            else {
                continue;
            };
            let schema = match cache.get(&table) {
                Some(cached) => cached.clone(),
                None => {
                    checkpoint(cancel, "canonicalize")?;
                    let schema = self.lookup_schema(metadata, &table).await?;
                    cache.insert(table.clone(), schema.clone());
                    schema
                }
            };
            if schema.is_some_and(|schema| schema.eq_ignore_ascii_case(owner)) {
                renames.insert(table.clone(), format!("{}.{}", owner, table));
            }
        }

        if renames.is_empty() {
            return Ok(parsed);
        }
        tracing::debug!(renamed = renames.len(), "unqualified table names folded");

        let rename = |table: &String| renames.get(table).cloned().unwrap_or_else(|| table.clone());
        Ok(parsed
            .into_iter()
            .map(|mut query| {
                let mut seen = HashSet::new();
                query.tables = query
                    .tables
                    .iter()
                    .map(rename)
                    .filter(|table| seen.insert(table.clone()))
                    .collect();
                for target in query.aliases.values_mut() {
                    *target = rename(target);
                }
                query
            })
            .collect())
    }

    /// Attach the owning schema of each statement's primary table.
    ///
    /// A qualified name carries its own schema; otherwise the metadata
    /// source is asked once per table.
    async fn resolve_schemas(
        &self,
        parsed: Vec<ParsedQuery>,
        metadata: &dyn TableMetadataSource,
        cache: &mut HashMap<String, Option<String>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ParsedQuery>> {
        let mut resolved = Vec::with_capacity(parsed.len());

        for query in parsed {
            let schema = match query.primary_table() {
                None => None,
                Some(table) => match schema_qualifier(table) {
                    Some(owner) => Some(owner),
                    None => match cache.get(table) {
                        Some(cached) => cached.clone(),
                        None => {
                            checkpoint(cancel, "schema")?;
                            let schema = self.lookup_schema(metadata, table).await?;
                            cache.insert(table.to_string(), schema.clone());
                            schema
                        }
                    },
                },
            };
            resolved.push(query.with_schema(schema));
        }

        tracing::debug!(lookups = cache.len(), "schemas resolved");
        Ok(resolved)
    }

    async fn lookup_schema(
        &self,
        metadata: &dyn TableMetadataSource,
        table: &str,
    ) -> Result<Option<String>> {
        match tokio::time::timeout(self.config.lookup.timeout(), metadata.schema_of(table)).await {
            Ok(Ok(schema)) => Ok(schema),
            Ok(Err(err)) if err.is_fatal_for_run() => Err(err),
            Ok(Err(err)) => {
                tracing::debug!(table = %table, error = %err, "schema lookup failed");
                Ok(None)
            }
            Err(_) => {
                tracing::debug!(table = %table, "schema lookup timed out");
                Ok(None)
            }
        }
    }
}

/// The owner part of an `OWNER.TABLE` name
fn schema_qualifier(table: &str) -> Option<String> {
    table
        .rsplit_once('.')
        .map(|(owner, _)| owner.to_string())
        .filter(|owner| !owner.is_empty())
}

fn checkpoint(cancel: &CancellationToken, stage: &str) -> Result<()> {
    if cancel.is_cancelled() {
        tracing::info!(stage, "run cancelled");
        return Err(ScanwatchError::Cancelled);
    }
    Ok(())
}
