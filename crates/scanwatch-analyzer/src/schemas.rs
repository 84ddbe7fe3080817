//! Schema workload classification
//!
//! Each schema seen in the statement groups is rated by how many full-scan
//! statements touch it and how much time they took.

use crate::gain::round2;
use crate::grouping::QueryGroup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;


/// Schemas below this much full-scan time are LOW
pub const LOW_SCHEMA_SECS: f64 = 1.0;
/// Schemas below this much full-scan time are at most REGULAR
pub const REGULAR_SCHEMA_SECS: f64 = 60.0;

/// Weight of the statement count in a schema's priority score
pub const SCHEMA_QUERY_WEIGHT: f64 = 0.7;
/// Weight of the total time (in seconds) in a schema's priority score
pub const SCHEMA_TIME_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaCategory {
    Low,
    Regular,
    Heavy,
}

impl SchemaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Regular => "REGULAR",
            Self::Heavy => "HEAVY",
        }
    }
}

impl std::fmt::Display for SchemaCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full-scan load attributed to one schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaWorkload {
    pub schema: String,
    pub category: SchemaCategory,
    /// Statements folded into groups that touch the schema
    pub total_queries: u64,
    /// Elapsed time of those groups in seconds, rounded to 2 decimals
    pub total_time_secs: f64,
    pub priority_score: f64,
}

/// Category for a schema's statement count and time.
///
/// Either too few statements or too little time keeps a schema LOW.
pub fn schema_category(
    total_queries: u64,
    total_time_secs: f64,
    low_queries: u64,
    regular_queries: u64,
) -> SchemaCategory {
    if total_queries < low_queries || total_time_secs < LOW_SCHEMA_SECS {
        SchemaCategory::Low
    } else if total_queries < regular_queries || total_time_secs < REGULAR_SCHEMA_SECS {
        SchemaCategory::Regular
    } else {
        SchemaCategory::Heavy
    }
}

/// Rate every schema of `groups`, highest priority first, ties by name.
///
/// A group counts once towards each distinct schema of its members.
pub fn classify_schemas(
    groups: &[QueryGroup],
    low_queries: u64,
    regular_queries: u64,
) -> Vec<SchemaWorkload> {
    let mut totals: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for group in groups {
        for schema in &group.schemas {
            let entry = totals.entry(schema.as_str()).or_default();
            entry.0 = entry.0.saturating_add(group.member_count() as u64);
            entry.1 = entry.1.saturating_add(group.total_elapsed_micros);
        }
    }

    let mut workloads: Vec<SchemaWorkload> = totals
        .into_iter()
        .map(|(schema, (queries, micros))| {
            let secs = micros as f64 / 1_000_000.0;
            SchemaWorkload {
                schema: schema.to_string(),
                category: schema_category(queries, secs, low_queries, regular_queries),
                total_queries: queries,
                total_time_secs: round2(secs),
                priority_score: round2(
                    queries as f64 * SCHEMA_QUERY_WEIGHT + secs * SCHEMA_TIME_WEIGHT,
                ),
            }
        })
        .collect();

    workloads.sort_by(|a, b| {
        b.priority_score
            .total_cmp(&a.priority_score)
            .then_with(|| a.schema.cmp(&b.schema))
    });
    tracing::debug!(schemas = workloads.len(), "schemas classified");
    workloads
}
