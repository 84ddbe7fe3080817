//! Two-phase query grouping
//!
//! `QueryGrouper` accumulates parsed statements; `finish` computes the
//! derived statistics and hands out read-only `QueryGroup`s.

use super::signature::{QuerySignature, signature_of};
use crate::extract::{ParsedQuery, column_reference};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Weight of the execution count in a group's priority score
pub const EXECUTION_WEIGHT: f64 = 0.6;
/// Weight of the total elapsed time (in milliseconds) in a group's priority score
pub const ELAPSED_WEIGHT: f64 = 0.4;

/// Statements sharing one signature, with aggregated statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryGroup {
    pub signature: QuerySignature,
    /// Text of the first member
    pub sample_text: String,
    /// Ids of every member, in fold order
    pub member_ids: Vec<String>,
    pub tables: Vec<String>,
    pub schemas: BTreeSet<String>,
    pub predicates: Vec<String>,
    /// Table aliases used by the members, alias to table name
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Sum of the members' execution counts
    pub execution_count: u64,
    /// Sum of the members' elapsed time
    pub total_elapsed_micros: u64,
    pub average_elapsed_micros: f64,
    pub priority_score: f64,
}

impl QueryGroup {
    /// Returns true if the group references `table` (case-insensitive)
    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }

    /// Number of statements folded into the group
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }

    /// Average elapsed time per execution in milliseconds
    pub fn average_elapsed_ms(&self) -> f64 {
        self.average_elapsed_micros / 1000.0
    }

    /// Leading column of the first predicate that belongs to `table`.
    ///
    /// A qualified column belongs to the table its alias or table name
    /// resolves to. An unqualified column is only attributed when the group
    /// reads a single table.
    pub fn predicate_column_for(&self, table: &str) -> Option<String> {
        if !self.contains_table(table) {
            return None;
        }
        self.predicates
            .iter()
            .filter_map(|predicate| column_reference(predicate))
            .find_map(|column| {
                let belongs = match &column.qualifier {
                    Some(qualifier) => self.qualifier_names(qualifier, table),
                    None => self.tables.len() == 1,
                };
                belongs.then_some(column.name)
            })
    }

    fn qualifier_names(&self, qualifier: &str, table: &str) -> bool {
        let resolved = self
            .aliases
            .get(qualifier)
            .map(String::as_str)
            .unwrap_or(qualifier);
        let unqualified = table.rsplit('.').next().unwrap_or(table);
        resolved.eq_ignore_ascii_case(table) || resolved.eq_ignore_ascii_case(unqualified)
    }
}

/// Priority of a group: execution count and total time in milliseconds, weighted
pub fn group_priority(execution_count: u64, total_elapsed_micros: u64) -> f64 {
    execution_count as f64 * EXECUTION_WEIGHT
        + (total_elapsed_micros as f64 / 1000.0) * ELAPSED_WEIGHT
}

#[derive(Debug)]
struct GroupAccumulator {
    signature: QuerySignature,
    sample_text: String,
    member_ids: Vec<String>,
    tables: Vec<String>,
    schemas: BTreeSet<String>,
    predicates: Vec<String>,
    aliases: BTreeMap<String, String>,
    execution_count: u64,
    total_elapsed_micros: u64,
}

impl GroupAccumulator {
    fn seed(signature: QuerySignature, query: &ParsedQuery) -> Self {
        Self {
            signature,
            sample_text: query.record.text.clone(),
            member_ids: Vec::new(),
            tables: query.tables.clone(),
            schemas: BTreeSet::new(),
            predicates: query.predicates.clone(),
            aliases: BTreeMap::new(),
            execution_count: 0,
            total_elapsed_micros: 0,
        }
    }

    fn fold(&mut self, query: ParsedQuery) {
        self.execution_count = self
            .execution_count
            .saturating_add(query.record.execution_count);
        self.total_elapsed_micros = self
            .total_elapsed_micros
            .saturating_add(query.record.total_elapsed_micros);
        if let Some(schema) = query.schema {
            self.schemas.insert(schema);
        }
        for (alias, table) in query.aliases {
            self.aliases.entry(alias).or_insert(table);
        }
        self.member_ids.push(query.record.id);
    }

    fn finalize(self) -> QueryGroup {
        let average_elapsed_micros = if self.execution_count == 0 {
            0.0
        } else {
            self.total_elapsed_micros as f64 / self.execution_count as f64
        };

        QueryGroup {
            priority_score: group_priority(self.execution_count, self.total_elapsed_micros),
            signature: self.signature,
            sample_text: self.sample_text,
            member_ids: self.member_ids,
            tables: self.tables,
            schemas: self.schemas,
            predicates: self.predicates,
            aliases: self.aliases,
            execution_count: self.execution_count,
            total_elapsed_micros: self.total_elapsed_micros,
            average_elapsed_micros,
        }
    }
}

/// Accumulates parsed statements into groups
#[derive(Debug, Default)]
pub struct QueryGrouper {
    groups: HashMap<QuerySignature, GroupAccumulator>,
}

impl QueryGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one statement into its group, creating the group on first sight
    pub fn add(&mut self, query: ParsedQuery) {
        let signature = signature_of(&query.tables, &query.predicates);
        self.groups
            .entry(signature.clone())
            .or_insert_with(|| GroupAccumulator::seed(signature, &query))
            .fold(query);
    }

    /// Number of distinct signatures seen so far
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Finalize every group; highest priority first, ties by signature
    pub fn finish(self) -> Vec<QueryGroup> {
        let mut groups: Vec<QueryGroup> = self
            .groups
            .into_values()
            .map(GroupAccumulator::finalize)
            .collect();
        groups.sort_by(|a, b| {
            b.priority_score
                .total_cmp(&a.priority_score)
                .then_with(|| a.signature.cmp(&b.signature))
        });
        tracing::debug!(groups = groups.len(), "query groups finalized");
        groups
    }
}

/// Group a batch of parsed statements
pub fn group_queries(queries: impl IntoIterator<Item = ParsedQuery>) -> Vec<QueryGroup> {
    let mut grouper = QueryGrouper::new();
    for query in queries {
        grouper.add(query);
    }
    grouper.finish()
}
