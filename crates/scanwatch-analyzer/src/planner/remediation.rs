use crate::classify::{ClassificationResult, TableInfo, Tier};
use crate::gain::{estimate_gain, round2};
use crate::grouping::QueryGroup;
use scanwatch_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Priority of a small table without indexes
pub const UNINDEXED_SMALL_TABLE_PRIORITY: f64 = 8.0;
/// Priority of a small table that already has indexes
pub const INDEXED_SMALL_TABLE_PRIORITY: f64 = 2.0;
/// Gain (percent) above which a large table is critical
pub const CRITICAL_GAIN_PERCENT: f64 = 20.0;

/// What to do about a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemediationAction {
    CreateIndex,
    IndexExists,
    RefactorOrPartition,
    ConsiderIndex,
}

impl RemediationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateIndex => "CREATE_INDEX",
            Self::IndexExists => "INDEX_EXISTS",
            Self::RefactorOrPartition => "REFACTOR_OR_PARTITION",
            Self::ConsiderIndex => "CONSIDER_INDEX",
        }
    }
}

impl std::fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    Low,
    Medium,
    High,
    Critical,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One actionable recommendation for a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub table_name: String,
    pub tier: Tier,
    pub action: RemediationAction,
    pub priority_score: f64,
    pub impact: Impact,
    /// Members of every group referencing the table, group order
    pub affected_query_ids: Vec<String>,
    /// Mean estimated gain over the referencing groups, 0 when none
    pub avg_gain_percent: f64,
    pub size_mb: Option<f64>,
    pub schema: Option<String>,
    pub existing_indexes: BTreeSet<String>,
}

impl Suggestion {
    /// Returns true if the suggestion produces a script
    pub fn needs_script(&self) -> bool {
        self.action != RemediationAction::IndexExists
    }
}

/// Turns a classification and its query groups into suggestions
#[derive(Debug, Clone, Copy, Default)]
pub struct RemediationPlanner;

impl RemediationPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan one suggestion per classified table.
    ///
    /// The result is ordered by priority, highest first. Equal priorities
    /// keep tier 1 before tier 2 and the classifier's order within a tier.
    pub fn plan(
        &self,
        classification: &ClassificationResult,
        groups: &[QueryGroup],
    ) -> Result<Vec<Suggestion>> {
        let mut suggestions =
            Vec::with_capacity(classification.tier1.len() + classification.tier2.len());

        for (tier, table) in classification.all_tables() {
            let matching: Vec<&QueryGroup> = groups
                .iter()
                .filter(|group| group.contains_table(&table.name))
                .collect();
            let avg_gain_percent = average_gain(table, &matching)?;

            let (action, priority_score, impact) = match tier {
                Tier::Tier1 => plan_small_table(table),
                Tier::Tier2 => plan_large_table(table, &matching, avg_gain_percent),
            };

            tracing::debug!(
                table = %table.name,
                tier = %tier,
                action = %action,
                priority = priority_score,
                "planned remediation"
            );

            suggestions.push(Suggestion {
                table_name: table.name.clone(),
                tier,
                action,
                priority_score,
                impact,
                affected_query_ids: matching
                    .iter()
                    .flat_map(|group| group.member_ids.iter().cloned())
                    .collect(),
                avg_gain_percent,
                size_mb: table.size_mb,
                schema: table.schema.clone(),
                existing_indexes: table.existing_indexes.clone(),
            });
        }

        // sort_by is stable
        suggestions.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));

        tracing::info!(suggestions = suggestions.len(), "remediation plan ready");
        Ok(suggestions)
    }
}

fn plan_small_table(table: &TableInfo) -> (RemediationAction, f64, Impact) {
    if table.has_indexes() {
        (
            RemediationAction::IndexExists,
            INDEXED_SMALL_TABLE_PRIORITY,
            Impact::Low,
        )
    } else {
        (
            RemediationAction::CreateIndex,
            UNINDEXED_SMALL_TABLE_PRIORITY,
            Impact::High,
        )
    }
}

fn plan_large_table(
    table: &TableInfo,
    matching: &[&QueryGroup],
    avg_gain_percent: f64,
) -> (RemediationAction, f64, Impact) {
    let action = if !matching.is_empty() && table.has_indexes() {
        RemediationAction::RefactorOrPartition
    } else {
        RemediationAction::ConsiderIndex
    };

    let (priority, impact) = if avg_gain_percent > CRITICAL_GAIN_PERCENT {
        (9.0, Impact::Critical)
    } else if avg_gain_percent > 0.0 {
        (7.0, Impact::Medium)
    } else {
        (5.0, Impact::Low)
    };

    (action, priority, impact)
}

fn average_gain(table: &TableInfo, matching: &[&QueryGroup]) -> Result<f64> {
    if matching.is_empty() {
        return Ok(0.0);
    }

    let size_mb = table.size_mb.unwrap_or(0.0);
    let mut total = 0.0;
    for group in matching {
        let gain = estimate_gain(
            group.average_elapsed_micros,
            size_mb,
            Some(group.signature.to_string()),
        )?;
        total += gain.percent;
    }
    Ok(round2(total / matching.len() as f64))
}

/// Plan with the default planner
pub fn plan_remediations(
    classification: &ClassificationResult,
    groups: &[QueryGroup],
) -> Result<Vec<Suggestion>> {
    RemediationPlanner::new().plan(classification, groups)
}
