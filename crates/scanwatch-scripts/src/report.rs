//! HTML run report

use crate::Result;
use crate::filters::register_filters;
use crate::templates;
use chrono::{DateTime, Utc};
use minijinja::Environment;
use scanwatch_analyzer::AdvisorReport;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const REPORT_TEMPLATE: &str = "report.html";

#[derive(Serialize)]
struct SuggestionRow<'a> {
    table_name: &'a str,
    tier: String,
    action: String,
    priority_score: String,
    impact: String,
    size: String,
    avg_gain_percent: String,
    affected_query_ids: &'a [String],
}

#[derive(Serialize)]
struct GroupRow<'a> {
    signature: String,
    tables: &'a [String],
    execution_count: u64,
    avg_ms: String,
    priority: String,
    sample_text: &'a str,
}

#[derive(Serialize)]
struct SchemaRow<'a> {
    schema: &'a str,
    category: String,
    total_queries: u64,
    total_time_secs: String,
    priority_score: String,
}

#[derive(Serialize)]
struct FailureRow<'a> {
    query_id: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct ReportContext<'a> {
    generated_at: String,
    query_count: usize,
    suggestions: Vec<SuggestionRow<'a>>,
    groups: Vec<GroupRow<'a>>,
    schemas: Vec<SchemaRow<'a>>,
    excluded: &'a [String],
    parse_failures: Vec<FailureRow<'a>>,
}

/// Renders an `AdvisorReport` as a standalone HTML page
pub struct ReportRenderer {
    env: Environment<'static>,
    group_limit: usize,
}

impl ReportRenderer {
    /// Fails only if the built-in report template does not compile
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        register_filters(&mut env);
        env.add_template(REPORT_TEMPLATE, templates::REPORT)?;
        Ok(Self {
            env,
            group_limit: 20,
        })
    }

    /// Maximum number of statement groups listed
    pub fn with_group_limit(mut self, limit: usize) -> Self {
        self.group_limit = limit;
        self
    }

    pub fn render_html(
        &self,
        report: &AdvisorReport,
        generated_at: DateTime<Utc>,
    ) -> Result<String> {
        let context = ReportContext {
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            query_count: report.query_count(),
            suggestions: report
                .suggestions
                .iter()
                .map(|s| SuggestionRow {
                    table_name: &s.table_name,
                    tier: s.tier.to_string(),
                    action: s.action.to_string(),
                    priority_score: format!("{}", s.priority_score),
                    impact: s.impact.to_string(),
                    size: s
                        .size_mb
                        .map(|size| format!("{:.2}", size))
                        .unwrap_or_else(|| "-".to_string()),
                    avg_gain_percent: format!("{:.2}", s.avg_gain_percent),
                    affected_query_ids: &s.affected_query_ids,
                })
                .collect(),
            groups: report
                .top_groups(self.group_limit)
                .iter()
                .map(|g| GroupRow {
                    signature: g.signature.to_string(),
                    tables: &g.tables,
                    execution_count: g.execution_count,
                    avg_ms: format!("{:.2}", g.average_elapsed_ms()),
                    priority: format!("{:.2}", g.priority_score),
                    sample_text: &g.sample_text,
                })
                .collect(),
            schemas: report
                .schemas
                .iter()
                .map(|s| SchemaRow {
                    schema: &s.schema,
                    category: s.category.to_string(),
                    total_queries: s.total_queries,
                    total_time_secs: format!("{:.2}", s.total_time_secs),
                    priority_score: format!("{:.2}", s.priority_score),
                })
                .collect(),
            excluded: &report.classification.excluded,
            parse_failures: report
                .parse_failures
                .iter()
                .map(|f| FailureRow {
                    query_id: &f.query_id,
                    message: &f.diagnostic.message,
                })
                .collect(),
        };

        let html = self.env.get_template(REPORT_TEMPLATE)?.render(&context)?;
        Ok(html)
    }

    /// Render and write `report_<timestamp>.html` into `dir`
    pub fn write_report(
        &self,
        dir: impl AsRef<Path>,
        report: &AdvisorReport,
        generated_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let html = self.render_html(report, generated_at)?;

        fs::create_dir_all(dir)?;
        let target = dir.join(format!("report_{}.html", generated_at.format("%Y%m%d_%H%M%S")));
        let partial = dir.join(format!(".report-{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&partial, html)?;
        if let Err(err) = fs::rename(&partial, &target) {
            let _ = fs::remove_file(&partial);
            return Err(err.into());
        }

        tracing::info!(path = %target.display(), "report written");
        Ok(target)
    }
}
