//! SQL script generation
//!
//! One script per actionable suggestion. Tables that already have an index
//! get no script.

use crate::filters::register_filters;
use crate::templates;
use crate::Result;
use chrono::{DateTime, Utc};
use minijinja::Environment;
use scanwatch_analyzer::{QueryGroup, RemediationAction, Suggestion};
use serde::Serialize;

/// Column indexed when no predicate names one
pub const DEFAULT_INDEX_COLUMN: &str = "ID";

/// Kind of generated script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    /// Ready-to-run `CREATE INDEX`
    CreateIndex,
    /// `CREATE INDEX` left commented out for review
    ReviewIndex,
    /// Annotated refactor hint
    Refactor,
}

impl ScriptKind {
    fn template_name(&self) -> &'static str {
        match self {
            Self::CreateIndex => "create_index.sql",
            Self::ReviewIndex => "review_index.sql",
            Self::Refactor => "refactor.sql",
        }
    }

    /// Middle part of the file name
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateIndex => "idx",
            Self::ReviewIndex => "review",
            Self::Refactor => "refactor",
        }
    }

    pub fn for_action(action: RemediationAction) -> Option<Self> {
        match action {
            RemediationAction::CreateIndex => Some(Self::CreateIndex),
            RemediationAction::ConsiderIndex => Some(Self::ReviewIndex),
            RemediationAction::RefactorOrPartition => Some(Self::Refactor),
            RemediationAction::IndexExists => None,
        }
    }
}

/// A rendered script, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub file_name: String,
    pub table_name: String,
    pub kind: ScriptKind,
    pub content: String,
}

#[derive(Serialize)]
struct ScriptContext<'a> {
    table: &'a str,
    tier: String,
    size: String,
    impact: String,
    priority: String,
    gain: String,
    generated_at: String,
    affected: &'a [String],
    existing_indexes: Vec<&'a str>,
    index_name: String,
    column: String,
    signature: String,
    avg_ms: String,
    schema: &'a str,
    sample_sql: &'a str,
}

/// Renders remediation scripts
pub struct ScriptGenerator {
    env: Environment<'static>,
    default_index_column: String,
}

impl ScriptGenerator {
    /// Fails only if a built-in script template does not compile
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        register_filters(&mut env);

        for (name, source) in [
            (ScriptKind::CreateIndex.template_name(), templates::CREATE_INDEX),
            (ScriptKind::ReviewIndex.template_name(), templates::REVIEW_INDEX),
            (ScriptKind::Refactor.template_name(), templates::REFACTOR),
        ] {
            env.add_template(name, source)?;
        }

        Ok(Self {
            env,
            default_index_column: DEFAULT_INDEX_COLUMN.to_string(),
        })
    }

    /// Column used when no predicate of the affected statements names one
    pub fn with_default_index_column(mut self, column: impl Into<String>) -> Self {
        self.default_index_column = column.into();
        self
    }

    /// Render a script for every suggestion that calls for one, in order
    pub fn generate(
        &self,
        suggestions: &[Suggestion],
        groups: &[QueryGroup],
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<GeneratedScript>> {
        let mut scripts = Vec::new();
        for suggestion in suggestions {
            if let Some(script) = self.render(suggestion, groups, generated_at)? {
                scripts.push(script);
            }
        }
        tracing::info!(scripts = scripts.len(), "remediation scripts rendered");
        Ok(scripts)
    }

    /// Render the script for one suggestion, `None` if it needs none
    pub fn render(
        &self,
        suggestion: &Suggestion,
        groups: &[QueryGroup],
        generated_at: DateTime<Utc>,
    ) -> Result<Option<GeneratedScript>> {
        let Some(kind) = ScriptKind::for_action(suggestion.action) else {
            return Ok(None);
        };

        let table = suggestion.table_name.as_str();
        let representative = groups.iter().find(|group| group.contains_table(table));
        if kind == ScriptKind::Refactor && representative.is_none() {
            tracing::warn!(table = %table, "refactor suggested without a statement group");
            return Ok(None);
        }

        let column = index_column(table, groups, &self.default_index_column);
        let context = ScriptContext {
            table,
            tier: suggestion.tier.to_string(),
            size: format_size(suggestion.size_mb),
            impact: suggestion.impact.to_string(),
            priority: format!("{}", suggestion.priority_score),
            gain: format!("{:.2}", suggestion.avg_gain_percent),
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            affected: &suggestion.affected_query_ids,
            existing_indexes: suggestion
                .existing_indexes
                .iter()
                .map(String::as_str)
                .collect(),
            index_name: index_name(table, &column),
            column,
            signature: representative
                .map(|group| group.signature.to_string())
                .unwrap_or_default(),
            avg_ms: representative
                .map(|group| format!("{:.2}", group.average_elapsed_ms()))
                .unwrap_or_default(),
            schema: suggestion.schema.as_deref().unwrap_or("unknown"),
            sample_sql: representative
                .map(|group| group.sample_text.as_str())
                .unwrap_or_default(),
        };

        let mut content = self
            .env
            .get_template(kind.template_name())?
            .render(&context)?;
        content.push('\n');

        Ok(Some(GeneratedScript {
            file_name: script_file_name(suggestion, kind, generated_at),
            table_name: suggestion.table_name.clone(),
            kind,
            content,
        }))
    }
}

/// First predicate column belonging to `table`, across the groups
/// referencing it in priority order
pub fn index_column(table: &str, groups: &[QueryGroup], default: &str) -> String {
    groups
        .iter()
        .find_map(|group| group.predicate_column_for(table))
        .unwrap_or_else(|| default.trim().to_uppercase())
}

/// `IDX_<TABLE>_<COLUMN>`, using the unqualified table name
pub fn index_name(table: &str, column: &str) -> String {
    let table = table.rsplit('.').next().unwrap_or(table);
    format!("IDX_{}_{}", table, column).to_uppercase()
}

fn script_file_name(
    suggestion: &Suggestion,
    kind: ScriptKind,
    generated_at: DateTime<Utc>,
) -> String {
    let stem: String = suggestion
        .table_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!(
        "{}_{}_{}_{}.sql",
        suggestion.tier,
        kind.label(),
        stem,
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

fn format_size(size_mb: Option<f64>) -> String {
    match size_mb {
        Some(size) => format!("{:.2} MB", size),
        None => "unknown".to_string(),
    }
}
