//! Console rendering of advisor results

use crate::ledger::ExecutionLedger;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use scanwatch_analyzer::{
    AdvisorReport, Impact, QueryGroup, SchemaCategory, SchemaWorkload, Suggestion,
};

/// Number of statement groups shown on the console
pub const CONSOLE_GROUP_LIMIT: usize = 5;

fn new_table<'a>(columns: impl IntoIterator<Item = &'a str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(columns.into_iter().map(|c| Cell::new(c).fg(Color::Cyan)));
    table
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut short: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

fn impact_color(impact: Impact) -> Color {
    match impact {
        Impact::Critical => Color::Red,
        Impact::High => Color::Yellow,
        Impact::Medium => Color::Blue,
        Impact::Low => Color::Grey,
    }
}

/// Highest-priority statement groups
pub fn groups_table(groups: &[QueryGroup]) -> Table {
    let mut table = new_table([
        "Signature",
        "Tables",
        "Executions",
        "Avg ms",
        "Priority",
        "Sample",
    ]);
    for group in groups {
        table.add_row(vec![
            Cell::new(&group.signature.as_str()[..8]),
            Cell::new(group.tables.join(", ")),
            Cell::new(group.execution_count),
            Cell::new(format!("{:.2}", group.average_elapsed_ms())),
            Cell::new(format!("{:.2}", group.priority_score)),
            Cell::new(truncate(&group.sample_text, 60)),
        ]);
    }
    table
}

pub fn suggestions_table(suggestions: &[Suggestion]) -> Table {
    let mut table = new_table([
        "Table",
        "Tier",
        "Size MB",
        "Action",
        "Priority",
        "Impact",
        "Avg gain %",
        "Queries",
    ]);
    for suggestion in suggestions {
        table.add_row(vec![
            Cell::new(&suggestion.table_name),
            Cell::new(suggestion.tier),
            Cell::new(
                suggestion
                    .size_mb
                    .map(|size| format!("{:.2}", size))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(suggestion.action),
            Cell::new(suggestion.priority_score),
            Cell::new(suggestion.impact).fg(impact_color(suggestion.impact)),
            Cell::new(format!("{:.2}", suggestion.avg_gain_percent)),
            Cell::new(suggestion.affected_query_ids.len()),
        ]);
    }
    table
}

pub fn schemas_table(schemas: &[SchemaWorkload]) -> Table {
    let mut table = new_table(["Schema", "Category", "Statements", "Time s", "Priority"]);
    for workload in schemas {
        let color = match workload.category {
            SchemaCategory::Heavy => Color::Red,
            SchemaCategory::Regular => Color::Yellow,
            SchemaCategory::Low => Color::Grey,
        };
        table.add_row(vec![
            Cell::new(&workload.schema),
            Cell::new(workload.category).fg(color),
            Cell::new(workload.total_queries),
            Cell::new(format!("{:.2}", workload.total_time_secs)),
            Cell::new(format!("{:.2}", workload.priority_score)),
        ]);
    }
    table
}

pub fn ledger_table(ledger: &ExecutionLedger, now: DateTime<Utc>) -> Table {
    let format_time = |time: Option<DateTime<Utc>>| {
        time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    };

    let mut table = new_table(["Field", "Value"]);
    table.add_row(vec![
        Cell::new("First run").fg(Color::Yellow),
        Cell::new(ledger.is_first_run()),
    ]);
    table.add_row(vec![
        Cell::new("Last run").fg(Color::Yellow),
        Cell::new(format_time(ledger.last_run)),
    ]);
    table.add_row(vec![
        Cell::new("Next run").fg(Color::Yellow),
        Cell::new(format_time(ledger.next_run)),
    ]);
    table.add_row(vec![
        Cell::new("Runs").fg(Color::Yellow),
        Cell::new(ledger.run_count),
    ]);
    table.add_row(vec![
        Cell::new("Due").fg(Color::Yellow),
        Cell::new(ledger.is_due(now)),
    ]);
    table
}

/// Print the human-readable summary of a run
pub fn print_report(report: &AdvisorReport) {
    println!(
        "Analyzed {} statements in {} groups",
        report.query_count(),
        report.groups.len()
    );

    if !report.groups.is_empty() {
        println!("\nTop statement groups:");
        println!("{}", groups_table(report.top_groups(CONSOLE_GROUP_LIMIT)));
    }

    if report.suggestions.is_empty() {
        println!("\nNo remediation suggestions.");
    } else {
        println!("\nSuggestions:");
        println!("{}", suggestions_table(&report.suggestions));
    }

    if !report.schemas.is_empty() {
        println!("\nSchemas:");
        println!("{}", schemas_table(&report.schemas));
    }

    if !report.classification.excluded.is_empty() {
        println!(
            "\nExcluded tables (metadata unavailable): {}",
            report.classification.excluded.join(", ")
        );
    }
    if !report.parse_failures.is_empty() {
        println!(
            "{} statements could not be analyzed",
            report.parse_failures.len()
        );
    }
}

#[cfg(test)]
mod tests;
