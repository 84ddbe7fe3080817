//! Integration tests for script and report generation
//!
//! Plans are built with the real extractor, grouper and planner so the
//! scripts see the same shapes they get in a run.

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use scanwatch_analyzer::{
    AdvisorReport, ApproximateExtractor, FeatureExtractor, ParsedQuery, QueryGroup, SchemaCategory,
    SchemaWorkload, Suggestion, TableInfo, classify_schemas, group_queries, partition_tables,
    plan_remediations,
};
use scanwatch_core::RawQueryRecord;
use scanwatch_scripts::{
    GeneratedScript, ReportRenderer, ScriptError, ScriptGenerator, ScriptKind, index_column, index_name,
    write_scripts,
};

fn generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
}

fn plan(records: &[(&str, &str, u64, u64)], tables: Vec<TableInfo>) -> AdvisorReport {
    let extractor = ApproximateExtractor::new();
    let parsed: Vec<ParsedQuery> = records
        .iter()
        .map(|(id, text, count, elapsed)| {
            let record = RawQueryRecord::new(*id, *text, *count, *elapsed);
            let features = extractor.extract(text);
            ParsedQuery::new(record, features)
        })
        .collect();
    let groups = group_queries(parsed);
    let classification = partition_tables(tables, 10.0).unwrap();
    let suggestions = plan_remediations(&classification, &groups).unwrap();
    let schemas = classify_schemas(&groups, 10, 100);
    AdvisorReport {
        groups,
        classification,
        suggestions,
        schemas,
        parse_failures: Vec::new(),
    }
}

fn users_plan() -> AdvisorReport {
    plan(
        &[
            ("q1", "SELECT * FROM USERS WHERE ID=1", 10, 1000),
            ("q2", "SELECT * FROM USERS WHERE ID=2", 5, 2000),
        ],
        vec![TableInfo::new("USERS", Some(5.0))],
    )
}

fn generate(groups: &[QueryGroup], suggestions: &[Suggestion]) -> Vec<GeneratedScript> {
    ScriptGenerator::new()
        .unwrap()
        .generate(suggestions, groups, generated_at())
        .unwrap()
}

// ============ Script content ============

#[test]
fn built_in_templates_compile() {
    assert!(ScriptGenerator::new().is_ok());
    assert!(ReportRenderer::new().is_ok());
}

#[test]
fn create_index_script() {
    let report = users_plan();
    let scripts = generate(&report.groups, &report.suggestions);

    assert_eq!(scripts.len(), 1);
    let script = &scripts[0];
    assert_eq!(script.kind, ScriptKind::CreateIndex);
    assert_eq!(script.file_name, "T1_idx_USERS_20240305_140709.sql");
    assert_eq!(
        script.content,
        "-- Index suggestion for USERS\n\
         -- Tier T1 | size 5.00 MB | impact HIGH | priority 8\n\
         -- Generated at 2024-03-05 14:07:09 UTC\n\
         -- Affected statements: q1, q2\n\
         CREATE INDEX IDX_USERS_ID ON USERS (ID);\n"
    );
}

#[test]
fn index_column_comes_from_predicates() {
    let report = plan(
        &[("q1", "SELECT * FROM ORDERS o WHERE o.status = 'NEW' AND o.id > 3", 1, 10)],
        vec![TableInfo::new("ORDERS", Some(2.0))],
    );
    assert_eq!(index_column("ORDERS", &report.groups, "ID"), "STATUS");

    let scripts = generate(&report.groups, &report.suggestions);
    assert!(scripts[0]
        .content
        .contains("CREATE INDEX IDX_ORDERS_STATUS ON ORDERS (STATUS);"));
}

#[test]
fn join_predicate_indexes_only_its_own_table() {
    let report = plan(
        &[(
            "q1",
            "SELECT * FROM ORDERS O JOIN USERS U ON O.USER_ID = U.ID WHERE U.EMAIL = 'a@b'",
            1,
            10,
        )],
        vec![
            TableInfo::new("ORDERS", Some(3.0)),
            TableInfo::new("USERS", Some(3.0)),
        ],
    );
    assert_eq!(index_column("USERS", &report.groups, "ID"), "EMAIL");
    assert_eq!(index_column("ORDERS", &report.groups, "ID"), "ID");

    let scripts = generate(&report.groups, &report.suggestions);
    let contents: Vec<_> = scripts.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(scripts.len(), 2);
    assert!(contents
        .iter()
        .any(|c| c.contains("CREATE INDEX IDX_USERS_EMAIL ON USERS (EMAIL);")));
    assert!(contents
        .iter()
        .any(|c| c.contains("CREATE INDEX IDX_ORDERS_ID ON ORDERS (ID);")));
    assert!(!contents.iter().any(|c| c.contains("ON ORDERS (EMAIL)")));
}

#[test]
fn unqualified_column_in_join_uses_default() {
    let report = plan(
        &[("q1", "SELECT * FROM ORDERS, USERS WHERE STATUS = 'X'", 1, 10)],
        vec![
            TableInfo::new("ORDERS", Some(3.0)),
            TableInfo::new("USERS", Some(3.0)),
        ],
    );
    assert_eq!(index_column("ORDERS", &report.groups, "ID"), "ID");
    assert_eq!(index_column("USERS", &report.groups, "ID"), "ID");
}

#[test]
fn table_name_qualifier_resolves() {
    let report = plan(
        &[("q1", "SELECT * FROM ORDERS, USERS WHERE USERS.EMAIL = 'x'", 1, 10)],
        vec![
            TableInfo::new("ORDERS", Some(3.0)),
            TableInfo::new("USERS", Some(3.0)),
        ],
    );
    assert_eq!(index_column("USERS", &report.groups, "ID"), "EMAIL");
    assert_eq!(index_column("ORDERS", &report.groups, "ID"), "ID");
}

#[test]
fn default_column_without_usable_predicate() {
    let report = plan(
        &[("q1", "SELECT * FROM AUDIT_LOG", 1, 10)],
        vec![TableInfo::new("AUDIT_LOG", Some(2.0))],
    );
    let scripts = ScriptGenerator::new()
        .unwrap()
        .with_default_index_column("log_id")
        .generate(&report.suggestions, &report.groups, generated_at())
        .unwrap();
    assert!(scripts[0]
        .content
        .contains("CREATE INDEX IDX_AUDIT_LOG_LOG_ID ON AUDIT_LOG (LOG_ID);"));
}

#[test]
fn review_script_is_commented_out() {
    let report = plan(
        &[("q1", "SELECT * FROM EVENTS WHERE KIND = 'X'", 1, 10)],
        vec![TableInfo::new("EVENTS", Some(30.0))],
    );
    let scripts = generate(&report.groups, &report.suggestions);

    assert_eq!(scripts[0].kind, ScriptKind::ReviewIndex);
    assert_eq!(scripts[0].file_name, "T2_review_EVENTS_20240305_140709.sql");
    assert!(scripts[0]
        .content
        .contains("-- CREATE INDEX IDX_EVENTS_KIND ON EVENTS (KIND);"));
    assert!(scripts[0]
        .content
        .lines()
        .all(|line| line.starts_with("--")));
}

#[test]
fn refactor_script_carries_group_details() {
    let report = plan(
        &[("q9", "SELECT *\nFROM ORDERS\nWHERE STATUS = 'OPEN'", 4, 10_000)],
        vec![
            TableInfo::new("ORDERS", Some(30.0))
                .with_schema("SALES")
                .with_indexes(["ORDERS_PK"]),
        ],
    );
    let scripts = generate(&report.groups, &report.suggestions);
    let script = &scripts[0];

    assert_eq!(script.kind, ScriptKind::Refactor);
    assert_eq!(script.file_name, "T2_refactor_ORDERS_20240305_140709.sql");
    let signature = report.groups[0].signature.to_string();
    assert!(script.content.contains(&format!("statement group {}", signature)));
    assert!(script.content.contains("-- Average time before: 2.50 ms"));
    assert!(script.content.contains("-- Estimated gain: 40.00%"));
    assert!(script.content.contains("-- Schema: SALES"));
    assert!(script.content.contains("-- Existing indexes: ORDERS_PK"));
    assert!(script.content.contains("-- SELECT *\n-- FROM ORDERS\n-- WHERE STATUS = 'OPEN'"));
    assert!(script.content.lines().all(|line| line.starts_with("--")));
}

#[test]
fn indexed_small_table_gets_no_script() {
    let report = plan(
        &[("q1", "SELECT * FROM USERS WHERE ID = 1", 1, 1)],
        vec![TableInfo::new("USERS", Some(1.0)).with_indexes(["USERS_PK"])],
    );
    assert!(generate(&report.groups, &report.suggestions).is_empty());
}

#[test]
fn index_name_uses_unqualified_table() {
    assert_eq!(index_name("SALES.ORDERS", "STATUS"), "IDX_ORDERS_STATUS");
    assert_eq!(index_name("users", "id"), "IDX_USERS_ID");
}

// ============ Writing ============

#[test]
fn write_scripts_moves_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let report = plan(
        &[
            ("q1", "SELECT * FROM USERS WHERE ID = 1", 1, 1),
            ("q2", "SELECT * FROM EVENTS WHERE KIND = 'X'", 1, 1),
        ],
        vec![
            TableInfo::new("USERS", Some(1.0)),
            TableInfo::new("EVENTS", Some(30.0)),
        ],
    );
    let scripts = generate(&report.groups, &report.suggestions);
    assert_eq!(scripts.len(), 2);

    let out = dir.path().join("generated");
    let paths = write_scripts(&out, &scripts).unwrap();

    assert_eq!(paths.len(), 2);
    for (path, script) in paths.iter().zip(&scripts) {
        assert_eq!(std::fs::read_to_string(path).unwrap(), script.content);
    }
    let entries: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries.len(), 2, "staging directory left behind: {:?}", entries);
}

#[test]
fn write_scripts_rejects_empty_batch() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        write_scripts(dir.path(), &[]),
        Err(ScriptError::NothingToWrite)
    ));
}

#[test]
fn write_scripts_rejects_duplicates_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let report = users_plan();
    let script = generate(&report.groups, &report.suggestions).remove(0);

    let out = dir.path().join("generated");
    let err = write_scripts(&out, &[script.clone(), script]).unwrap_err();
    assert!(matches!(err, ScriptError::DuplicateName(_)));
    assert!(!out.exists());
}

// ============ Report ============

#[test]
fn html_report_lists_suggestions_and_groups() {
    let mut report = users_plan();
    report.classification.excluded.push("GHOST".to_string());

    let html = ReportRenderer::new()
        .unwrap()
        .render_html(&report, generated_at())
        .unwrap();

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<td>USERS</td>"));
    assert!(html.contains("CREATE_INDEX"));
    assert!(html.contains("2 statements in 1 groups, 1 suggestions"));
    assert!(html.contains(report.groups[0].signature.as_str()));
    assert!(html.contains("GHOST"));
}

#[test]
fn html_report_lists_schema_workloads() {
    let mut report = users_plan();
    report.schemas = vec![
        SchemaWorkload {
            schema: "SALES".to_string(),
            category: SchemaCategory::Heavy,
            total_queries: 240,
            total_time_secs: 95.5,
            priority_score: 196.65,
        },
        SchemaWorkload {
            schema: "HR".to_string(),
            category: SchemaCategory::Low,
            total_queries: 2,
            total_time_secs: 0.25,
            priority_score: 1.48,
        },
    ];

    let html = ReportRenderer::new()
        .unwrap()
        .render_html(&report, generated_at())
        .unwrap();

    assert!(html.contains("<h2>Schemas</h2>"));
    assert!(html.contains(
        "<tr><td>SALES</td><td class=\"HEAVY\">HEAVY</td><td>240</td><td>95.50</td><td>196.65</td></tr>"
    ));
    assert!(html.contains("<td>HR</td><td class=\"LOW\">LOW</td>"));
}

#[test]
fn schema_workloads_come_from_groups() {
    let extractor = ApproximateExtractor::new();
    let parsed = vec![
        ParsedQuery::new(
            RawQueryRecord::new("q1", "SELECT * FROM USERS", 1, 2_000_000),
            extractor.extract("SELECT * FROM USERS"),
        )
        .with_schema(Some("APP".to_string())),
    ];
    let schemas = classify_schemas(&group_queries(parsed), 10, 100);
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].category, SchemaCategory::Low);
    assert_eq!(schemas[0].total_time_secs, 2.0);
}

#[test]
fn html_report_escapes_sql() {
    let report = plan(
        &[("q1", "SELECT * FROM T WHERE A < 3", 1, 1)],
        vec![TableInfo::new("T", Some(1.0))],
    );
    let html = ReportRenderer::new()
        .unwrap()
        .render_html(&report, generated_at())
        .unwrap();
    assert!(html.contains("A &lt; 3"));
}

#[test]
fn empty_report_renders() {
    let html = ReportRenderer::new()
        .unwrap()
        .render_html(&AdvisorReport::default(), generated_at())
        .unwrap();
    assert!(html.contains("No suggestions."));
    assert!(html.contains("No full table scan candidates."));
    assert!(html.contains("No schema information."));
}

#[test]
fn write_report_names_file_by_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = ReportRenderer::new()
        .unwrap()
        .write_report(dir.path().join("reports"), &users_plan(), generated_at())
        .unwrap();

    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        "report_20240305_140709.html"
    );
    assert!(std::fs::read_to_string(&path).unwrap().contains("USERS"));
    assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
}
