//! Tests for console rendering

use super::*;
use chrono::TimeZone;
use scanwatch_analyzer::{RemediationAction, SchemaCategory, SchemaWorkload, Tier, signature_of};
use std::collections::BTreeSet;

fn group(table: &str, sample: &str) -> QueryGroup {
    let tables = vec![table.to_string()];
    let predicates = vec!["ID = ?".to_string()];
    QueryGroup {
        signature: signature_of(&tables, &predicates),
        sample_text: sample.to_string(),
        member_ids: vec!["q1".to_string()],
        tables,
        schemas: BTreeSet::new(),
        predicates,
        aliases: Default::default(),
        execution_count: 10,
        total_elapsed_micros: 25_000,
        average_elapsed_micros: 2_500.0,
        priority_score: 16.0,
    }
}

fn suggestion(table: &str) -> Suggestion {
    Suggestion {
        table_name: table.to_string(),
        tier: Tier::Tier1,
        action: RemediationAction::CreateIndex,
        priority_score: 8.0,
        impact: Impact::High,
        affected_query_ids: vec!["q1".to_string(), "q2".to_string()],
        avg_gain_percent: 60.0,
        size_mb: Some(5.0),
        schema: Some("APP".to_string()),
        existing_indexes: BTreeSet::new(),
    }
}

mod truncate_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_short_text_kept() {
        assert_eq!(truncate("SELECT *\n  FROM T", 40), "SELECT * FROM T");
    }

    #[test]
    fn test_long_text_shortened() {
        let short = truncate("SELECT * FROM USERS WHERE ID = 1", 12);
        assert_eq!(short, "SELECT * ...");
        assert_eq!(short.chars().count(), 12);
    }
}

mod table_tests {
    use super::*;

    #[test]
    fn test_groups_table() {
        let rendered = groups_table(&[group("USERS", "SELECT * FROM USERS WHERE ID = 1")]).to_string();
        assert!(rendered.contains("USERS"));
        assert!(rendered.contains("2.50"));
        assert!(rendered.contains("16.00"));
    }

    #[test]
    fn test_suggestions_table() {
        let rendered = suggestions_table(&[suggestion("ORDERS")]).to_string();
        assert!(rendered.contains("ORDERS"));
        assert!(rendered.contains("CREATE_INDEX"));
        assert!(rendered.contains("HIGH"));
        assert!(rendered.contains("60.00"));
    }

    #[test]
    fn test_schemas_table() {
        let rendered = schemas_table(&[SchemaWorkload {
            schema: "SALES".to_string(),
            category: SchemaCategory::Heavy,
            total_queries: 120,
            total_time_secs: 75.0,
            priority_score: 106.5,
        }])
        .to_string();
        assert!(rendered.contains("SALES"));
        assert!(rendered.contains("HEAVY"));
        assert!(rendered.contains("75.00"));
        assert!(rendered.contains("106.50"));
    }

    #[test]
    fn test_ledger_table() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut ledger = ExecutionLedger::default();
        ledger.record_run(now, 6);

        let rendered = ledger_table(&ledger, now).to_string();
        assert!(rendered.contains("2024-03-01 18:00:00 UTC"));
        assert!(rendered.contains("false"));
    }

    #[test]
    fn test_empty_ledger_shows_never() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let rendered = ledger_table(&ExecutionLedger::default(), now).to_string();
        assert!(rendered.contains("never"));
    }
}
