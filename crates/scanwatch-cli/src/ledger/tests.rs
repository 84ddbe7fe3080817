//! Tests for the execution ledger

use super::*;
use chrono::TimeZone;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

mod schedule_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_ledger_is_first_run_and_due() {
        let ledger = ExecutionLedger::default();
        assert!(ledger.is_first_run());
        assert!(ledger.is_due(at(0)));
    }

    #[test]
    fn test_record_run_schedules_next() {
        let mut ledger = ExecutionLedger::default();
        ledger.record_run(at(2), 6);

        assert!(!ledger.is_first_run());
        assert_eq!(ledger.last_run, Some(at(2)));
        assert_eq!(ledger.next_run, Some(at(8)));
        assert_eq!(ledger.run_count, 1);
    }

    #[test]
    fn test_is_due() {
        let mut ledger = ExecutionLedger::default();
        ledger.record_run(at(2), 6);

        assert!(!ledger.is_due(at(7)));
        assert!(ledger.is_due(at(8)));
        assert!(ledger.is_due(at(9)));
    }
}

mod persistence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ExecutionLedger::load(dir.path().join("execution.toml")).unwrap();
        assert_eq!(ledger, ExecutionLedger::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("execution.toml");

        let mut ledger = ExecutionLedger::default();
        ledger.record_run(at(1), 12);
        ledger.record_run(at(13), 12);
        ledger.save(&path).unwrap();

        let loaded = ExecutionLedger::load(&path).unwrap();
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.run_count, 2);

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execution.toml");
        std::fs::write(&path, "last_run = [").unwrap();

        let err = ExecutionLedger::load(&path).unwrap_err();
        assert!(matches!(err, ScanwatchError::Toml(_)));
    }
}
