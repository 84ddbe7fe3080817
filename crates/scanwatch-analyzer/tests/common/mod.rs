//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use scanwatch_core::{
    QuerySource, RawQueryRecord, Result, ScanwatchError, TableMetadataSource,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Mock query cache returning a fixed batch of statements
pub struct MockQuerySource {
    pub records: Vec<RawQueryRecord>,
    pub should_fail: bool,
    pub fetch_count: Arc<parking_lot::Mutex<usize>>,
}

impl MockQuerySource {
    pub fn new(records: Vec<RawQueryRecord>) -> Self {
        Self {
            records,
            should_fail: false,
            fetch_count: Arc::new(parking_lot::Mutex::new(0)),
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetch_count.lock()
    }
}

#[async_trait]
impl QuerySource for MockQuerySource {
    async fn fetch_candidate_queries(&self) -> Result<Vec<RawQueryRecord>> {
        *self.fetch_count.lock() += 1;
        if self.should_fail {
            return Err(ScanwatchError::Connection("ORA-12541: TNS:no listener".into()));
        }
        Ok(self.records.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableFixture {
    pub size_mb: f64,
    pub schema: Option<String>,
    pub indexes: Vec<String>,
}

/// Mock metadata catalog backed by a table map.
///
/// Unknown tables report no size. Every lookup is logged for assertions.
pub struct MockMetadata {
    pub tables: HashMap<String, TableFixture>,
    pub unavailable: bool,
    pub probe_count: Arc<parking_lot::Mutex<usize>>,
    pub lookup_log: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl MockMetadata {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            unavailable: false,
            probe_count: Arc::new(parking_lot::Mutex::new(0)),
            lookup_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn with_table(mut self, name: &str, size_mb: f64) -> Self {
        self.tables.insert(
            name.to_string(),
            TableFixture {
                size_mb,
                ..Default::default()
            },
        );
        self
    }

    pub fn with_indexed_table(mut self, name: &str, size_mb: f64, indexes: &[&str]) -> Self {
        self.tables.insert(
            name.to_string(),
            TableFixture {
                size_mb,
                schema: None,
                indexes: indexes.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_schema(mut self, name: &str, schema: &str) -> Self {
        if let Some(table) = self.tables.get_mut(name) {
            table.schema = Some(schema.to_string());
        }
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn probe_count(&self) -> usize {
        *self.probe_count.lock()
    }

    pub fn lookup_log(&self) -> Vec<String> {
        self.lookup_log.lock().clone()
    }

    fn log(&self, what: &str, table: &str) {
        self.lookup_log.lock().push(format!("{}:{}", what, table));
    }
}

#[async_trait]
impl TableMetadataSource for MockMetadata {
    async fn size_of(&self, table: &str) -> Result<Option<f64>> {
        self.log("size", table);
        Ok(self.tables.get(table).map(|t| t.size_mb))
    }

    async fn schema_of(&self, table: &str) -> Result<Option<String>> {
        self.log("schema", table);
        Ok(self.tables.get(table).and_then(|t| t.schema.clone()))
    }

    async fn indexes_of(&self, table: &str) -> Result<Vec<String>> {
        self.log("indexes", table);
        Ok(self
            .tables
            .get(table)
            .map(|t| t.indexes.clone())
            .unwrap_or_default())
    }

    async fn check_available(&self) -> Result<()> {
        *self.probe_count.lock() += 1;
        if self.unavailable {
            return Err(ScanwatchError::Connection("ORA-03113: end-of-file on communication channel".into()));
        }
        Ok(())
    }
}

/// The two-statement USERS batch
pub fn users_batch() -> Vec<RawQueryRecord> {
    vec![
        RawQueryRecord::new("q1", "SELECT * FROM USERS WHERE ID=1", 10, 1000),
        RawQueryRecord::new("q2", "SELECT * FROM USERS WHERE ID=2", 5, 2000),
    ]
}
