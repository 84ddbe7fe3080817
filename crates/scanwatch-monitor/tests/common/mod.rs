//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use scanwatch_core::{Connection, QueryResult, Result, ScanwatchError, Value};
use std::sync::Arc;

/// Mock Oracle session.
///
/// Responses are chosen by SQL pattern: if a query contains the pattern
/// string, the registered result is returned, otherwise an empty result.
/// Failures can be limited to queries matching a pattern.
pub struct MockConnection {
    pub closed: bool,
    pub query_responses: Vec<(String, QueryResult)>,
    /// SQL patterns that make the query fail
    pub failing_patterns: Vec<String>,
    /// Log of all SQL queries executed with their bind values
    pub query_log: Arc<parking_lot::Mutex<Vec<(String, Vec<Value>)>>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            closed: false,
            query_responses: vec![],
            failing_patterns: vec![],
            query_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    /// Register a response for queries containing the given SQL pattern.
    pub fn with_query_response(
        mut self,
        sql_contains: impl Into<String>,
        result: QueryResult,
    ) -> Self {
        self.query_responses.push((sql_contains.into(), result));
        self
    }

    /// Fail every query containing the given SQL pattern.
    pub fn with_failure(mut self, sql_contains: impl Into<String>) -> Self {
        self.failing_patterns.push(sql_contains.into());
        self
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    pub fn query_log(&self) -> Vec<(String, Vec<Value>)> {
        self.query_log.lock().clone()
    }

    pub fn query_count(&self) -> usize {
        self.query_log.lock().len()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.query_log
            .lock()
            .push((sql.to_string(), params.to_vec()));

        if self
            .failing_patterns
            .iter()
            .any(|pattern| sql.contains(pattern.as_str()))
        {
            return Err(ScanwatchError::Query("ORA-00942: table or view does not exist".into()));
        }

        for (pattern, result) in &self.query_responses {
            if sql.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(QueryResult::empty())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Create a mock query result with the given columns and rows
pub fn mock_query_result(columns: Vec<&str>, rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult::from_rows(columns.into_iter().map(String::from).collect(), rows)
}

/// A `v$sql` result with one row per `(sql_id, sql_text, executions, elapsed_time)`
pub fn candidates_result(rows: &[(&str, &str, i64, i64)]) -> QueryResult {
    mock_query_result(
        vec!["SQL_ID", "SQL_TEXT", "EXECUTIONS", "ELAPSED_TIME"],
        rows.iter()
            .map(|(id, text, executions, elapsed)| {
                vec![
                    Value::from(*id),
                    Value::from(*text),
                    Value::Int64(*executions),
                    Value::Int64(*elapsed),
                ]
            })
            .collect(),
    )
}
