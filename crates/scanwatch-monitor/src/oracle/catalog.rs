//! Oracle catalog queries
//!
//! Reads full-table-scan candidates from `v$sql` and per-table storage facts
//! from `dba_segments`, `all_tables` and `all_indexes`.

use async_trait::async_trait;
use scanwatch_core::{
    Connection, QueryResult, QuerySource, RawQueryRecord, Result, Row, ScanwatchError,
    TableMetadataSource, Value,
};
use std::sync::Arc;

/// Marker embedded in the candidate query so it never reports itself
pub const SELF_MARKER: &str = "/* scanwatch:candidates */";

/// SQL issued against the Oracle data dictionary
pub struct CatalogQuery;

impl CatalogQuery {
    /// Shared-cache statements flagged as full-table-scan candidates, slowest first
    pub fn full_scan_candidates() -> &'static str {
        r#"
        SELECT /* scanwatch:candidates */ sql_id, sql_text, executions, elapsed_time
        FROM v$sql
        WHERE sql_text LIKE '%TABLE ACCESS FULL%'
           OR sql_text LIKE '%/*+ FULL(%'
        ORDER BY elapsed_time DESC
        "#
    }

    /// Segment size in megabytes of an unqualified table
    pub fn segment_size() -> &'static str {
        r#"
        SELECT SUM(bytes) / 1024 / 1024 AS size_mb
        FROM dba_segments
        WHERE segment_name = UPPER(:table_name) AND segment_type = 'TABLE'
        "#
    }

    /// Segment size in megabytes of an owner-qualified table
    pub fn owned_segment_size() -> &'static str {
        r#"
        SELECT SUM(bytes) / 1024 / 1024 AS size_mb
        FROM dba_segments
        WHERE segment_name = UPPER(:table_name) AND owner = UPPER(:owner)
          AND segment_type = 'TABLE'
        "#
    }

    pub fn table_owner() -> &'static str {
        "SELECT owner FROM all_tables WHERE table_name = UPPER(:table_name)"
    }

    pub fn table_indexes() -> &'static str {
        r#"
        SELECT index_name
        FROM all_indexes
        WHERE table_name = UPPER(:table_name)
        ORDER BY index_name
        "#
    }

    pub fn owned_table_indexes() -> &'static str {
        r#"
        SELECT index_name
        FROM all_indexes
        WHERE table_name = UPPER(:table_name) AND table_owner = UPPER(:owner)
        ORDER BY index_name
        "#
    }

    /// Cheapest possible round trip
    pub fn probe() -> &'static str {
        "SELECT 1 FROM DUAL"
    }
}

/// Split `OWNER.TABLE` into its parts; an unqualified name has no owner
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((owner, table)) if !owner.is_empty() && !table.is_empty() => (Some(owner), table),
        _ => (None, name),
    }
}

/// Both collaborators backed by a live Oracle session
pub struct OracleCatalog<C: Connection + ?Sized> {
    connection: Arc<C>,
}

impl<C: Connection + ?Sized> OracleCatalog<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    async fn table_query(
        &self,
        table: &str,
        unqualified_sql: &str,
        qualified_sql: &str,
    ) -> Result<QueryResult> {
        let (owner, name) = split_qualified(table);
        let result = match owner {
            Some(owner) => {
                self.connection
                    .query(qualified_sql, &[Value::from(name), Value::from(owner)])
                    .await
            }
            None => {
                self.connection
                    .query(unqualified_sql, &[Value::from(name)])
                    .await
            }
        };
        result.map_err(|err| match err {
            err @ ScanwatchError::Cancelled => err,
            other => ScanwatchError::lookup(table, other),
        })
    }
}

/// Convert one `v$sql` row, `None` when the row lacks an id or text
pub(crate) fn parse_candidate(row: &Row) -> Option<RawQueryRecord> {
    let id = row.get_by_name("sql_id")?.as_str()?.trim().to_string();
    let text = row.get_by_name("sql_text")?.as_str()?.to_string();
    if id.is_empty() {
        return None;
    }

    let count = |column: &str| {
        row.get_by_name(column)
            .and_then(|value| value.as_f64())
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value as u64)
            .unwrap_or(0)
    };

    Some(RawQueryRecord::new(
        id,
        text,
        count("executions"),
        count("elapsed_time"),
    ))
}

#[async_trait]
impl<C: Connection + ?Sized + 'static> QuerySource for OracleCatalog<C> {
    async fn fetch_candidate_queries(&self) -> Result<Vec<RawQueryRecord>> {
        let result = self
            .connection
            .query(CatalogQuery::full_scan_candidates(), &[])
            .await
            .map_err(|err| match err {
                err @ (ScanwatchError::DependencyUnavailable(_) | ScanwatchError::Cancelled) => {
                    err
                }
                other => ScanwatchError::DependencyUnavailable(format!(
                    "could not read v$sql: {}",
                    other
                )),
            })?;

        let mut records = Vec::with_capacity(result.row_count());
        let mut skipped = 0usize;
        for row in &result.rows {
            match parse_candidate(row) {
                Some(record) if record.text.contains(SELF_MARKER) => {}
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "ignored v$sql rows without an id or text");
        }
        if records.is_empty() {
            tracing::info!("no full-table-scan candidates in the shared cache");
        }
        Ok(records)
    }
}

#[async_trait]
impl<C: Connection + ?Sized + 'static> TableMetadataSource for OracleCatalog<C> {
    async fn size_of(&self, table: &str) -> Result<Option<f64>> {
        let result = self
            .table_query(
                table,
                CatalogQuery::segment_size(),
                CatalogQuery::owned_segment_size(),
            )
            .await?;

        let size = result
            .first()
            .and_then(|row| row.get_by_name("size_mb"))
            .filter(|value| !value.is_null());
        match size {
            None => {
                tracing::debug!(table = %table, "no segment in dba_segments");
                Ok(None)
            }
            Some(value) => value.as_f64().map(Some).ok_or_else(|| {
                ScanwatchError::lookup(table, format!("unexpected segment size {}", value))
            }),
        }
    }

    async fn schema_of(&self, table: &str) -> Result<Option<String>> {
        if let (Some(owner), _) = split_qualified(table) {
            return Ok(Some(owner.to_uppercase()));
        }

        let result = self
            .table_query(table, CatalogQuery::table_owner(), CatalogQuery::table_owner())
            .await?;
        Ok(result
            .first()
            .and_then(|row| row.get_by_name("owner"))
            .and_then(|value| value.as_str())
            .map(str::to_string))
    }

    async fn indexes_of(&self, table: &str) -> Result<Vec<String>> {
        let result = self
            .table_query(
                table,
                CatalogQuery::table_indexes(),
                CatalogQuery::owned_table_indexes(),
            )
            .await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.get_by_name("index_name"))
            .filter_map(|value| value.as_str())
            .map(str::to_string)
            .collect())
    }

    async fn check_available(&self) -> Result<()> {
        if self.connection.is_closed() {
            return Err(ScanwatchError::DependencyUnavailable(
                "connection is closed".to_string(),
            ));
        }
        self.connection
            .query(CatalogQuery::probe(), &[])
            .await
            .map(|_| ())
            .map_err(|err| ScanwatchError::DependencyUnavailable(err.to_string()))
    }
}
