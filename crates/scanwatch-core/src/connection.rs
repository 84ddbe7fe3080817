//! Connection trait

use crate::{QueryResult, Result, Value};
use async_trait::async_trait;

/// A database session the catalog adapters issue their queries through.
///
/// The advisor only reads from the database, so the trait is limited to
/// row-returning queries. Positional `params` are bound in order to the
/// named or numbered bind variables of `sql`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a query that returns rows
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}
