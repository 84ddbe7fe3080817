//! Error types for scanwatch

use thiserror::Error;

/// Core error type for scanwatch operations
#[derive(Error, Debug)]
pub enum ScanwatchError {
    /// A caller handed a malformed input to a component
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The database or metadata collaborator cannot be reached for this run
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Metadata for a single table could not be retrieved
    #[error("Lookup unavailable for table {table}: {reason}")]
    LookupUnavailable { table: String, reason: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ScanwatchError {
    /// Build a `LookupUnavailable` error for a table
    pub fn lookup(table: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::LookupUnavailable {
            table: table.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for failures that only affect a single item of a batch
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::LookupUnavailable { .. } | Self::Timeout(_))
    }

    /// Returns true for failures that abort the whole run
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::DependencyUnavailable(_) | Self::Cancelled
        )
    }
}

/// Result type alias for scanwatch operations
pub type Result<T> = std::result::Result<T, ScanwatchError>;
