//! Error types for script and report generation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nothing to write")]
    NothingToWrite,

    #[error("Duplicate script name: {0}")]
    DuplicateName(String),
}

/// Result type alias for script operations
pub type Result<T> = std::result::Result<T, ScriptError>;
