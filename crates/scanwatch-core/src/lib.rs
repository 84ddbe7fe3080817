//! scanwatch core - shared abstractions for the full-table-scan advisor
//!
//! This crate provides the fundamental traits and types that all other
//! scanwatch crates depend on. It defines:
//!
//! - `Connection` - Trait for a database session the adapters query through
//! - `QuerySource` / `TableMetadataSource` - The collaborators the analysis
//!   pipeline consumes
//! - `RawQueryRecord` - A row read from the shared SQL cache
//! - `AdvisorConfig` - Explicit configuration passed to every component
//! - Common types like `Value`, `Row` and `QueryResult`

pub mod catalog;
pub mod config;
mod connection;
mod error;
mod types;

pub use catalog::*;
pub use config::*;
pub use connection::*;
pub use error::*;
pub use types::*;
