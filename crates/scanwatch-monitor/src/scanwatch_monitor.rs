//! scanwatch monitor - adapters that feed the advisor pipeline
//!
//! This crate provides the collaborators the analysis pipeline reads from:
//! - `OracleCatalog` - shared SQL cache and data dictionary queries issued
//!   through any `Connection`
//! - `CatalogSnapshot` - a captured copy of the same data, loadable from JSON

pub mod oracle;
pub mod snapshot;

pub use oracle::*;
pub use snapshot::*;
