//! Captured catalog snapshots

mod catalog_snapshot;

pub use catalog_snapshot::*;
