//! scanwatch analyzer - full-table-scan query classification and prioritization
//!
//! This crate turns a snapshot of shared-cache statements into an ordered
//! list of remediation suggestions:
//! - Extracting referenced tables and WHERE predicates from SQL text
//! - Grouping structurally similar statements under a stable signature
//! - Classifying the referenced tables by segment size
//! - Estimating the gain of a remediation and planning the suggestions
//! - Rating each schema's full-scan workload
//!
//! # Example
//!
//! ```
//! use scanwatch_analyzer::{estimate_gain, signature_of};
//!
//! let a = signature_of(&["A".to_string(), "B".to_string()], &["X = ?".to_string()]);
//! let b = signature_of(&["B".to_string(), "A".to_string()], &["X = ?".to_string()]);
//! assert_eq!(a, b);
//!
//! let gain = estimate_gain(1_000.0, 5.0, None).unwrap();
//! assert_eq!(gain.percent, 60.0);
//! ```

pub mod classify;
pub mod extract;
pub mod gain;
pub mod grouping;
pub mod pipeline;
pub mod planner;
pub mod schemas;

pub use classify::*;
pub use extract::*;
pub use gain::*;
pub use grouping::*;
pub use pipeline::*;
pub use planner::*;
pub use schemas::*;
