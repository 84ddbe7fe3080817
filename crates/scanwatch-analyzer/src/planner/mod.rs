//! Remediation planning
//!
//! Combines the classification, the query groups and the gain estimator
//! into one ordered list of suggestions.

mod remediation;

pub use remediation::*;
