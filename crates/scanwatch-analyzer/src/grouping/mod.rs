//! Query signatures and grouping
//!
//! Statements that touch the same tables with the same normalized
//! predicates share a signature and are folded into one `QueryGroup`.

mod grouper;
mod signature;


pub use grouper::*;
pub use signature::*;
