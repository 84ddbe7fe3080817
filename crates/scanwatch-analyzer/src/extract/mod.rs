//! SQL feature extraction
//!
//! Turns statement text into the structural features used for grouping:
//! referenced tables and normalized WHERE predicates. Extraction is
//! best-effort and never fails; unparseable statements yield empty
//! features with a diagnostic.

mod extractor;
mod lexer;


pub use extractor::*;
