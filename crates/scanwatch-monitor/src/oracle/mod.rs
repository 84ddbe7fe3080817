//! Oracle data dictionary adapter

mod catalog;

pub use catalog::*;
