//! Table size classification
//!
//! Looks up storage facts for every referenced table and buckets each one
//! into a size tier. Tables whose metadata cannot be retrieved are left
//! out of the result instead of failing the batch.

mod classifier;


pub use classifier::*;
