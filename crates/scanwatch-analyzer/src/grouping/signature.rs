//! Content-addressed query signatures

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-length hex fingerprint of a statement's structural shape
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuerySignature(String);

impl QuerySignature {
    /// Hex digest length
    pub const LEN: usize = 32;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical text a signature is computed from.
///
/// Both inputs are sorted and deduplicated, so the result does not depend
/// on the order the features were extracted in.
pub fn canonical_shape(tables: &[String], predicates: &[String]) -> String {
    let mut tables: Vec<&str> = tables.iter().map(String::as_str).collect();
    tables.sort_unstable();
    tables.dedup();
    let mut predicates: Vec<&str> = predicates.iter().map(String::as_str).collect();
    predicates.sort_unstable();
    predicates.dedup();
    format!("{:?} WHERE {:?}", tables, predicates)
}

/// Order-independent 128-bit signature of a table set and predicate set
pub fn signature_of(tables: &[String], predicates: &[String]) -> QuerySignature {
    let mut hasher = Md5::new();
    hasher.update(canonical_shape(tables, predicates).as_bytes());
    QuerySignature(format!("{:x}", hasher.finalize()))
}
