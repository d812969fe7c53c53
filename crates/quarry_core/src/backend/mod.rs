//! Embedded search backend.
//!
//! The write path only talks to the index through [`IndexBackend`]:
//! documents are replaced and removed by a unique [`Term`], and searched
//! with a small [`Query`] tree.

mod memory;

pub use memory::MemoryIndex;

use crate::document::Document;
use crate::error::IndexResult;
use crate::mapper::geo::BoundingBox;
use quarry_codec::ordered;
use std::ops::Bound;

/// An exact value of an indexed field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term {
    /// Field name.
    pub field: String,
    /// Indexed bytes.
    pub bytes: Vec<u8>,
}

impl Term {
    /// Creates a term.
    pub fn new(field: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            field: field.into(),
            bytes: bytes.into(),
        }
    }

    /// Creates a term for a keyword or token value.
    pub fn keyword(field: impl Into<String>, value: &str) -> Self {
        Self::new(field, value.as_bytes())
    }

    /// Creates a term for an integer value.
    pub fn long(field: impl Into<String>, value: i64) -> Self {
        Self::new(field, ordered::encode_i64(value))
    }

    /// Creates a term for a floating point value.
    pub fn double(field: impl Into<String>, value: f64) -> Self {
        Self::new(field, ordered::encode_f64(value))
    }
}

/// A search query.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Every document.
    All,
    /// Documents holding the exact term.
    Term(Term),
    /// Documents with a term in `field` starting with `prefix`.
    Prefix {
        /// Field name.
        field: String,
        /// Byte prefix.
        prefix: Vec<u8>,
    },
    /// Documents with a term in `field` within the byte range.
    Range {
        /// Field name.
        field: String,
        /// Lower bound.
        lower: Bound<Vec<u8>>,
        /// Upper bound.
        upper: Bound<Vec<u8>>,
    },
    /// Documents whose point or shape in `field` intersects the box.
    GeoBBox {
        /// Field name.
        field: String,
        /// Box to intersect.
        bbox: BoundingBox,
    },
    /// Documents matching every clause.
    Conjunction(Vec<Query>),
    /// Documents matching any clause.
    Disjunction(Vec<Query>),
}

impl Query {
    /// Exact term query.
    pub fn term(term: Term) -> Self {
        Self::Term(term)
    }

    /// Keyword prefix query.
    pub fn prefix(field: impl Into<String>, prefix: &str) -> Self {
        Self::Prefix {
            field: field.into(),
            prefix: prefix.as_bytes().to_vec(),
        }
    }

    /// Inclusive range over an integer field.
    pub fn long_range(field: impl Into<String>, lower: i64, upper: i64) -> Self {
        Self::Range {
            field: field.into(),
            lower: Bound::Included(ordered::encode_i64(lower).to_vec()),
            upper: Bound::Included(ordered::encode_i64(upper).to_vec()),
        }
    }

    /// Inclusive range over a floating point field.
    pub fn double_range(field: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self::Range {
            field: field.into(),
            lower: Bound::Included(ordered::encode_f64(lower).to_vec()),
            upper: Bound::Included(ordered::encode_f64(upper).to_vec()),
        }
    }

    /// Conjunction of two queries.
    #[must_use]
    pub fn and(self, other: Query) -> Self {
        match self {
            Self::Conjunction(mut clauses) => {
                clauses.push(other);
                Self::Conjunction(clauses)
            }
            first => Self::Conjunction(vec![first, other]),
        }
    }
}

/// A search index the write path can mutate.
///
/// Implementations must be safe under concurrent calls from distinct
/// partitions; calls for the same term are applied in arrival order.
pub trait IndexBackend: Send + Sync {
    /// Replaces every document holding `term` with `document`.
    fn upsert(&self, term: &Term, document: Document) -> IndexResult<()>;

    /// Deletes every document holding `term`, returning how many.
    fn delete(&self, term: &Term) -> IndexResult<usize>;

    /// Deletes every document matching `query`, returning how many.
    fn delete_by_query(&self, query: &Query) -> IndexResult<usize>;

    /// Returns the first document holding `term`.
    fn get(&self, term: &Term) -> IndexResult<Option<Document>>;

    /// Returns up to `limit` documents matching `query`.
    fn search(&self, query: &Query, limit: usize) -> IndexResult<Vec<Document>>;

    /// Makes pending changes durable.
    fn commit(&self) -> IndexResult<()>;

    /// Returns the number of live documents.
    fn num_docs(&self) -> IndexResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_terms_sort_numerically() {
        assert!(Term::long("n", -1) < Term::long("n", 0));
        assert!(Term::long("n", 0) < Term::long("n", 1));
    }

    #[test]
    fn and_flattens() {
        let q = Query::All
            .and(Query::prefix("a", "x"))
            .and(Query::long_range("n", 1, 2));
        let Query::Conjunction(clauses) = q else {
            panic!("expected conjunction");
        };
        assert_eq!(clauses.len(), 3);
    }
}
