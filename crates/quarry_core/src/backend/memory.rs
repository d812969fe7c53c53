//! In-process index backend.

use super::{IndexBackend, Query, Term};
use crate::document::{Document, FieldValue};
use crate::error::{IndexError, IndexResult};
use crate::mapper::geo::BoundingBox;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

type DocId = u64;

#[derive(Default)]
struct Inner {
    next_id: DocId,
    docs: HashMap<DocId, (Document, BTreeSet<Term>)>,
    postings: BTreeMap<Term, BTreeSet<DocId>>,
    commits: u64,
}

impl Inner {
    fn remove(&mut self, id: DocId) -> bool {
        let Some((_, terms)) = self.docs.remove(&id) else {
            return false;
        };
        for term in terms {
            if let Some(ids) = self.postings.get_mut(&term) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        true
    }

    fn remove_all(&mut self, ids: BTreeSet<DocId>) -> usize {
        ids.into_iter().filter(|id| self.remove(*id)).count()
    }

    fn holding(&self, term: &Term) -> BTreeSet<DocId> {
        self.postings.get(term).cloned().unwrap_or_default()
    }

    fn terms_in(
        &self,
        field: &str,
        lower: Bound<&[u8]>,
        mut accept: impl FnMut(&[u8]) -> bool,
    ) -> BTreeSet<DocId> {
        let start = match lower {
            Bound::Included(b) => Bound::Included(Term::new(field, b)),
            Bound::Excluded(b) => Bound::Excluded(Term::new(field, b)),
            Bound::Unbounded => Bound::Included(Term::new(field, Vec::new())),
        };
        self.postings
            .range((start, Bound::Unbounded))
            .take_while(|(term, _)| term.field == field && accept(&term.bytes))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    fn geo_matches(&self, field: &str, bbox: &BoundingBox) -> BTreeSet<DocId> {
        self.docs
            .iter()
            .filter(|(_, (doc, _))| {
                doc.values(field).any(|value| match value {
                    FieldValue::Point(p) => bbox.contains(*p),
                    FieldValue::Shape(s) => s.bbox().intersects(bbox),
                    _ => false,
                })
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn matches(&self, query: &Query) -> BTreeSet<DocId> {
        match query {
            Query::All => self.docs.keys().copied().collect(),
            Query::Term(term) => self.holding(term),
            Query::Prefix { field, prefix } => {
                self.terms_in(field, Bound::Included(prefix.as_slice()), |b| {
                    b.starts_with(prefix)
                })
            }
            Query::Range {
                field,
                lower,
                upper,
            } => {
                let lower = match lower {
                    Bound::Included(b) => Bound::Included(b.as_slice()),
                    Bound::Excluded(b) => Bound::Excluded(b.as_slice()),
                    Bound::Unbounded => Bound::Unbounded,
                };
                self.terms_in(field, lower, |b| match upper {
                    Bound::Included(u) => b <= u.as_slice(),
                    Bound::Excluded(u) => b < u.as_slice(),
                    Bound::Unbounded => true,
                })
            }
            Query::GeoBBox { field, bbox } => self.geo_matches(field, bbox),
            Query::Conjunction(clauses) => {
                let mut clauses = clauses.iter();
                let Some(first) = clauses.next() else {
                    return self.docs.keys().copied().collect();
                };
                let mut ids = self.matches(first);
                for clause in clauses {
                    if ids.is_empty() {
                        break;
                    }
                    let other = self.matches(clause);
                    ids.retain(|id| other.contains(id));
                }
                ids
            }
            Query::Disjunction(clauses) => {
                clauses.iter().flat_map(|c| self.matches(c)).collect()
            }
        }
    }
}

/// An [`IndexBackend`] held entirely in memory.
///
/// Documents are kept with their terms; an inverted map from term to
/// document ids serves exact, prefix and range queries in term order.
/// Once [`MemoryIndex::close`] is called every operation fails with an
/// engine error.
#[derive(Default)]
pub struct MemoryIndex {
    inner: RwLock<Inner>,
    closed: AtomicBool,
}

impl MemoryIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the index.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns how many times [`IndexBackend::commit`] succeeded.
    pub fn commits(&self) -> u64 {
        self.inner.read().commits
    }

    fn check_open(&self) -> IndexResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(IndexError::engine_io("index is closed"))
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for MemoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryIndex")
            .field("docs", &inner.docs.len())
            .field("terms", &inner.postings.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl IndexBackend for MemoryIndex {
    fn upsert(&self, term: &Term, document: Document) -> IndexResult<()> {
        self.check_open()?;
        let mut inner = self.inner.write();
        let replaced = inner.holding(term);
        let replaced = inner.remove_all(replaced);

        let id = inner.next_id;
        inner.next_id += 1;
        let mut terms: BTreeSet<Term> = document.terms().into_iter().collect();
        terms.insert(term.clone());
        for t in &terms {
            inner.postings.entry(t.clone()).or_default().insert(id);
        }
        inner.docs.insert(id, (document, terms));
        trace!(field = %term.field, replaced, "upserted document");
        Ok(())
    }

    fn delete(&self, term: &Term) -> IndexResult<usize> {
        self.check_open()?;
        let mut inner = self.inner.write();
        let ids = inner.holding(term);
        Ok(inner.remove_all(ids))
    }

    fn delete_by_query(&self, query: &Query) -> IndexResult<usize> {
        self.check_open()?;
        let mut inner = self.inner.write();
        let ids = inner.matches(query);
        Ok(inner.remove_all(ids))
    }

    fn get(&self, term: &Term) -> IndexResult<Option<Document>> {
        self.check_open()?;
        let inner = self.inner.read();
        Ok(inner
            .postings
            .get(term)
            .and_then(|ids| ids.iter().next())
            .and_then(|id| inner.docs.get(id))
            .map(|(doc, _)| doc.clone()))
    }

    fn search(&self, query: &Query, limit: usize) -> IndexResult<Vec<Document>> {
        self.check_open()?;
        let inner = self.inner.read();
        Ok(inner
            .matches(query)
            .into_iter()
            .filter_map(|id| inner.docs.get(&id).map(|(doc, _)| doc.clone()))
            .take(limit)
            .collect())
    }

    fn commit(&self) -> IndexResult<()> {
        self.check_open()?;
        self.inner.write().commits += 1;
        Ok(())
    }

    fn num_docs(&self) -> IndexResult<usize> {
        self.check_open()?;
        Ok(self.inner.read().docs.len())
    }
}
