//! Index backend that records every mutation it receives.

use parking_lot::Mutex;
use quarry_core::{Document, IndexBackend, IndexError, IndexResult, MemoryIndex, Query, Term};
use std::sync::atomic::{AtomicBool, Ordering};

/// A mutating call made on the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `upsert` with the term the document replaced.
    Upsert(Term),
    /// `delete` of a term.
    Delete(Term),
    /// `delete_by_query`.
    DeleteByQuery(Query),
}

impl BackendCall {
    /// Returns the term of a single-key call.
    pub fn term(&self) -> Option<&Term> {
        match self {
            Self::Upsert(term) | Self::Delete(term) => Some(term),
            Self::DeleteByQuery(_) => None,
        }
    }
}

/// A [`MemoryIndex`] that records calls and can be made to fail.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    inner: MemoryIndex,
    calls: Mutex<Vec<BackendCall>>,
    failing: AtomicBool,
}

impl RecordingBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index behind the recorder.
    pub fn index(&self) -> &MemoryIndex {
        &self.inner
    }

    /// Returns every recorded call, oldest first.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded single-key calls for `term`.
    pub fn calls_for(&self, term: &Term) -> Vec<BackendCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.term() == Some(term))
            .cloned()
            .collect()
    }

    /// Forgets recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Makes every subsequent call fail with an engine error, or stop
    /// failing.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> IndexResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(IndexError::engine_io("injected failure"))
        } else {
            Ok(())
        }
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }
}

impl IndexBackend for RecordingBackend {
    fn upsert(&self, term: &Term, document: Document) -> IndexResult<()> {
        self.check()?;
        self.record(BackendCall::Upsert(term.clone()));
        self.inner.upsert(term, document)
    }

    fn delete(&self, term: &Term) -> IndexResult<usize> {
        self.check()?;
        self.record(BackendCall::Delete(term.clone()));
        self.inner.delete(term)
    }

    fn delete_by_query(&self, query: &Query) -> IndexResult<usize> {
        self.check()?;
        self.record(BackendCall::DeleteByQuery(query.clone()));
        self.inner.delete_by_query(query)
    }

    fn get(&self, term: &Term) -> IndexResult<Option<Document>> {
        self.check()?;
        self.inner.get(term)
    }

    fn search(&self, query: &Query, limit: usize) -> IndexResult<Vec<Document>> {
        self.check()?;
        self.inner.search(query, limit)
    }

    fn commit(&self) -> IndexResult<()> {
        self.check()?;
        self.inner.commit()
    }

    fn num_docs(&self) -> IndexResult<usize> {
        self.check()?;
        self.inner.num_docs()
    }
}
