//! Index write path statistics.
//!
//! # Usage
//!
//! ```rust,ignore
//! let service = IndexService::new(table, schema, config, backend, reader)?;
//!
//! // Apply transactions...
//!
//! let stats = service.stats().snapshot();
//! println!("Upserts: {}", stats.upserts);
//! println!("Reads before write: {}", stats.reads_before_write);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one index.
///
/// All counters are atomic and can be read while writers are running.
#[derive(Debug, Default)]
pub struct IndexStats {
    // Effects
    /// Documents upserted.
    upserts: AtomicU64,
    /// Delete calls issued for single keys.
    deletes: AtomicU64,
    /// Range deletes issued for wide partitions.
    range_deletes: AtomicU64,

    // Decisions
    /// Point reads performed before writing.
    reads_before_write: AtomicU64,
    /// Transactions finished with side effects.
    transactions_finished: AtomicU64,
    /// Cleanup transactions finished without side effects.
    cleanups_skipped: AtomicU64,

    // Errors
    /// Rows not indexed because a validated mapper failed.
    rejected_rows: AtomicU64,
    /// Columns dropped because their cells did not decode.
    dropped_columns: AtomicU64,
    /// Keys whose bytes did not match the schema.
    key_errors: AtomicU64,
    /// Failures of the underlying index.
    engine_errors: AtomicU64,
}

impl IndexStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    pub(crate) fn record_upsert(&self) {
        self.upserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_range_delete(&self) {
        self.range_deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read_before_write(&self) {
        self.reads_before_write.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_finished(&self) {
        self.transactions_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cleanup_skipped(&self) {
        self.cleanups_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_row(&self) {
        self.rejected_rows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_columns(&self, count: u64) {
        self.dropped_columns.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_key_error(&self) {
        self.key_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_engine_error(&self) {
        self.engine_errors.fetch_add(1, Ordering::Relaxed);
    }

    // === Getter methods (public API) ===

    /// Returns the number of documents upserted.
    pub fn upserts(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    /// Returns the number of single-key deletes issued.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Returns the number of range deletes issued.
    pub fn range_deletes(&self) -> u64 {
        self.range_deletes.load(Ordering::Relaxed)
    }

    /// Returns the number of point reads performed before writing.
    ///
    /// A high ratio to upserts means updates rarely carry whole rows.
    pub fn reads_before_write(&self) -> u64 {
        self.reads_before_write.load(Ordering::Relaxed)
    }

    /// Returns the number of transactions finished with side effects.
    pub fn transactions_finished(&self) -> u64 {
        self.transactions_finished.load(Ordering::Relaxed)
    }

    /// Returns the number of cleanup transactions skipped.
    pub fn cleanups_skipped(&self) -> u64 {
        self.cleanups_skipped.load(Ordering::Relaxed)
    }

    /// Returns the number of rows rejected by validated mappers.
    pub fn rejected_rows(&self) -> u64 {
        self.rejected_rows.load(Ordering::Relaxed)
    }

    /// Returns the number of columns dropped while projecting.
    pub fn dropped_columns(&self) -> u64 {
        self.dropped_columns.load(Ordering::Relaxed)
    }

    /// Returns the number of key decoding failures.
    pub fn key_errors(&self) -> u64 {
        self.key_errors.load(Ordering::Relaxed)
    }

    /// Returns the number of index engine failures.
    pub fn engine_errors(&self) -> u64 {
        self.engine_errors.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            upserts: self.upserts(),
            deletes: self.deletes(),
            range_deletes: self.range_deletes(),
            reads_before_write: self.reads_before_write(),
            transactions_finished: self.transactions_finished(),
            cleanups_skipped: self.cleanups_skipped(),
            rejected_rows: self.rejected_rows(),
            dropped_columns: self.dropped_columns(),
            key_errors: self.key_errors(),
            engine_errors: self.engine_errors(),
        }
    }
}

/// A point-in-time copy of [`IndexStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Documents upserted.
    pub upserts: u64,
    /// Single-key deletes issued.
    pub deletes: u64,
    /// Range deletes issued.
    pub range_deletes: u64,
    /// Point reads performed before writing.
    pub reads_before_write: u64,
    /// Transactions finished with side effects.
    pub transactions_finished: u64,
    /// Cleanup transactions skipped.
    pub cleanups_skipped: u64,
    /// Rows rejected by validated mappers.
    pub rejected_rows: u64,
    /// Columns dropped while projecting.
    pub dropped_columns: u64,
    /// Key decoding failures.
    pub key_errors: u64,
    /// Index engine failures.
    pub engine_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = IndexStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_effects() {
        let stats = IndexStats::new();
        stats.record_upsert();
        stats.record_upsert();
        stats.record_delete();
        stats.record_read_before_write();
        stats.record_dropped_columns(3);

        let snap = stats.snapshot();
        assert_eq!(snap.upserts, 2);
        assert_eq!(snap.deletes, 1);
        assert_eq!(snap.reads_before_write, 1);
        assert_eq!(snap.dropped_columns, 3);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(IndexStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_upsert();
                        s.record_engine_error();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.upserts(), 800);
        assert_eq!(stats.engine_errors(), 800);
    }
}
