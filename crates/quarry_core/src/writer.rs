//! Index Writer: turns one transaction's row events into index effects.
//!
//! A writer is bound to one storage-engine transaction over one partition.
//! While [`WriterState::Open`] it accumulates `delete` and `index` events
//! in working memory. [`IndexWriter::finish`] then issues exactly one
//! upsert or delete per key that had pending state, reading the committed
//! row first when the pending image cannot decide on its own.
//!
//! ```text
//!   Open --delete/index--> Open --finish--> Finished
//! ```

use crate::error::{IndexError, IndexResult};
use crate::key::{ClusteringKey, ClusteringRange, DecoratedKey};
use crate::reader::PartitionRead;
use crate::row::Row;
use crate::service::IndexService;
use crate::types::{OpGroup, TransactionKind};
use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use tracing::{debug, warn};

/// Lifecycle of a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Receiving events.
    Open,
    /// `finish` was called; terminal.
    Finished,
}

/// A per-key failure that did not abort the transaction.
#[derive(Debug)]
pub struct KeyFailure {
    /// Row the failure applies to; `None` for the partition of a skinny
    /// table.
    pub clustering: Option<ClusteringKey>,
    /// What went wrong.
    pub error: IndexError,
}

/// Effects issued by [`IndexWriter::finish`].
#[derive(Debug, Default)]
pub struct FinishReport {
    /// Documents upserted.
    pub upserts: usize,
    /// Single-key deletes issued.
    pub deletes: usize,
    /// Range deletes issued.
    pub range_deletes: usize,
    /// Point reads performed before writing.
    pub reads: usize,
    /// Keys left in their prior state, or deleted after a mapper rejected
    /// them.
    pub failures: Vec<KeyFailure>,
}

impl FinishReport {
    /// Returns the number of single-key effects issued.
    pub fn effects(&self) -> usize {
        self.upserts + self.deletes
    }
}

#[derive(Debug)]
enum PendingRow {
    /// Last row image seen; `after_delete` is set when a delete of the
    /// same key preceded it in this transaction.
    Upsert { row: Row, after_delete: bool },
    Delete,
}

impl PendingRow {
    fn then_index(previous: Option<PendingRow>, row: Row) -> Self {
        let after_delete = match previous {
            Some(PendingRow::Delete) => true,
            Some(PendingRow::Upsert { after_delete, .. }) => after_delete,
            None => false,
        };
        PendingRow::Upsert { row, after_delete }
    }

    fn after_delete(&self) -> bool {
        match self {
            PendingRow::Upsert { after_delete, .. } => *after_delete,
            PendingRow::Delete => false,
        }
    }

    fn into_row(self) -> Option<Row> {
        match self {
            PendingRow::Upsert { row, .. } => Some(row),
            PendingRow::Delete => None,
        }
    }
}

#[derive(Debug, Default)]
struct WidePending {
    partition_deleted: bool,
    ranges: Vec<ClusteringRange>,
    static_row: Option<Row>,
    rows: BTreeMap<ClusteringKey, PendingRow>,
}

#[derive(Debug)]
enum Pending {
    Skinny(Option<PendingRow>),
    Wide(WidePending),
}

impl Default for Pending {
    fn default() -> Self {
        Pending::Skinny(None)
    }
}

/// Merges a committed row with the pending image, preferring the
/// committed row when the pending image carries nothing.
fn merge_pending(read: Option<Row>, pending: Option<Row>) -> Option<Row> {
    match (read, pending) {
        (None, pending) => pending,
        (Some(read), None) => Some(read),
        (Some(read), Some(pending)) if pending.is_empty() => Some(read),
        (Some(read), Some(pending)) => Some(Row::merge(&read, &pending)),
    }
}

/// Writer for one transaction over one partition.
///
/// Not shared between threads: the storage engine delivers a
/// transaction's events on one logical sequence.
#[derive(Debug)]
pub struct IndexWriter<'a> {
    service: &'a IndexService,
    key: DecoratedKey,
    now_in_sec: i64,
    op_group: OpGroup,
    kind: TransactionKind,
    state: WriterState,
    pending: Pending,
}

impl<'a> IndexWriter<'a> {
    pub(crate) fn new(
        service: &'a IndexService,
        key: DecoratedKey,
        now_in_sec: i64,
        op_group: OpGroup,
        kind: TransactionKind,
    ) -> Self {
        let pending = if service.is_wide() {
            Pending::Wide(WidePending::default())
        } else {
            Pending::Skinny(None)
        };
        Self {
            service,
            key,
            now_in_sec,
            op_group,
            kind,
            state: WriterState::Open,
            pending,
        }
    }

    /// Returns the partition key.
    pub fn key(&self) -> &DecoratedKey {
        &self.key
    }

    /// Returns the transaction kind.
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    fn ensure_open(&self) -> IndexResult<()> {
        match self.state {
            WriterState::Open => Ok(()),
            WriterState::Finished => Err(IndexError::invalid_operation(format!(
                "writer for {} already finished",
                self.key
            ))),
        }
    }

    /// Records a deletion of the whole partition.
    ///
    /// Pending rows are discarded.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error after `finish`.
    pub fn delete(&mut self) -> IndexResult<()> {
        self.ensure_open()?;
        match &mut self.pending {
            Pending::Skinny(pending) => *pending = Some(PendingRow::Delete),
            Pending::Wide(wide) => {
                *wide = WidePending {
                    partition_deleted: true,
                    ..WidePending::default()
                };
            }
        }
        Ok(())
    }

    /// Records a deletion of one wide row.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error on skinny tables or after
    /// `finish`.
    pub fn delete_row(&mut self, clustering: ClusteringKey) -> IndexResult<()> {
        self.ensure_open()?;
        match &mut self.pending {
            Pending::Wide(wide) => {
                wide.rows.insert(clustering, PendingRow::Delete);
                Ok(())
            }
            Pending::Skinny(_) => Err(IndexError::invalid_operation(
                "row deletes need a wide table",
            )),
        }
    }

    /// Records a range tombstone over wide rows.
    ///
    /// Pending rows inside the range are discarded.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error on skinny tables or after
    /// `finish`.
    pub fn delete_range(&mut self, range: ClusteringRange) -> IndexResult<()> {
        self.ensure_open()?;
        let service = self.service;
        match (&mut self.pending, service.key_mapper().clustering()) {
            (Pending::Wide(wide), Some(mapper)) => {
                wide.rows.retain(|ck, _| !range.contains(mapper, ck));
                wide.ranges.push(range);
                Ok(())
            }
            _ => Err(IndexError::invalid_operation(
                "range deletes need a wide table",
            )),
        }
    }

    /// Records a row image, replacing any earlier image of the same row.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error after `finish`, or for a wide
    /// table row that is neither static nor clustered.
    pub fn index(&mut self, row: Row) -> IndexResult<()> {
        self.ensure_open()?;
        match &mut self.pending {
            Pending::Skinny(pending) => {
                *pending = Some(PendingRow::then_index(pending.take(), row));
            }
            Pending::Wide(wide) if row.is_static() => wide.static_row = Some(row),
            Pending::Wide(wide) => {
                let clustering = row.clustering().cloned().ok_or_else(|| {
                    IndexError::invalid_operation("wide table rows need a clustering key")
                })?;
                let previous = wide.rows.remove(&clustering);
                wide.rows
                    .insert(clustering, PendingRow::then_index(previous, row));
            }
        }
        Ok(())
    }

    /// Applies the transaction's net effect and closes the writer.
    ///
    /// Cleanup transactions have no effect. Otherwise every key with
    /// pending state gets exactly one upsert or delete. A key whose row
    /// fails to decode or map is reported in [`FinishReport::failures`]
    /// without stopping the other keys.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error if called twice, and engine
    /// errors from the reader or the index, which abort the remaining keys.
    pub fn finish(&mut self) -> IndexResult<FinishReport> {
        self.ensure_open()?;
        self.state = WriterState::Finished;
        let pending = mem::take(&mut self.pending);
        let stats = self.service.stats();

        if self.kind.is_noop() {
            stats.record_cleanup_skipped();
            debug!(key = %self.key, kind = %self.kind, "finish skipped");
            return Ok(FinishReport::default());
        }

        let mut report = FinishReport::default();
        match pending {
            Pending::Skinny(pending) => self.finish_skinny(pending, &mut report)?,
            Pending::Wide(wide) => self.finish_wide(wide, &mut report)?,
        }
        stats.record_transaction_finished();
        debug!(
            key = %self.key,
            kind = %self.kind,
            upserts = report.upserts,
            deletes = report.deletes,
            range_deletes = report.range_deletes,
            reads = report.reads,
            failures = report.failures.len(),
            "transaction finished"
        );
        Ok(report)
    }

    fn finish_skinny(
        &self,
        pending: Option<PendingRow>,
        report: &mut FinishReport,
    ) -> IndexResult<()> {
        let Some(pending) = pending else {
            return Ok(());
        };
        let read_first = !pending.after_delete()
            && match &pending {
                PendingRow::Delete => self.kind.forces_read_before_write(),
                PendingRow::Upsert { row, .. } => {
                    self.kind.forces_read_before_write()
                        || self
                            .service
                            .needs_read_before_write(&self.key, row, self.now_in_sec)
                }
            };

        let read = if read_first {
            report.reads += 1;
            self.service.stats().record_read_before_write();
            self.service
                .read(&self.key, None, self.now_in_sec, self.op_group)?
        } else {
            None
        };
        let merged = merge_pending(read, pending.into_row());
        self.settle(report, None, merged, None)
    }

    fn finish_wide(&self, wide: WidePending, report: &mut FinishReport) -> IndexResult<()> {
        let mapper = self
            .service
            .key_mapper()
            .clustering()
            .ok_or_else(|| IndexError::invalid_operation("wide writer on a skinny table"))?;

        if wide.partition_deleted {
            self.service.delete(&self.key)?;
            report.deletes += 1;
        }
        for range in &wide.ranges {
            self.service.delete_range(&self.key, range)?;
            report.range_deletes += 1;
        }

        let covered = |clustering: &ClusteringKey| {
            wide.partition_deleted || wide.ranges.iter().any(|r| r.contains(mapper, clustering))
        };
        let mut rows: Vec<(ClusteringKey, PendingRow)> = wide.rows.into_iter().collect();
        rows.sort_by(|a, b| mapper.compare(&a.0, &b.0));

        let to_read: Vec<ClusteringKey> = rows
            .iter()
            .filter(|(clustering, pending)| {
                !pending.after_delete()
                    && !covered(clustering)
                    && match pending {
                        PendingRow::Delete => self.kind.forces_read_before_write(),
                        PendingRow::Upsert { row, .. } => {
                            self.kind.forces_read_before_write()
                                || self.service.needs_read_before_write_wide(
                                    &self.key,
                                    wide.static_row.as_ref(),
                                    row,
                                    self.now_in_sec,
                                )
                        }
                    }
            })
            .map(|(clustering, _)| clustering.clone())
            .collect();

        // A changed mapped static column is part of every row's document.
        let reindex_statics = !wide.partition_deleted
            && wide
                .static_row
                .as_ref()
                .is_some_and(|s| self.service.touches_mapped_statics(s));

        let read = if reindex_statics || !to_read.is_empty() {
            report.reads += 1;
            self.service.stats().record_read_before_write();
            let clusterings = (!reindex_statics).then_some(to_read.as_slice());
            self.service
                .read_rows(&self.key, clusterings, self.now_in_sec, self.op_group)?
        } else {
            None
        };
        let read = read.unwrap_or_default();
        let to_read: BTreeSet<ClusteringKey> = to_read.into_iter().collect();

        let static_row = if wide.partition_deleted {
            wide.static_row
        } else {
            merge_pending(read.static_row.clone(), wide.static_row)
        };

        let mut touched = BTreeSet::new();
        for (clustering, pending) in rows {
            let committed = if to_read.contains(&clustering) {
                read.row(&clustering).cloned()
            } else {
                None
            };
            let merged = merge_pending(committed, pending.into_row());
            self.settle(report, Some(&clustering), merged, static_row.as_ref())?;
            touched.insert(clustering);
        }

        if reindex_statics {
            self.reindex_rows(&read, &touched, &covered, static_row.as_ref(), report)?;
        }
        Ok(())
    }

    /// Re-indexes committed rows not otherwise touched, after a change to
    /// a mapped static column.
    fn reindex_rows(
        &self,
        read: &PartitionRead,
        touched: &BTreeSet<ClusteringKey>,
        covered: &dyn Fn(&ClusteringKey) -> bool,
        static_row: Option<&Row>,
        report: &mut FinishReport,
    ) -> IndexResult<()> {
        for row in &read.rows {
            let Some(clustering) = row.clustering() else {
                continue;
            };
            if touched.contains(clustering) || covered(clustering) {
                continue;
            }
            self.settle(report, Some(clustering), Some(row.clone()), static_row)?;
        }
        Ok(())
    }

    /// Issues the single effect for one key.
    fn settle(
        &self,
        report: &mut FinishReport,
        clustering: Option<&ClusteringKey>,
        merged: Option<Row>,
        static_row: Option<&Row>,
    ) -> IndexResult<()> {
        let live = merged.filter(|row| row.has_live_data(self.now_in_sec));
        let result = match (&live, clustering) {
            (Some(row), _) => self
                .service
                .upsert(&self.key, row, static_row, self.now_in_sec),
            (None, Some(clustering)) => self.service.delete_row(&self.key, clustering).map(drop),
            (None, None) => self.service.delete(&self.key).map(drop),
        };

        match result {
            Ok(()) if live.is_some() => report.upserts += 1,
            Ok(()) => report.deletes += 1,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                if matches!(err, IndexError::MapperAssembly { .. }) {
                    report.deletes += 1;
                }
                warn!(
                    key = %self.key,
                    clustering = ?clustering.map(ToString::to_string),
                    error = %err,
                    "key left out of transaction"
                );
                report.failures.push(KeyFailure {
                    clustering: clustering.cloned(),
                    error: err,
                });
            }
        }
        Ok(())
    }
}

impl Drop for IndexWriter<'_> {
    fn drop(&mut self) {
        if self.state == WriterState::Open {
            let discarded = match &self.pending {
                Pending::Skinny(pending) => usize::from(pending.is_some()),
                Pending::Wide(wide) => {
                    wide.rows.len()
                        + wide.ranges.len()
                        + usize::from(wide.partition_deleted || wide.static_row.is_some())
                }
            };
            if discarded > 0 {
                warn!(key = %self.key, discarded, "writer dropped without finish");
            }
        }
    }
}
