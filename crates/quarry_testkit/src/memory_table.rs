//! In-memory stand-in for the storage engine's table.
//!
//! Writes are applied at a sequence number. A read under [`OpGroup`] `g`
//! folds every write with a sequence lower than `g`, so a writer's
//! read-before-write sees committed data and never its own mutation.

use bytes::Bytes;
use parking_lot::RwLock;
use quarry_core::key::ClusteringMapper;
use quarry_core::{
    ClusteringKey, DecoratedKey, IndexResult, OpGroup, PartitionRead, Row, RowReader, TableSchema,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// One mutation of a partition.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// A row image (skinny, clustered or static).
    Row(Row),
    /// A partition-level deletion at a write timestamp.
    DeletePartition(i64),
}

#[derive(Debug, Default)]
struct Partition {
    versions: Vec<(u64, Mutation)>,
}

impl Partition {
    fn read(
        &self,
        op_group: OpGroup,
        now_in_sec: i64,
        clusterings: Option<&[ClusteringKey]>,
    ) -> PartitionRead {
        let mut deletion: Option<i64> = None;
        let mut static_row: Option<Row> = None;
        let mut rows: BTreeMap<Option<ClusteringKey>, Row> = BTreeMap::new();

        let mut visible: Vec<&(u64, Mutation)> = self
            .versions
            .iter()
            .filter(|(seq, _)| op_group.observes(*seq))
            .collect();
        visible.sort_by_key(|(seq, _)| *seq);

        for (_, mutation) in visible {
            match mutation {
                Mutation::DeletePartition(ts) => deletion = deletion.max(Some(*ts)),
                Mutation::Row(row) if row.is_static() => {
                    static_row = Some(match static_row.take() {
                        Some(old) => Row::merge(&old, row),
                        None => row.clone(),
                    });
                }
                Mutation::Row(row) => {
                    let slot = row.clustering().cloned();
                    let merged = match rows.remove(&slot) {
                        Some(old) => Row::merge(&old, row),
                        None => row.clone(),
                    };
                    rows.insert(slot, merged);
                }
            }
        }

        let shadow = |row: Row| match deletion {
            Some(ts) => {
                let marker = match row.clustering() {
                    Some(ck) => Row::clustered(ck.clone()),
                    None if row.is_static() => Row::static_row(),
                    None => Row::new(),
                };
                Row::merge(&marker.with_deletion(ts), &row)
            }
            None => row,
        };

        PartitionRead {
            static_row: static_row
                .map(shadow)
                .filter(|r| r.has_live_data(now_in_sec)),
            rows: rows
                .into_iter()
                .filter(|(slot, _)| match (clusterings, slot) {
                    (Some(wanted), Some(ck)) => wanted.contains(ck),
                    _ => true,
                })
                .map(|(_, row)| shadow(row))
                .filter(|r| r.has_live_data(now_in_sec))
                .collect(),
        }
    }
}

/// Versioned in-memory table implementing [`RowReader`].
#[derive(Debug)]
pub struct MemoryTable {
    clustering: Option<ClusteringMapper>,
    partitions: RwLock<HashMap<Bytes, Partition>>,
    next_seq: AtomicU64,
    reads: AtomicUsize,
}

impl MemoryTable {
    /// Creates an empty table for `schema`.
    pub fn new(schema: &TableSchema) -> Self {
        Self {
            clustering: ClusteringMapper::new(schema),
            partitions: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            reads: AtomicUsize::new(0),
        }
    }

    /// Reserves the next write sequence.
    ///
    /// The returned group is the one a writer indexing this write carries:
    /// reads under it see every earlier write but not this one.
    pub fn next_op_group(&self) -> OpGroup {
        OpGroup::new(self.next_seq.fetch_add(1, Ordering::SeqCst))
    }

    /// Applies `mutations` to `key` at the sequence of `op_group`.
    pub fn apply(&self, key: &DecoratedKey, op_group: OpGroup, mutations: Vec<Mutation>) {
        let mut partitions = self.partitions.write();
        let partition = partitions.entry(key.key().clone()).or_default();
        partition
            .versions
            .extend(mutations.into_iter().map(|m| (op_group.as_u64(), m)));
    }

    /// Reserves a sequence and applies `mutations` at it.
    pub fn write(&self, key: &DecoratedKey, mutations: Vec<Mutation>) -> OpGroup {
        let op_group = self.next_op_group();
        self.apply(key, op_group, mutations);
        op_group
    }

    /// Returns the number of partition reads served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Returns the latest state of `key`, as a read after every write would.
    pub fn snapshot(&self, key: &DecoratedKey, now_in_sec: i64) -> PartitionRead {
        let op_group = OpGroup::new(self.next_seq.load(Ordering::SeqCst));
        self.partitions
            .read()
            .get(key.key())
            .map(|p| self.ordered(p.read(op_group, now_in_sec, None)))
            .unwrap_or_default()
    }

    fn ordered(&self, mut read: PartitionRead) -> PartitionRead {
        if let Some(mapper) = &self.clustering {
            read.rows.sort_by(|a, b| match (a.clustering(), b.clustering()) {
                (Some(x), Some(y)) => mapper.compare(x, y),
                (x, y) => x.cmp(&y),
            });
        }
        read
    }
}

impl RowReader for MemoryTable {
    fn read_partition(
        &self,
        key: &DecoratedKey,
        clusterings: Option<&[ClusteringKey]>,
        now_in_sec: i64,
        op_group: OpGroup,
    ) -> IndexResult<Option<PartitionRead>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let partitions = self.partitions.read();
        let read = partitions
            .get(key.key())
            .map(|p| self.ordered(p.read(op_group, now_in_sec, clusterings)))
            .filter(|r| !r.is_empty());
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ck, int, text, wide_row, wide_table};
    use quarry_core::key::Partitioner;
    use quarry_core::{Cell, LivenessInfo, PartitionerKind};

    fn key(s: &str) -> DecoratedKey {
        PartitionerKind::Ordered.build().decorate(Bytes::from(text(s)))
    }

    #[test]
    fn reads_observe_only_earlier_writes() {
        let table = MemoryTable::new(&wide_table());
        let p = key("p");
        let first = table.write(&p, vec![Mutation::Row(wide_row(1, 10, 1))]);
        let second = table.write(&p, vec![Mutation::Row(wide_row(2, 20, 2))]);

        let seen = table.read_partition(&p, None, 0, first).unwrap();
        assert!(seen.is_none());

        let seen = table.read_partition(&p, None, 0, second).unwrap().unwrap();
        assert_eq!(seen.rows.len(), 1);
        assert_eq!(seen.rows[0].clustering(), Some(&ck(1)));
    }

    #[test]
    fn partition_deletion_shadows_older_rows() {
        let table = MemoryTable::new(&wide_table());
        let p = key("p");
        table.write(&p, vec![Mutation::Row(wide_row(1, 10, 1))]);
        table.write(&p, vec![Mutation::DeletePartition(5)]);
        table.write(&p, vec![Mutation::Row(wide_row(2, 20, 6))]);

        let read = table.snapshot(&p, 0);
        assert_eq!(read.rows.len(), 1);
        assert_eq!(read.rows[0].clustering(), Some(&ck(2)));
    }

    #[test]
    fn rows_are_merged_and_ordered() {
        let table = MemoryTable::new(&wide_table());
        let p = key("p");
        table.write(&p, vec![Mutation::Row(wide_row(3, 1, 1)), Mutation::Row(wide_row(-1, 1, 1))]);
        table.write(
            &p,
            vec![Mutation::Row(
                Row::clustered(ck(3)).with_cell(Cell::live("a", int(9), 2)),
            )],
        );
        let read = table.snapshot(&p, 0);
        let order: Vec<_> = read.rows.iter().filter_map(|r| r.clustering().cloned()).collect();
        assert_eq!(order, vec![ck(-1), ck(3)]);
        assert_eq!(read.rows[1].liveness(), Some(&LivenessInfo::new(1)));
        assert_eq!(read.rows[1].cells().len(), 1);
    }
}
