//! Shared fixtures for unit tests.

use crate::backend::MemoryIndex;
use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::key::{ClusteringKey, DecoratedKey};
use crate::mapper::IndexSchema;
use crate::reader::{PartitionRead, RowReader};
use crate::row::{Cell, LivenessInfo, Row};
use crate::schema::TableSchema;
use crate::service::IndexService;
use crate::types::OpGroup;
use bytes::Bytes;
use parking_lot::Mutex;
use quarry_codec::{encode, CellType, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) const NOW: i64 = 1_700_000_000;

/// Reader over a fixed map of partitions.
#[derive(Default)]
pub(crate) struct MapReader {
    partitions: Mutex<HashMap<Bytes, PartitionRead>>,
    reads: AtomicUsize,
    fail: AtomicBool,
}

impl MapReader {
    pub(crate) fn put(&self, key: &DecoratedKey, read: PartitionRead) {
        self.partitions.lock().insert(key.key().clone(), read);
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl RowReader for MapReader {
    fn read_partition(
        &self,
        key: &DecoratedKey,
        clusterings: Option<&[ClusteringKey]>,
        _now_in_sec: i64,
        _op_group: OpGroup,
    ) -> IndexResult<Option<PartitionRead>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(IndexError::engine_io("reader unavailable"));
        }
        let partitions = self.partitions.lock();
        let Some(read) = partitions.get(key.key()) else {
            return Ok(None);
        };
        let rows = match clusterings {
            Some(wanted) => read
                .rows
                .iter()
                .filter(|r| r.clustering().is_some_and(|c| wanted.contains(c)))
                .cloned()
                .collect(),
            None => read.rows.clone(),
        };
        Ok(Some(PartitionRead {
            static_row: read.static_row.clone(),
            rows,
        }))
    }
}

pub(crate) fn skinny_table() -> TableSchema {
    TableSchema::new("ks", "users")
        .partition_key("id", CellType::Text)
        .regular("a", CellType::Int)
        .regular("name", CellType::Text)
        .regular("tags", CellType::set(CellType::Text))
}

pub(crate) fn wide_table() -> TableSchema {
    TableSchema::new("ks", "events")
        .partition_key("device", CellType::Text)
        .clustering("seq", CellType::Int)
        .regular("a", CellType::Int)
        .static_column("owner", CellType::Text)
}

pub(crate) struct Harness {
    pub(crate) service: IndexService,
    pub(crate) backend: Arc<MemoryIndex>,
    pub(crate) reader: Arc<MapReader>,
}

pub(crate) fn harness(table: TableSchema, fields: &str, config: IndexConfig) -> Harness {
    let schema = IndexSchema::from_json(fields, &table).unwrap();
    let backend = Arc::new(MemoryIndex::new());
    let reader = Arc::new(MapReader::default());
    let service = IndexService::new(
        table,
        schema,
        config,
        backend.clone(),
        reader.clone(),
    )
    .unwrap();
    Harness {
        service,
        backend,
        reader,
    }
}

pub(crate) fn int(n: i64) -> Vec<u8> {
    encode(&CellType::Int, &Value::Integer(n)).unwrap()
}

pub(crate) fn text(s: &str) -> Vec<u8> {
    encode(&CellType::Text, &Value::from(s)).unwrap()
}

pub(crate) fn ck(seq: i64) -> ClusteringKey {
    ClusteringKey::from_components(&[int(seq)]).unwrap()
}

/// A full skinny row with `a` set.
pub(crate) fn row_a(a: i64, timestamp: i64) -> Row {
    Row::new()
        .with_liveness(LivenessInfo::new(timestamp))
        .with_cell(Cell::live("a", int(a), timestamp))
        .with_cell(Cell::live("name", text("n"), timestamp))
}

/// A wide row with `a` set.
pub(crate) fn wide_row(seq: i64, a: i64, timestamp: i64) -> Row {
    Row::clustered(ck(seq))
        .with_liveness(LivenessInfo::new(timestamp))
        .with_cell(Cell::live("a", int(a), timestamp))
}
