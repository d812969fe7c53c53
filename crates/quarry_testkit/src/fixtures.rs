//! Test fixtures: tables, encoded values, rows and a wired-up index.
//!
//! [`TestIndex`] couples an [`IndexService`] with a [`MemoryTable`] and a
//! [`RecordingBackend`], so a test can drive the write path the way the
//! storage engine does: apply a mutation, then index it under the same
//! operation group.

use crate::memory_table::{MemoryTable, Mutation};
use crate::recording::RecordingBackend;
use quarry_codec::{encode, CellType, Value};
use quarry_core::{
    Cell, ClusteringKey, DecoratedKey, FinishReport, IndexConfig, IndexResult, IndexSchema,
    IndexService, LivenessInfo, Row, TableSchema, TransactionKind,
};
use std::sync::Arc;

/// Wall clock used by fixtures, in seconds.
pub const NOW: i64 = 1_700_000_000;

/// Encodes an `int` cell value.
pub fn int(n: i64) -> Vec<u8> {
    encode(&CellType::Int, &Value::Integer(n)).expect("int in range")
}

/// Encodes a `text` cell value.
pub fn text(s: &str) -> Vec<u8> {
    encode(&CellType::Text, &Value::from(s)).expect("valid text")
}

/// Builds a single-component `int` clustering key.
pub fn ck(seq: i64) -> ClusteringKey {
    ClusteringKey::from_components(&[int(seq)]).expect("short key")
}

/// Skinny table: `id text` partition key, regular `a int`, `name text`
/// and `tags set<text>`.
pub fn skinny_table() -> TableSchema {
    TableSchema::new("ks", "users")
        .partition_key("id", CellType::Text)
        .regular("a", CellType::Int)
        .regular("name", CellType::Text)
        .regular("tags", CellType::set(CellType::Text))
}

/// Wide table: `device text` partition key, `seq int` clustering, regular
/// `a int` and static `owner text`.
pub fn wide_table() -> TableSchema {
    TableSchema::new("ks", "events")
        .partition_key("device", CellType::Text)
        .clustering("seq", CellType::Int)
        .regular("a", CellType::Int)
        .static_column("owner", CellType::Text)
}

/// Full skinny row image with `a` and `name`.
pub fn skinny_row(a: i64, name: &str, timestamp: i64) -> Row {
    Row::new()
        .with_liveness(LivenessInfo::new(timestamp))
        .with_cell(Cell::live("a", int(a), timestamp))
        .with_cell(Cell::live("name", text(name), timestamp))
}

/// Wide row image with `a`.
pub fn wide_row(seq: i64, a: i64, timestamp: i64) -> Row {
    Row::clustered(ck(seq))
        .with_liveness(LivenessInfo::new(timestamp))
        .with_cell(Cell::live("a", int(a), timestamp))
}

/// Static row image with `owner`.
pub fn static_row(owner: &str, timestamp: i64) -> Row {
    Row::static_row().with_cell(Cell::live("owner", text(owner), timestamp))
}

/// An index over an in-memory table, wired the way the engine wires it.
pub struct TestIndex {
    /// The service under test.
    pub service: IndexService,
    /// Committed table data.
    pub table: Arc<MemoryTable>,
    /// The index, with a record of every call.
    pub backend: Arc<RecordingBackend>,
}

impl TestIndex {
    /// Creates an index over `schema` with `fields` as the JSON mapping.
    pub fn new(schema: TableSchema, fields: &str) -> Self {
        Self::with_config(schema, fields, IndexConfig::default())
    }

    /// Creates an index with an explicit configuration.
    pub fn with_config(schema: TableSchema, fields: &str, config: IndexConfig) -> Self {
        let index_schema = IndexSchema::from_json(fields, &schema).expect("valid mapping");
        let table = Arc::new(MemoryTable::new(&schema));
        let backend = Arc::new(RecordingBackend::new());
        let service = IndexService::new(
            schema,
            index_schema,
            config,
            backend.clone(),
            table.clone(),
        )
        .expect("valid table");
        Self {
            service,
            table,
            backend,
        }
    }

    /// Decorates a text partition key.
    pub fn key(&self, s: &str) -> DecoratedKey {
        self.service.decorate(text(s))
    }

    /// Commits `mutations` to the table and indexes them in one
    /// transaction of `kind`.
    ///
    /// # Errors
    ///
    /// Returns whatever the writer's `finish` returns.
    pub fn transact(
        &self,
        key: &DecoratedKey,
        kind: TransactionKind,
        mutations: Vec<Mutation>,
    ) -> IndexResult<FinishReport> {
        let op_group = self.table.write(key, mutations.clone());
        let mut writer = self.service.writer(key.clone(), NOW, op_group, kind);
        for mutation in mutations {
            match mutation {
                Mutation::Row(row) => writer.index(row)?,
                Mutation::DeletePartition(_) => writer.delete()?,
            }
        }
        writer.finish()
    }

    /// Shorthand for an update transaction.
    ///
    /// # Errors
    ///
    /// Returns whatever the writer's `finish` returns.
    pub fn update(&self, key: &DecoratedKey, mutations: Vec<Mutation>) -> IndexResult<FinishReport> {
        self.transact(key, TransactionKind::Update, mutations)
    }
}

impl std::ops::Deref for TestIndex {
    type Target = IndexService;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}
