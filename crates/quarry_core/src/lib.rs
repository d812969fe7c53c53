//! # Quarry Core
//!
//! Indexing write path of the Quarry secondary index.
//!
//! The storage engine reports every write, deletion, compaction and repair
//! of a table's partitions. This crate turns those events into documents
//! in a full-text index so that each indexed row has exactly one document
//! reflecting its latest live content. It provides:
//! - Key mapping between partition/clustering keys and index fields
//! - Column projection of row cells into typed column values
//! - Document assembly through configurable field mappers
//! - The per-transaction [`IndexWriter`] and the per-table [`IndexService`]
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use quarry_codec::{encode, CellType, Value};
//! use quarry_core::{
//!     Cell, ClusteringKey, DecoratedKey, IndexConfig, IndexResult, IndexSchema, IndexService,
//!     LivenessInfo, MemoryIndex, OpGroup, PartitionRead, Row, RowReader, TableSchema,
//!     TransactionKind,
//! };
//!
//! struct NoRows;
//!
//! impl RowReader for NoRows {
//!     fn read_partition(
//!         &self,
//!         _key: &DecoratedKey,
//!         _clusterings: Option<&[ClusteringKey]>,
//!         _now_in_sec: i64,
//!         _op_group: OpGroup,
//!     ) -> IndexResult<Option<PartitionRead>> {
//!         Ok(None)
//!     }
//! }
//!
//! let table = TableSchema::new("shop", "users")
//!     .partition_key("id", CellType::Text)
//!     .regular("age", CellType::Int);
//! let schema = IndexSchema::from_json(r#"{"fields": {"age": {"type": "integer"}}}"#, &table)?;
//! let service = IndexService::new(
//!     table,
//!     schema,
//!     IndexConfig::default(),
//!     Arc::new(MemoryIndex::new()),
//!     Arc::new(NoRows),
//! )?;
//!
//! let key = service.decorate(encode(&CellType::Text, &Value::from("ana"))?);
//! let row = Row::new()
//!     .with_liveness(LivenessInfo::new(1))
//!     .with_cell(Cell::live("age", encode(&CellType::Int, &Value::Integer(33))?, 1));
//!
//! let mut writer = service.writer(key, 1_700_000_000, OpGroup::new(1), TransactionKind::Update);
//! writer.index(row)?;
//! let report = writer.finish()?;
//! assert_eq!(report.upserts, 1);
//! assert_eq!(service.num_docs()?, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod columns;
pub mod config;
pub mod document;
pub mod error;
pub mod key;
pub mod mapper;
pub mod projector;
pub mod reader;
pub mod row;
pub mod schema;
pub mod service;
pub mod stats;
pub mod types;
pub mod writer;

#[cfg(test)]
mod testing;

pub use backend::{IndexBackend, MemoryIndex, Query, Term};
pub use columns::{Column, Columns};
pub use config::{IndexConfig, IndexOptions, ReadBeforeWrite};
pub use document::{Document, DocumentAssembler, Field, FieldValue};
pub use error::{IndexError, IndexResult};
pub use key::{
    ClusteringKey, ClusteringRange, DecoratedKey, KeyMapper, PartitionerKind, Token,
};
pub use mapper::{IndexSchema, IndexSchemaOptions, MapperOptions};
pub use projector::{ColumnProjector, Projection};
pub use reader::{PartitionRead, RowReader};
pub use row::{Cell, LivenessInfo, Row};
pub use schema::{ColumnDef, ColumnKind, TableSchema};
pub use service::{IndexService, SearchHit};
pub use stats::{IndexStats, StatsSnapshot};
pub use types::{OpGroup, TransactionKind};
pub use writer::{FinishReport, IndexWriter, KeyFailure, WriterState};
