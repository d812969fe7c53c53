//! Index Service: the per-table facade over the index backend.

use crate::backend::{IndexBackend, Query};
use crate::config::{IndexConfig, IndexOptions, ReadBeforeWrite};
use crate::document::{Document, DocumentAssembler};
use crate::error::{IndexError, IndexResult};
use crate::key::{ClusteringKey, ClusteringRange, DecoratedKey, KeyMapper, KeySort};
use crate::mapper::IndexSchema;
use crate::projector::ColumnProjector;
use crate::reader::{PartitionRead, RowReader};
use crate::row::Row;
use crate::schema::{ColumnKind, TableSchema};
use crate::stats::IndexStats;
use crate::types::{OpGroup, TransactionKind};
use crate::writer::IndexWriter;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A search result resolved to the row it was built from.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Partition key.
    pub key: DecoratedKey,
    /// Clustering key, for wide tables.
    pub clustering: Option<ClusteringKey>,
    /// The indexed document.
    pub document: Document,
}

/// Owns the index of one table and exposes the primitives writers use.
///
/// All methods take `&self` and are safe to call from concurrent writers
/// of distinct partitions. Calls for the same key are applied in arrival
/// order by the backend.
pub struct IndexService {
    table: Arc<TableSchema>,
    config: IndexConfig,
    projector: ColumnProjector,
    assembler: DocumentAssembler,
    sort: KeySort,
    backend: Arc<dyn IndexBackend>,
    reader: Arc<dyn RowReader>,
    stats: IndexStats,
    mapped_regular: BTreeSet<String>,
    mapped_static: BTreeSet<String>,
    maps_multi_cell: bool,
}

impl IndexService {
    /// Creates the service for `table`.
    ///
    /// # Errors
    ///
    /// Returns an invalid schema error if the table has no partition key.
    pub fn new(
        table: TableSchema,
        index_schema: IndexSchema,
        config: IndexConfig,
        backend: Arc<dyn IndexBackend>,
        reader: Arc<dyn RowReader>,
    ) -> IndexResult<Self> {
        let keys = KeyMapper::new(&table, config.partitioner.build())?;
        let mapped_of = |kind: ColumnKind| -> BTreeSet<String> {
            index_schema
                .mapped_columns()
                .iter()
                .filter(|c| table.column(c).is_some_and(|def| def.kind == kind))
                .cloned()
                .collect()
        };
        let mapped_regular = mapped_of(ColumnKind::Regular);
        let mapped_static = mapped_of(ColumnKind::Static);
        let maps_multi_cell = index_schema.maps_multi_cell();

        debug!(
            keyspace = table.keyspace(),
            table = table.table(),
            wide = keys.is_wide(),
            fields = index_schema.mappers().len(),
            partitioner = keys.partition().partitioner().name(),
            "index service created"
        );

        let table = Arc::new(table);
        Ok(Self {
            projector: ColumnProjector::new(Arc::clone(&table)),
            sort: keys.sort(),
            assembler: DocumentAssembler::new(keys, Arc::new(index_schema)),
            table,
            config,
            backend,
            reader,
            stats: IndexStats::new(),
            mapped_regular,
            mapped_static,
            maps_multi_cell,
        })
    }

    /// Creates the service from declarative index options.
    ///
    /// # Errors
    ///
    /// Returns an invalid schema error if the options do not fit the table.
    pub fn from_options(
        table: TableSchema,
        options: &IndexOptions,
        backend: Arc<dyn IndexBackend>,
        reader: Arc<dyn RowReader>,
    ) -> IndexResult<Self> {
        let schema = IndexSchema::build(&options.schema, &table)?;
        Self::new(table, schema, options.config(), backend, reader)
    }

    /// Returns the table schema.
    pub fn table(&self) -> &TableSchema {
        &self.table
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Returns the key mapper.
    pub fn key_mapper(&self) -> &KeyMapper {
        self.assembler.key_mapper()
    }

    /// Returns the field mapping schema.
    pub fn index_schema(&self) -> &IndexSchema {
        self.assembler.schema()
    }

    /// Returns the statistics.
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Returns true for wide tables.
    pub fn is_wide(&self) -> bool {
        self.key_mapper().is_wide()
    }

    /// Decorates raw partition key bytes with their token.
    pub fn decorate(&self, key: impl Into<Bytes>) -> DecoratedKey {
        self.key_mapper().partition().decorate(key)
    }

    /// Opens a writer for one transaction over `key`.
    pub fn writer(
        &self,
        key: DecoratedKey,
        now_in_sec: i64,
        op_group: OpGroup,
        kind: TransactionKind,
    ) -> IndexWriter<'_> {
        IndexWriter::new(self, key, now_in_sec, op_group, kind)
    }

    /// Reads the committed row of a skinny partition, or one row of a wide
    /// partition, as visible to `op_group`.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the read fails.
    pub fn read(
        &self,
        key: &DecoratedKey,
        clustering: Option<&ClusteringKey>,
        now_in_sec: i64,
        op_group: OpGroup,
    ) -> IndexResult<Option<Row>> {
        let clusterings = clustering.map(std::slice::from_ref);
        let read = self.read_rows(key, clusterings, now_in_sec, op_group)?;
        Ok(read.and_then(|partition| match clustering {
            Some(clustering) => partition.row(clustering).cloned(),
            None => partition.rows.into_iter().next(),
        }))
    }

    /// Reads several rows of a partition, plus its static row.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the read fails.
    pub fn read_rows(
        &self,
        key: &DecoratedKey,
        clusterings: Option<&[ClusteringKey]>,
        now_in_sec: i64,
        op_group: OpGroup,
    ) -> IndexResult<Option<PartitionRead>> {
        trace!(%key, %op_group, rows = ?clusterings.map(<[_]>::len), "reading before write");
        self.engine(
            self.reader
                .read_partition(key, clusterings, now_in_sec, op_group),
        )
    }

    /// Indexes `row`, replacing any document with the same key.
    ///
    /// Columns that fail to decode are left out of the document. If a
    /// validated mapper rejects the row, the stale document is deleted
    /// and the mapper error is returned.
    ///
    /// # Errors
    ///
    /// Returns a key decoding error if the key does not match the schema,
    /// a mapper assembly error as described above, or an engine error.
    pub fn upsert(
        &self,
        key: &DecoratedKey,
        row: &Row,
        static_row: Option<&Row>,
        now_in_sec: i64,
    ) -> IndexResult<()> {
        let keys = self.key_mapper();
        let clustering = row.clustering();

        let mut columns = match keys.columns(key, clustering) {
            Ok(columns) => columns,
            Err(err) => {
                self.stats.record_key_error();
                return Err(err);
            }
        };
        let projection = self.projector.project(row, static_row, now_in_sec);
        if !projection.dropped.is_empty() {
            self.stats
                .record_dropped_columns(projection.dropped.len() as u64);
        }
        columns.extend(projection.columns);

        let term = keys.term(key, clustering)?;
        match self.assembler.assemble(key, clustering, &columns) {
            Ok(document) => {
                self.engine(self.backend.upsert(&term, document))?;
                self.stats.record_upsert();
                trace!(%key, "upserted document");
                Ok(())
            }
            Err(err @ IndexError::MapperAssembly { .. }) => {
                warn!(%key, error = %err, "row rejected by mapper, deleting stale document");
                self.stats.record_rejected_row();
                self.engine(self.backend.delete(&term))?;
                self.stats.record_delete();
                Err(err)
            }
            Err(err) => {
                if matches!(err, IndexError::KeyDecoding { .. }) {
                    self.stats.record_key_error();
                }
                Err(err)
            }
        }
    }

    /// Deletes every document of a partition.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the backend fails.
    pub fn delete(&self, key: &DecoratedKey) -> IndexResult<usize> {
        let term = self.key_mapper().partition().term(key);
        let deleted = self.engine(self.backend.delete(&term))?;
        self.stats.record_delete();
        trace!(%key, deleted, "deleted partition");
        Ok(deleted)
    }

    /// Deletes the document of one wide row.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary key cannot be encoded or the
    /// backend fails.
    pub fn delete_row(&self, key: &DecoratedKey, clustering: &ClusteringKey) -> IndexResult<usize> {
        let term = self.key_mapper().term(key, Some(clustering))?;
        let deleted = self.engine(self.backend.delete(&term))?;
        self.stats.record_delete();
        trace!(%key, %clustering, deleted, "deleted row");
        Ok(deleted)
    }

    /// Deletes the documents of every row of the partition inside `range`.
    ///
    /// Every indexed row of the partition is considered, however many
    /// there are.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error on skinny tables, a key decoding
    /// error if an indexed row has a malformed clustering key, or an engine
    /// error.
    pub fn delete_range(&self, key: &DecoratedKey, range: &ClusteringRange) -> IndexResult<usize> {
        let keys = self.key_mapper();
        let mapper = keys
            .clustering()
            .ok_or_else(|| IndexError::invalid_operation("range deletes need a wide table"))?;

        let query = keys.partition().query(key);
        let documents = self.engine(self.backend.search(&query, usize::MAX))?;
        let mut terms = Vec::new();
        for document in &documents {
            let clustering = mapper.clustering(document)?;
            if range.contains(mapper, &clustering) {
                terms.push(Query::Term(keys.term(key, Some(&clustering))?));
            }
        }

        let deleted = if terms.is_empty() {
            0
        } else {
            self.engine(self.backend.delete_by_query(&Query::Disjunction(terms)))?
        };
        self.stats.record_range_delete();
        trace!(%key, deleted, "deleted row range");
        Ok(deleted)
    }

    /// Returns true if a skinny row image cannot settle the partition's
    /// content or liveness on its own.
    ///
    /// That is the case when the policy says so, when a mapped column is
    /// a non-frozen collection or UDT (updates only carry changed
    /// elements), when a mapped column is absent from the image, or when
    /// the image has neither live data nor primary key liveness.
    pub fn needs_read_before_write(&self, key: &DecoratedKey, row: &Row, now_in_sec: i64) -> bool {
        let present = row.columns_present();
        let needs = self.config.read_before_write == ReadBeforeWrite::Always
            || self.maps_multi_cell
            || self
                .mapped_regular
                .iter()
                .any(|c| !present.contains(c.as_str()))
            || (row.liveness().is_none() && !row.has_live_data(now_in_sec));
        trace!(%key, needs, "read-before-write decision");
        needs
    }

    /// Wide-table variant of [`Self::needs_read_before_write`] for one
    /// clustering row.
    ///
    /// Besides the skinny conditions, a read is needed when a mapped static
    /// column is absent from the pending static row, since every document
    /// of the partition carries the static values.
    pub fn needs_read_before_write_wide(
        &self,
        key: &DecoratedKey,
        static_row: Option<&Row>,
        row: &Row,
        now_in_sec: i64,
    ) -> bool {
        let statics_missing = !self.mapped_static.is_empty()
            && static_row.map_or(true, |s| {
                let present = s.columns_present();
                self.mapped_static.iter().any(|c| !present.contains(c.as_str()))
            });
        statics_missing || self.needs_read_before_write(key, row, now_in_sec)
    }

    /// Returns true if `static_row` changes a mapped static column.
    pub(crate) fn touches_mapped_statics(&self, static_row: &Row) -> bool {
        let present = static_row.columns_present();
        self.mapped_static.iter().any(|c| present.contains(c.as_str()))
    }

    /// Searches the index.
    ///
    /// Every match is resolved to its primary key and sorted in native key
    /// order, then cut to `limit` or `max_search_results`, whichever is
    /// lower. Documents whose keys do not decode are skipped.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the backend fails.
    pub fn search(&self, query: &Query, limit: usize) -> IndexResult<Vec<SearchHit>> {
        let documents = self.engine(self.backend.search(query, usize::MAX))?;
        let keys = self.key_mapper();
        let mut hits = Vec::with_capacity(documents.len());
        for document in documents {
            match keys.primary_key(&document) {
                Ok((key, clustering)) => hits.push(SearchHit {
                    key,
                    clustering,
                    document,
                }),
                Err(err) => {
                    self.stats.record_key_error();
                    warn!(error = %err, "skipping document with undecodable key");
                }
            }
        }
        hits.sort_by(|a, b| {
            self.sort.compare_keys(
                (&a.key, a.clustering.as_ref()),
                (&b.key, b.clustering.as_ref()),
            )
        });
        hits.truncate(limit.min(self.config.max_search_results));
        Ok(hits)
    }

    /// Makes pending index changes durable.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the backend fails.
    pub fn commit(&self) -> IndexResult<()> {
        self.engine(self.backend.commit())
    }

    /// Deletes every document.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the backend fails.
    pub fn truncate(&self) -> IndexResult<usize> {
        let deleted = self.engine(self.backend.delete_by_query(&Query::All))?;
        debug!(table = self.table.table(), deleted, "index truncated");
        Ok(deleted)
    }

    /// Returns the number of indexed documents.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the backend fails.
    pub fn num_docs(&self) -> IndexResult<usize> {
        self.engine(self.backend.num_docs())
    }

    fn engine<T>(&self, result: IndexResult<T>) -> IndexResult<T> {
        if let Err(err) = &result {
            if err.is_fatal() {
                self.stats.record_engine_error();
                warn!(table = self.table.table(), error = %err, "index engine failure");
            }
        }
        result
    }
}

impl std::fmt::Debug for IndexService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexService")
            .field("keyspace", &self.table.keyspace())
            .field("table", &self.table.table())
            .field("config", &self.config)
            .field("mapped_regular", &self.mapped_regular)
            .field("mapped_static", &self.mapped_static)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Term;
    use crate::document::FieldValue;
    use crate::row::{Cell, LivenessInfo};
    use crate::testing::*;
    use quarry_codec::CellType;

    const FIELDS: &str = r#"{"fields": {"a": {"type": "integer"}, "name": {"type": "string"}}}"#;

    #[test]
    fn upsert_then_search() {
        let h = harness(skinny_table(), FIELDS, IndexConfig::default());
        let k1 = h.service.decorate(text("k1"));
        h.service.upsert(&k1, &row_a(1, 10), None, NOW).unwrap();

        let hits = h.service.search(&Query::Term(Term::long("a", 1)), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, k1);
        assert!(hits[0].clustering.is_none());
        assert_eq!(h.service.stats().upserts(), 1);
    }

    #[test]
    fn upsert_replaces_document() {
        let h = harness(skinny_table(), FIELDS, IndexConfig::default());
        let k1 = h.service.decorate(text("k1"));
        h.service.upsert(&k1, &row_a(1, 10), None, NOW).unwrap();
        h.service.upsert(&k1, &row_a(2, 20), None, NOW).unwrap();
        assert_eq!(h.service.num_docs().unwrap(), 1);
        assert!(h
            .service
            .search(&Query::Term(Term::long("a", 1)), 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn bad_column_is_dropped_not_fatal() {
        let h = harness(skinny_table(), FIELDS, IndexConfig::default());
        let k1 = h.service.decorate(text("k1"));
        let row = Row::new()
            .with_liveness(LivenessInfo::new(1))
            .with_cell(Cell::live("a", vec![1u8, 2], 1))
            .with_cell(Cell::live("name", text("ana"), 1));
        h.service.upsert(&k1, &row, None, NOW).unwrap();
        assert_eq!(h.service.stats().dropped_columns(), 1);

        let doc = h.backend.get(&h.service.key_mapper().partition().term(&k1)).unwrap().unwrap();
        assert!(doc.get("a").is_none());
        assert_eq!(
            doc.values("name").next(),
            Some(&FieldValue::Keyword("ana".into()))
        );
    }

    #[test]
    fn mapper_rejection_deletes_stale_document() {
        let h = harness(
            skinny_table(),
            r#"{"fields": {"a": {"type": "integer", "validated": true}}}"#,
            IndexConfig::default(),
        );
        let k1 = h.service.decorate(text("k1"));
        h.service.upsert(&k1, &row_a(1, 10), None, NOW).unwrap();

        let without_a = Row::new()
            .with_liveness(LivenessInfo::new(20))
            .with_cell(Cell::live("name", text("x"), 20));
        let err = h.service.upsert(&k1, &without_a, None, NOW).unwrap_err();
        assert!(matches!(err, IndexError::MapperAssembly { .. }));
        assert_eq!(h.service.num_docs().unwrap(), 0);
        assert_eq!(h.service.stats().rejected_rows(), 1);
    }

    #[test]
    fn bad_key_leaves_index_untouched() {
        let table = TableSchema::new("ks", "t")
            .partition_key("id", CellType::Int)
            .regular("a", CellType::Int);
        let h = harness(table, r#"{"fields": {"a": {"type": "integer"}}}"#, IndexConfig::default());
        let bad = h.service.decorate(Bytes::from_static(&[1, 2]));
        let err = h.service.upsert(&bad, &row_a(1, 1), None, NOW).unwrap_err();
        assert!(matches!(err, IndexError::KeyDecoding { .. }));
        assert_eq!(h.service.num_docs().unwrap(), 0);
        assert_eq!(h.service.stats().key_errors(), 1);
    }

    #[test]
    fn skinny_read_before_write_heuristic() {
        let h = harness(skinny_table(), FIELDS, IndexConfig::default());
        let k1 = h.service.decorate(text("k1"));
        assert!(!h.service.needs_read_before_write(&k1, &row_a(1, 1), NOW));

        let partial = Row::new()
            .with_liveness(LivenessInfo::new(1))
            .with_cell(Cell::live("a", int(1), 1));
        assert!(h.service.needs_read_before_write(&k1, &partial, NOW));

        let tombstoned = Row::new()
            .with_cell(Cell::tombstone("a", 1, NOW))
            .with_cell(Cell::tombstone("name", 1, NOW));
        assert!(h.service.needs_read_before_write(&k1, &tombstoned, NOW));

        let always = harness(
            skinny_table(),
            FIELDS,
            IndexConfig::new().read_before_write(ReadBeforeWrite::Always),
        );
        assert!(always.service.needs_read_before_write(&k1, &row_a(1, 1), NOW));

        let collections = harness(
            skinny_table(),
            r#"{"fields": {"tags": {"type": "string"}}}"#,
            IndexConfig::default(),
        );
        let full = Row::new()
            .with_liveness(LivenessInfo::new(1))
            .with_cell(Cell::live("tags", Vec::<u8>::new(), 1).with_path(text("x")));
        assert!(collections.service.needs_read_before_write(&k1, &full, NOW));
    }

    #[test]
    fn wide_heuristic_checks_statics() {
        let h = harness(
            wide_table(),
            r#"{"fields": {"a": {"type": "integer"}, "owner": {"type": "string"}}}"#,
            IndexConfig::default(),
        );
        let p1 = h.service.decorate(text("p1"));
        let row = wide_row(1, 5, 1);
        assert!(h.service.needs_read_before_write_wide(&p1, None, &row, NOW));

        let statics = Row::static_row().with_cell(Cell::live("owner", text("me"), 1));
        assert!(!h
            .service
            .needs_read_before_write_wide(&p1, Some(&statics), &row, NOW));
        assert!(h.service.touches_mapped_statics(&statics));
    }

    #[test]
    fn wide_delete_row_and_range() {
        let h = harness(
            wide_table(),
            r#"{"fields": {"a": {"type": "integer"}}}"#,
            IndexConfig::default(),
        );
        let p1 = h.service.decorate(text("p1"));
        for seq in 1..=5 {
            h.service.upsert(&p1, &wide_row(seq, seq, 1), None, NOW).unwrap();
        }
        assert_eq!(h.service.delete_row(&p1, &ck(1)).unwrap(), 1);
        let range = ClusteringRange::inclusive(ck(2), ck(3));
        assert_eq!(h.service.delete_range(&p1, &range).unwrap(), 2);

        let hits = h.service.search(&Query::All, 10).unwrap();
        let remaining: Vec<_> = hits.iter().map(|h| h.clustering.clone().unwrap()).collect();
        assert_eq!(remaining, vec![ck(4), ck(5)]);

        assert_eq!(h.service.delete(&p1).unwrap(), 2);
        assert_eq!(h.service.num_docs().unwrap(), 0);
    }

    #[test]
    fn range_delete_ignores_search_bound() {
        let h = harness(
            wide_table(),
            r#"{"fields": {"a": {"type": "integer"}}}"#,
            IndexConfig::default().max_search_results(2),
        );
        let p1 = h.service.decorate(text("p1"));
        for seq in 1..=5 {
            h.service.upsert(&p1, &wide_row(seq, seq, 1), None, NOW).unwrap();
        }
        let range = ClusteringRange::inclusive(ck(2), ck(5));
        assert_eq!(h.service.delete_range(&p1, &range).unwrap(), 4);
        assert_eq!(h.service.num_docs().unwrap(), 1);
    }

    #[test]
    fn range_delete_on_skinny_rejected() {
        let h = harness(skinny_table(), FIELDS, IndexConfig::default());
        let k1 = h.service.decorate(text("k1"));
        let range = ClusteringRange::prefix(ck(1));
        assert!(matches!(
            h.service.delete_range(&k1, &range),
            Err(IndexError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn search_sorts_in_native_order_and_limits() {
        let h = harness(
            wide_table(),
            r#"{"fields": {"a": {"type": "integer"}}}"#,
            IndexConfig::default(),
        );
        let p1 = h.service.decorate(text("p1"));
        for seq in [3, -1, 2, 0] {
            h.service.upsert(&p1, &wide_row(seq, 0, 1), None, NOW).unwrap();
        }
        let hits = h.service.search(&Query::All, 3).unwrap();
        let order: Vec<_> = hits.iter().map(|h| h.clustering.clone().unwrap()).collect();
        assert_eq!(order, vec![ck(-1), ck(0), ck(2)]);
    }

    #[test]
    fn search_bound_keeps_lowest_keys() {
        let h = harness(
            wide_table(),
            r#"{"fields": {"a": {"type": "integer"}}}"#,
            IndexConfig::default().max_search_results(3),
        );
        let p1 = h.service.decorate(text("p1"));
        for seq in [9, 7, 5, 3, 1] {
            h.service.upsert(&p1, &wide_row(seq, 0, 1), None, NOW).unwrap();
        }
        let hits = h.service.search(&Query::All, 10).unwrap();
        let order: Vec<_> = hits.iter().map(|h| h.clustering.clone().unwrap()).collect();
        assert_eq!(order, vec![ck(1), ck(3), ck(5)]);

        let hits = h.service.search(&Query::All, 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].clustering, Some(ck(3)));
    }

    #[test]
    fn engine_failures_are_counted() {
        let h = harness(skinny_table(), FIELDS, IndexConfig::default());
        let k1 = h.service.decorate(text("k1"));
        h.backend.close();
        let err = h.service.upsert(&k1, &row_a(1, 1), None, NOW).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(h.service.stats().engine_errors(), 1);
    }

    #[test]
    fn read_scoped_rows() {
        let h = harness(wide_table(), r#"{"fields": {}}"#, IndexConfig::default());
        let p1 = h.service.decorate(text("p1"));
        h.reader.put(
            &p1,
            PartitionRead {
                static_row: None,
                rows: vec![wide_row(1, 1, 1), wide_row(2, 2, 1)],
            },
        );
        let row = h.service.read(&p1, Some(&ck(2)), NOW, OpGroup::new(1)).unwrap();
        assert_eq!(row, Some(wide_row(2, 2, 1)));
        assert_eq!(h.reader.reads(), 1);
    }

    #[test]
    fn truncate_and_commit() {
        let h = harness(skinny_table(), FIELDS, IndexConfig::default());
        let k1 = h.service.decorate(text("k1"));
        h.service.upsert(&k1, &row_a(1, 1), None, NOW).unwrap();
        h.service.commit().unwrap();
        assert_eq!(h.backend.commits(), 1);
        assert_eq!(h.service.truncate().unwrap(), 1);
    }

    #[test]
    fn from_options_builds_schema() {
        let options = IndexOptions::from_json(
            r#"{"partitioner": "ordered", "schema": {"fields": {"a": {"type": "integer"}}}}"#,
        )
        .unwrap();
        let service = IndexService::from_options(
            skinny_table(),
            &options,
            Arc::new(crate::backend::MemoryIndex::new()),
            Arc::new(MapReader::default()),
        )
        .unwrap();
        assert_eq!(service.key_mapper().partition().partitioner().name(), "ordered");
        assert_eq!(service.index_schema().mappers().len(), 1);
    }
}
