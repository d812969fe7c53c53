//! Clustering key mapping for wide tables.

use crate::backend::Term;
use crate::columns::Columns;
use crate::document::{Document, Field, FieldValue};
use crate::error::{IndexError, IndexResult};
use crate::schema::TableSchema;
use bytes::Bytes;
use quarry_codec::{compare, composite, decode, CellType};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

/// Stored field holding the raw clustering key.
pub const CLUSTERING_FIELD: &str = "_clustering";

/// Field whose term identifies exactly one row.
pub const PRIMARY_KEY_FIELD: &str = "_primary_key";

/// Clustering key bytes in composite layout.
///
/// The derived order is bytewise and only used for bookkeeping; native
/// order comes from [`ClusteringMapper::compare`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusteringKey(Bytes);

impl ClusteringKey {
    /// Wraps composite clustering bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Builds a key (or a prefix, for range bounds) from serialized
    /// component values.
    ///
    /// # Errors
    ///
    /// Returns an error if a component is too long for the layout.
    pub fn from_components<C: AsRef<[u8]>>(components: &[C]) -> IndexResult<Self> {
        let bytes = composite::build(components)
            .map_err(|e| IndexError::key_decoding(format!("clustering key: {e}")))?;
        Ok(Self(Bytes::from(bytes)))
    }

    /// Returns the composite bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the serialized components.
    ///
    /// # Errors
    ///
    /// Returns a key decoding error on malformed bytes.
    pub fn components(&self) -> IndexResult<Vec<&[u8]>> {
        composite::split_all(&self.0)
            .map_err(|e| IndexError::key_decoding(format!("clustering key: {e}")))
    }
}

impl fmt::Display for ClusteringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Maps clustering keys to index fields and back.
#[derive(Debug, Clone)]
pub struct ClusteringMapper {
    components: Vec<(String, CellType)>,
}

impl ClusteringMapper {
    /// Creates a mapper, or `None` for skinny tables.
    pub fn new(schema: &TableSchema) -> Option<Self> {
        let components: Vec<(String, CellType)> = schema
            .clustering_columns()
            .into_iter()
            .map(|c| (c.name.clone(), c.cell_type.clone()))
            .collect();
        if components.is_empty() {
            None
        } else {
            Some(Self { components })
        }
    }

    /// Returns the component types.
    pub fn types(&self) -> Vec<CellType> {
        self.components.iter().map(|(_, t)| t.clone()).collect()
    }

    /// Decodes the key into named, typed components.
    ///
    /// # Errors
    ///
    /// Returns a key decoding error on a component count or type mismatch.
    pub fn columns(&self, clustering: &ClusteringKey) -> IndexResult<Columns> {
        let parts = composite::split(clustering.as_bytes(), self.components.len())
            .map_err(|e| IndexError::key_decoding(format!("clustering key: {e}")))?;
        let mut columns = Columns::new();
        for ((name, cell_type), bytes) in self.components.iter().zip(parts) {
            let value = decode(cell_type, bytes)
                .map_err(|e| IndexError::key_decoding(format!("clustering key {name}: {e}")))?;
            columns.add_flattened(name, cell_type, value);
        }
        Ok(columns)
    }

    /// Returns the bytes of the primary key term.
    ///
    /// # Errors
    ///
    /// Returns an error if either key is too long for the composite layout.
    pub fn primary_key_bytes(
        &self,
        partition_field: &[u8],
        clustering: &ClusteringKey,
    ) -> IndexResult<Vec<u8>> {
        composite::build(&[partition_field, clustering.as_bytes()])
            .map_err(|e| IndexError::key_decoding(format!("primary key: {e}")))
    }

    /// Returns the term identifying one row.
    ///
    /// # Errors
    ///
    /// See [`Self::primary_key_bytes`].
    pub fn term(&self, partition_field: &[u8], clustering: &ClusteringKey) -> IndexResult<Term> {
        Ok(Term::new(
            PRIMARY_KEY_FIELD,
            self.primary_key_bytes(partition_field, clustering)?,
        ))
    }

    /// Returns the clustering and primary key fields.
    ///
    /// # Errors
    ///
    /// See [`Self::primary_key_bytes`].
    pub fn indexable_fields(
        &self,
        partition_field: &[u8],
        clustering: &ClusteringKey,
    ) -> IndexResult<Vec<Field>> {
        Ok(vec![
            Field::new(
                CLUSTERING_FIELD,
                FieldValue::Bytes(clustering.as_bytes().to_vec()),
            )
            .stored(),
            Field::new(
                PRIMARY_KEY_FIELD,
                FieldValue::Bytes(self.primary_key_bytes(partition_field, clustering)?),
            ),
        ])
    }

    /// Recovers the clustering key a document was built from.
    ///
    /// # Errors
    ///
    /// Returns a key decoding error if the document has no stored
    /// clustering key or it has the wrong number of components.
    pub fn clustering(&self, document: &Document) -> IndexResult<ClusteringKey> {
        let bytes = document
            .stored_bytes(CLUSTERING_FIELD)
            .ok_or_else(|| IndexError::key_decoding("document has no stored clustering key"))?;
        composite::split(bytes, self.components.len())
            .map_err(|e| IndexError::key_decoding(format!("clustering key: {e}")))?;
        Ok(ClusteringKey::from_bytes(Bytes::copy_from_slice(bytes)))
    }

    /// Compares two clustering keys in native order.
    pub fn compare(&self, a: &ClusteringKey, b: &ClusteringKey) -> Ordering {
        composite::compare_composite(&self.types(), a.as_bytes(), b.as_bytes())
    }

    /// Compares `key` against `bound` on the bound's components only, so a
    /// prefix bound is equal to every key it prefixes.
    pub fn compare_prefix(&self, key: &ClusteringKey, bound: &ClusteringKey) -> Ordering {
        let (Ok(k), Ok(b)) = (key.components(), bound.components()) else {
            return key.as_bytes().cmp(bound.as_bytes());
        };
        for (((_, t), x), y) in self.components.iter().zip(&k).zip(&b) {
            let ord = compare(t, x, y);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// A range of clustering keys, as deleted by a range tombstone.
///
/// Bounds may be prefixes: `[("a"), ("a")]` covers every row whose first
/// component is `"a"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusteringRange {
    /// Start bound.
    pub start: Bound<ClusteringKey>,
    /// End bound.
    pub end: Bound<ClusteringKey>,
}

impl ClusteringRange {
    /// Creates a range.
    pub fn new(start: Bound<ClusteringKey>, end: Bound<ClusteringKey>) -> Self {
        Self { start, end }
    }

    /// Range with both ends included.
    pub fn inclusive(start: ClusteringKey, end: ClusteringKey) -> Self {
        Self::new(Bound::Included(start), Bound::Included(end))
    }

    /// Range covering every row sharing `prefix`.
    pub fn prefix(prefix: ClusteringKey) -> Self {
        Self::inclusive(prefix.clone(), prefix)
    }

    /// Returns true if `key` falls inside the range.
    pub fn contains(&self, mapper: &ClusteringMapper, key: &ClusteringKey) -> bool {
        let after_start = match &self.start {
            Bound::Included(s) => mapper.compare_prefix(key, s) != Ordering::Less,
            Bound::Excluded(s) => mapper.compare_prefix(key, s) == Ordering::Greater,
            Bound::Unbounded => true,
        };
        let before_end = match &self.end {
            Bound::Included(e) => mapper.compare_prefix(key, e) != Ordering::Greater,
            Bound::Excluded(e) => mapper.compare_prefix(key, e) == Ordering::Less,
            Bound::Unbounded => true,
        };
        after_start && before_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_codec::{encode, Value};

    fn schema() -> TableSchema {
        TableSchema::new("ks", "events")
            .partition_key("device", CellType::Text)
            .clustering("day", CellType::Int)
            .clustering("seq", CellType::reversed(CellType::BigInt))
    }

    fn key(day: i64, seq: i64) -> ClusteringKey {
        ClusteringKey::from_components(&[
            encode(&CellType::Int, &Value::Integer(day)).unwrap(),
            encode(&CellType::BigInt, &Value::Integer(seq)).unwrap(),
        ])
        .unwrap()
    }

    fn day(day: i64) -> ClusteringKey {
        ClusteringKey::from_components(&[encode(&CellType::Int, &Value::Integer(day)).unwrap()])
            .unwrap()
    }

    #[test]
    fn skinny_has_no_mapper() {
        let skinny = TableSchema::new("ks", "t").partition_key("id", CellType::Int);
        assert!(ClusteringMapper::new(&skinny).is_none());
    }

    #[test]
    fn columns_decode() {
        let m = ClusteringMapper::new(&schema()).unwrap();
        let columns = m.columns(&key(-1, 9)).unwrap();
        assert_eq!(
            columns.values_for("day").next().unwrap().value(),
            &Value::Integer(-1)
        );
        assert_eq!(
            columns.values_for("seq").next().unwrap().value(),
            &Value::Integer(9)
        );
    }

    #[test]
    fn prefix_key_rejected_as_row_key() {
        let m = ClusteringMapper::new(&schema()).unwrap();
        assert!(matches!(
            m.columns(&day(1)),
            Err(IndexError::KeyDecoding { .. })
        ));
    }

    #[test]
    fn native_order_respects_types() {
        let m = ClusteringMapper::new(&schema()).unwrap();
        assert_eq!(m.compare(&key(-1, 0), &key(1, 0)), Ordering::Less);
        // Second component is reversed.
        assert_eq!(m.compare(&key(1, 5), &key(1, 2)), Ordering::Less);
    }

    #[test]
    fn document_round_trip() {
        let m = ClusteringMapper::new(&schema()).unwrap();
        let ck = key(3, 4);
        let mut doc = Document::new();
        for field in m.indexable_fields(b"pk", &ck).unwrap() {
            doc.add(field);
        }
        assert_eq!(m.clustering(&doc).unwrap(), ck);
    }

    #[test]
    fn primary_key_terms_are_unique() {
        let m = ClusteringMapper::new(&schema()).unwrap();
        let a = m.term(b"pk", &key(1, 1)).unwrap();
        let b = m.term(b"pk", &key(1, 2)).unwrap();
        let c = m.term(b"pk2", &key(1, 1)).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn range_contains() {
        let m = ClusteringMapper::new(&schema()).unwrap();
        let range = ClusteringRange::inclusive(day(2), day(3));
        assert!(!range.contains(&m, &key(1, 0)));
        assert!(range.contains(&m, &key(2, 100)));
        assert!(range.contains(&m, &key(3, -5)));
        assert!(!range.contains(&m, &key(4, 0)));

        let open = ClusteringRange::new(Bound::Excluded(day(2)), Bound::Unbounded);
        assert!(!open.contains(&m, &key(2, 1)));
        assert!(open.contains(&m, &key(9, 1)));

        assert!(ClusteringRange::prefix(day(7)).contains(&m, &key(7, 3)));
    }
}
