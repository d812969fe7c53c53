//! Partition key mapping.

use super::partitioner::{DecoratedKey, Partitioner, Token};
use crate::backend::{Query, Term};
use crate::columns::Columns;
use crate::document::{Document, Field, FieldValue};
use crate::error::{IndexError, IndexResult};
use crate::schema::TableSchema;
use bytes::Bytes;
use quarry_codec::{composite, decode, ordered, CellType};
use std::cmp::Ordering;
use std::sync::Arc;

/// Stored, sortable field holding the encoded partition key.
pub const PARTITION_KEY_FIELD: &str = "_partition_key";

/// Field holding the partition token for hash partitioners.
pub const TOKEN_FIELD: &str = "_token";

/// Maps partition keys to index fields and back.
///
/// The indexable field is the token in order-preserving form followed by
/// the raw key bytes, so bytewise order of the field equals the native
/// decorated-key order.
#[derive(Debug, Clone)]
pub struct PartitionMapper {
    partitioner: Arc<dyn Partitioner>,
    components: Vec<(String, CellType)>,
}

impl PartitionMapper {
    /// Creates a mapper for the table's partition key.
    ///
    /// # Errors
    ///
    /// Returns an error if the table has no partition key.
    pub fn new(schema: &TableSchema, partitioner: Arc<dyn Partitioner>) -> IndexResult<Self> {
        let components: Vec<(String, CellType)> = schema
            .partition_key_columns()
            .into_iter()
            .map(|c| (c.name.clone(), c.cell_type.clone()))
            .collect();
        if components.is_empty() {
            return Err(IndexError::invalid_schema(format!(
                "table {}.{} has no partition key",
                schema.keyspace(),
                schema.table()
            )));
        }
        Ok(Self {
            partitioner,
            components,
        })
    }

    /// Returns the partitioner.
    pub fn partitioner(&self) -> &Arc<dyn Partitioner> {
        &self.partitioner
    }

    /// Decorates raw key bytes with their token.
    pub fn decorate(&self, key: impl Into<Bytes>) -> DecoratedKey {
        self.partitioner.decorate(key.into())
    }

    /// Decodes the key into named, typed components.
    ///
    /// # Errors
    ///
    /// Returns a key decoding error if the bytes do not match the
    /// component count or types.
    pub fn columns(&self, key: &DecoratedKey) -> IndexResult<Columns> {
        let mut columns = Columns::new();
        if let [(name, cell_type)] = self.components.as_slice() {
            let value = decode(cell_type, key.key())
                .map_err(|e| IndexError::key_decoding(format!("partition key {name}: {e}")))?;
            columns.add_flattened(name, cell_type, value);
            return Ok(columns);
        }

        let parts = composite::split(key.key(), self.components.len())
            .map_err(|e| IndexError::key_decoding(format!("partition key: {e}")))?;
        for ((name, cell_type), bytes) in self.components.iter().zip(parts) {
            let value = decode(cell_type, bytes)
                .map_err(|e| IndexError::key_decoding(format!("partition key {name}: {e}")))?;
            columns.add_flattened(name, cell_type, value);
        }
        Ok(columns)
    }

    /// Returns the order-preserving bytes of the indexable field.
    pub fn field_bytes(&self, key: &DecoratedKey) -> Vec<u8> {
        match key.token() {
            Token::Long(token) => {
                let mut bytes = Vec::with_capacity(8 + key.key().len());
                bytes.extend_from_slice(&ordered::encode_i64(*token));
                bytes.extend_from_slice(key.key());
                bytes
            }
            Token::Bytes(_) => key.key().to_vec(),
        }
    }

    /// Returns the stored, untokenized, sortable key field.
    pub fn indexable_field(&self, key: &DecoratedKey) -> Field {
        Field::new(PARTITION_KEY_FIELD, FieldValue::Bytes(self.field_bytes(key))).stored()
    }

    /// Returns the token field, for partitioners with numeric tokens.
    pub fn token_field(&self, key: &DecoratedKey) -> Option<Field> {
        match key.token() {
            Token::Long(token) => Some(Field::new(TOKEN_FIELD, FieldValue::Long(*token))),
            Token::Bytes(_) => None,
        }
    }

    /// Returns the exact-match term for the key.
    pub fn term(&self, key: &DecoratedKey) -> Term {
        Term::new(PARTITION_KEY_FIELD, self.field_bytes(key))
    }

    /// Returns the exact-match query for the key.
    pub fn query(&self, key: &DecoratedKey) -> Query {
        Query::Term(self.term(key))
    }

    /// Recovers the decorated key a document was built from.
    ///
    /// # Errors
    ///
    /// Returns a key decoding error if the document has no stored key or
    /// its token does not match this mapper's partitioner.
    pub fn decorated_key(&self, document: &Document) -> IndexResult<DecoratedKey> {
        let bytes = document
            .stored_bytes(PARTITION_KEY_FIELD)
            .ok_or_else(|| IndexError::key_decoding("document has no stored partition key"))?;
        self.decorated_key_from_field(bytes)
    }

    /// Inverse of [`Self::field_bytes`].
    ///
    /// # Errors
    ///
    /// Returns a key decoding error on truncated input or a token prefix
    /// that disagrees with the partitioner.
    pub fn decorated_key_from_field(&self, bytes: &[u8]) -> IndexResult<DecoratedKey> {
        let width = self.partitioner.token_width();
        if bytes.len() < width {
            return Err(IndexError::key_decoding(format!(
                "partition key field of {} bytes is shorter than its {width} byte token",
                bytes.len()
            )));
        }
        let (prefix, raw) = bytes.split_at(width);
        let key = self.decorate(Bytes::copy_from_slice(raw));
        if width > 0 {
            let expected = match key.token() {
                Token::Long(t) => ordered::encode_i64(*t).to_vec(),
                Token::Bytes(_) => Vec::new(),
            };
            if prefix != expected.as_slice() {
                return Err(IndexError::key_decoding(format!(
                    "token prefix does not match the {} partitioner",
                    self.partitioner.name()
                )));
            }
        }
        Ok(key)
    }

    /// Compares two keys in native order.
    pub fn compare(&self, a: &DecoratedKey, b: &DecoratedKey) -> Ordering {
        self.partitioner.compare(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::partitioner::{HashPartitioner, OrderedPartitioner};
    use quarry_codec::{encode, Value};

    fn mapper(schema: &TableSchema) -> PartitionMapper {
        PartitionMapper::new(schema, Arc::new(HashPartitioner)).unwrap()
    }

    fn single() -> TableSchema {
        TableSchema::new("ks", "t").partition_key("id", CellType::Text)
    }

    #[test]
    fn single_component_columns() {
        let m = mapper(&single());
        let key = m.decorate(Bytes::from_static(b"k1"));
        let columns = m.columns(&key).unwrap();
        assert_eq!(columns.len(), 1);
        let id = columns.values_for("id").next().unwrap();
        assert_eq!(id.value(), &Value::from("k1"));
    }

    #[test]
    fn composite_columns() {
        let schema = TableSchema::new("ks", "t")
            .partition_key("a", CellType::Text)
            .partition_key("b", CellType::Int);
        let m = mapper(&schema);
        let raw = composite::build(&[
            encode(&CellType::Text, &Value::from("x")).unwrap(),
            encode(&CellType::Int, &Value::Integer(-7)).unwrap(),
        ])
        .unwrap();
        let columns = m.columns(&m.decorate(raw)).unwrap();
        assert_eq!(
            columns.values_for("b").next().unwrap().value(),
            &Value::Integer(-7)
        );
    }

    #[test]
    fn component_mismatch_is_key_error() {
        let schema = TableSchema::new("ks", "t")
            .partition_key("a", CellType::Text)
            .partition_key("b", CellType::Int);
        let m = mapper(&schema);
        let raw = composite::build(&[b"x".as_slice()]).unwrap();
        let err = m.columns(&m.decorate(raw)).unwrap_err();
        assert!(matches!(err, IndexError::KeyDecoding { .. }));
    }

    #[test]
    fn wrong_width_is_key_error() {
        let schema = TableSchema::new("ks", "t").partition_key("id", CellType::Int);
        let m = mapper(&schema);
        let err = m.columns(&m.decorate(Bytes::from_static(&[1, 2]))).unwrap_err();
        assert!(matches!(err, IndexError::KeyDecoding { .. }));
    }

    #[test]
    fn field_round_trip() {
        let m = mapper(&single());
        let key = m.decorate(Bytes::from_static(b"k1"));
        let mut doc = Document::new();
        doc.add(m.indexable_field(&key));
        assert_eq!(m.decorated_key(&doc).unwrap(), key);
    }

    #[test]
    fn ordered_field_is_raw_key() {
        let m = PartitionMapper::new(&single(), Arc::new(OrderedPartitioner)).unwrap();
        let key = m.decorate(Bytes::from_static(b"abc"));
        assert_eq!(m.field_bytes(&key), b"abc".to_vec());
        assert!(m.token_field(&key).is_none());
        assert_eq!(m.decorated_key_from_field(b"abc").unwrap(), key);
    }

    #[test]
    fn tampered_token_rejected() {
        let m = mapper(&single());
        let key = m.decorate(Bytes::from_static(b"k1"));
        let mut bytes = m.field_bytes(&key);
        bytes[0] ^= 0xff;
        assert!(m.decorated_key_from_field(&bytes).is_err());
        assert!(m.decorated_key_from_field(&[1, 2, 3]).is_err());
    }

    #[test]
    fn missing_stored_key() {
        let m = mapper(&single());
        assert!(matches!(
            m.decorated_key(&Document::new()),
            Err(IndexError::KeyDecoding { .. })
        ));
    }

    #[test]
    fn field_order_matches_native_order() {
        let m = mapper(&single());
        let keys: Vec<DecoratedKey> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|k| m.decorate(Bytes::copy_from_slice(k.as_bytes())))
            .collect();
        for a in &keys {
            for b in &keys {
                assert_eq!(m.field_bytes(a).cmp(&m.field_bytes(b)), m.compare(a, b));
            }
        }
    }

    #[test]
    fn no_partition_key_rejected() {
        let schema = TableSchema::new("ks", "t").regular("x", CellType::Int);
        assert!(PartitionMapper::new(&schema, Arc::new(HashPartitioner)).is_err());
    }
}
