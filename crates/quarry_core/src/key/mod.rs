//! Key Mapper: partition and clustering keys to index fields and back.

mod clustering;
mod partition;
mod partitioner;
mod sort;

pub use clustering::{
    ClusteringKey, ClusteringMapper, ClusteringRange, CLUSTERING_FIELD, PRIMARY_KEY_FIELD,
};
pub use partition::{PartitionMapper, PARTITION_KEY_FIELD, TOKEN_FIELD};
pub use partitioner::{
    DecoratedKey, HashPartitioner, OrderedPartitioner, Partitioner, PartitionerKind, Token,
};
pub use sort::KeySort;

use crate::backend::Term;
use crate::columns::Columns;
use crate::document::{Document, Field};
use crate::error::{IndexError, IndexResult};
use crate::schema::TableSchema;
use std::sync::Arc;

/// Maps the full primary key of skinny and wide tables.
///
/// Skinny tables index one document per partition, keyed by the
/// partition term. Wide tables index one document per row, keyed by the
/// primary key term; the partition term still matches every row of the
/// partition.
#[derive(Debug, Clone)]
pub struct KeyMapper {
    partition: PartitionMapper,
    clustering: Option<ClusteringMapper>,
}

impl KeyMapper {
    /// Creates a key mapper for the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table has no partition key.
    pub fn new(schema: &TableSchema, partitioner: Arc<dyn Partitioner>) -> IndexResult<Self> {
        Ok(Self {
            partition: PartitionMapper::new(schema, partitioner)?,
            clustering: ClusteringMapper::new(schema),
        })
    }

    /// Returns the partition mapper.
    pub fn partition(&self) -> &PartitionMapper {
        &self.partition
    }

    /// Returns the clustering mapper of a wide table.
    pub fn clustering(&self) -> Option<&ClusteringMapper> {
        self.clustering.as_ref()
    }

    /// Returns true for wide tables.
    pub fn is_wide(&self) -> bool {
        self.clustering.is_some()
    }

    /// Decodes the key columns of a partition or row.
    ///
    /// # Errors
    ///
    /// Returns a key decoding error if either key does not match the schema.
    pub fn columns(
        &self,
        key: &DecoratedKey,
        clustering: Option<&ClusteringKey>,
    ) -> IndexResult<Columns> {
        let mut columns = self.partition.columns(key)?;
        if let (Some(mapper), Some(clustering)) = (&self.clustering, clustering) {
            columns.extend(mapper.columns(clustering)?);
        }
        Ok(columns)
    }

    /// Returns the key fields of a document.
    ///
    /// # Errors
    ///
    /// Returns an error if a wide table row has no clustering key.
    pub fn key_fields(
        &self,
        key: &DecoratedKey,
        clustering: Option<&ClusteringKey>,
    ) -> IndexResult<Vec<Field>> {
        let mut fields = vec![self.partition.indexable_field(key)];
        fields.extend(self.partition.token_field(key));
        match (&self.clustering, clustering) {
            (Some(mapper), Some(clustering)) => {
                let partition_field = self.partition.field_bytes(key);
                fields.extend(mapper.indexable_fields(&partition_field, clustering)?);
            }
            (Some(_), None) => {
                return Err(IndexError::invalid_operation(
                    "wide table documents need a clustering key",
                ))
            }
            (None, _) => {}
        }
        Ok(fields)
    }

    /// Returns the term of the document for a partition or row.
    ///
    /// Without a clustering key this is the partition term, which for
    /// wide tables matches every row of the partition.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary key is too long to encode.
    pub fn term(&self, key: &DecoratedKey, clustering: Option<&ClusteringKey>) -> IndexResult<Term> {
        match (&self.clustering, clustering) {
            (Some(mapper), Some(clustering)) => {
                mapper.term(&self.partition.field_bytes(key), clustering)
            }
            _ => Ok(self.partition.term(key)),
        }
    }

    /// Recovers the primary key of a document.
    ///
    /// # Errors
    ///
    /// Returns a key decoding error if a stored key is missing or invalid.
    pub fn primary_key(
        &self,
        document: &Document,
    ) -> IndexResult<(DecoratedKey, Option<ClusteringKey>)> {
        let key = self.partition.decorated_key(document)?;
        let clustering = match &self.clustering {
            Some(mapper) => Some(mapper.clustering(document)?),
            None => None,
        };
        Ok((key, clustering))
    }

    /// Returns the native-order document comparator.
    pub fn sort(&self) -> KeySort {
        KeySort::new(self.partition.clone(), self.clustering.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use quarry_codec::CellType;

    #[test]
    fn skinny_term_is_partition_term() {
        let schema = TableSchema::new("ks", "t").partition_key("id", CellType::Text);
        let keys = KeyMapper::new(&schema, Arc::new(HashPartitioner)).unwrap();
        let key = keys.partition().decorate(Bytes::from_static(b"k1"));
        assert!(!keys.is_wide());
        assert_eq!(keys.term(&key, None).unwrap(), keys.partition().term(&key));
        assert_eq!(keys.key_fields(&key, None).unwrap().len(), 2);
    }

    #[test]
    fn wide_needs_clustering_for_fields() {
        let schema = TableSchema::new("ks", "t")
            .partition_key("id", CellType::Text)
            .clustering("c", CellType::Text);
        let keys = KeyMapper::new(&schema, Arc::new(OrderedPartitioner)).unwrap();
        let key = keys.partition().decorate(Bytes::from_static(b"k1"));
        assert!(keys.key_fields(&key, None).is_err());

        let ck = ClusteringKey::from_components(&[b"c1".as_slice()]).unwrap();
        let mut doc = Document::new();
        for field in keys.key_fields(&key, Some(&ck)).unwrap() {
            doc.add(field);
        }
        assert_eq!(keys.primary_key(&doc).unwrap(), (key.clone(), Some(ck.clone())));
        assert_ne!(keys.term(&key, Some(&ck)).unwrap(), keys.term(&key, None).unwrap());

        let columns = keys.columns(&key, Some(&ck)).unwrap();
        assert_eq!(columns.len(), 2);
    }
}
