//! Native-order comparator over index documents.

use super::clustering::{ClusteringKey, ClusteringMapper};
use super::partition::{PartitionMapper, PARTITION_KEY_FIELD};
use super::partitioner::DecoratedKey;
use crate::document::Document;
use std::cmp::Ordering;

/// Sorts documents by partition then clustering, in the storage engine's
/// native order rather than bytewise.
#[derive(Debug, Clone)]
pub struct KeySort {
    partition: PartitionMapper,
    clustering: Option<ClusteringMapper>,
}

impl KeySort {
    /// Creates a comparator.
    pub fn new(partition: PartitionMapper, clustering: Option<ClusteringMapper>) -> Self {
        Self {
            partition,
            clustering,
        }
    }

    /// Compares two decoded primary keys.
    pub fn compare_keys(
        &self,
        a: (&DecoratedKey, Option<&ClusteringKey>),
        b: (&DecoratedKey, Option<&ClusteringKey>),
    ) -> Ordering {
        self.partition.compare(a.0, b.0).then_with(|| {
            match (&self.clustering, a.1, b.1) {
                (Some(mapper), Some(x), Some(y)) => mapper.compare(x, y),
                (_, None, Some(_)) => Ordering::Less,
                (_, Some(_), None) => Ordering::Greater,
                _ => Ordering::Equal,
            }
        })
    }

    /// Compares two documents by the keys they were built from.
    ///
    /// Documents whose keys cannot be decoded fall back to the bytewise
    /// order of their stored partition key and sort after valid ones.
    pub fn compare_documents(&self, a: &Document, b: &Document) -> Ordering {
        let key = |doc: &Document| {
            let partition = self.partition.decorated_key(doc).ok()?;
            let clustering = match &self.clustering {
                Some(mapper) => Some(mapper.clustering(doc).ok()?),
                None => None,
            };
            Some((partition, clustering))
        };
        match (key(a), key(b)) {
            (Some((pa, ca)), Some((pb, cb))) => {
                self.compare_keys((&pa, ca.as_ref()), (&pb, cb.as_ref()))
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a
                .stored_bytes(PARTITION_KEY_FIELD)
                .cmp(&b.stored_bytes(PARTITION_KEY_FIELD)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{HashPartitioner, KeyMapper};
    use crate::schema::TableSchema;
    use bytes::Bytes;
    use quarry_codec::{encode, CellType, Value};
    use std::sync::Arc;

    fn wide() -> KeyMapper {
        let schema = TableSchema::new("ks", "t")
            .partition_key("p", CellType::Text)
            .clustering("c", CellType::Int);
        KeyMapper::new(&schema, Arc::new(HashPartitioner)).unwrap()
    }

    fn ck(n: i64) -> ClusteringKey {
        ClusteringKey::from_components(&[encode(&CellType::Int, &Value::Integer(n)).unwrap()])
            .unwrap()
    }

    fn doc(keys: &KeyMapper, key: &DecoratedKey, c: &ClusteringKey) -> Document {
        let mut doc = Document::new();
        for field in keys.key_fields(key, Some(c)).unwrap() {
            doc.add(field);
        }
        doc
    }

    #[test]
    fn clustering_order_is_signed() {
        let keys = wide();
        let sort = keys.sort();
        let pk = keys.partition().decorate(Bytes::from_static(b"p1"));
        let neg = doc(&keys, &pk, &ck(-3));
        let pos = doc(&keys, &pk, &ck(2));
        assert_eq!(sort.compare_documents(&neg, &pos), Ordering::Less);
        assert_eq!(sort.compare_documents(&pos, &neg), Ordering::Greater);
        assert_eq!(sort.compare_documents(&pos, &pos), Ordering::Equal);
    }

    #[test]
    fn partition_order_first() {
        let keys = wide();
        let sort = keys.sort();
        let a = keys.partition().decorate(Bytes::from_static(b"a"));
        let b = keys.partition().decorate(Bytes::from_static(b"b"));
        let expected = keys.partition().compare(&a, &b);
        assert_eq!(
            sort.compare_documents(&doc(&keys, &a, &ck(9)), &doc(&keys, &b, &ck(-9))),
            expected
        );
    }

    #[test]
    fn undecodable_documents_sort_last() {
        let keys = wide();
        let sort = keys.sort();
        let pk = keys.partition().decorate(Bytes::from_static(b"p1"));
        let valid = doc(&keys, &pk, &ck(1));
        assert_eq!(sort.compare_documents(&valid, &Document::new()), Ordering::Less);
    }
}
