//! The storage engine's read path, as seen by the writer.

use crate::error::IndexResult;
use crate::key::{ClusteringKey, DecoratedKey};
use crate::row::Row;
use crate::types::OpGroup;

/// Rows read from one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionRead {
    /// Static row of a wide partition, if it has one.
    pub static_row: Option<Row>,
    /// The partition's row (skinny) or the requested clustering rows
    /// (wide), in clustering order.
    pub rows: Vec<Row>,
}

impl PartitionRead {
    /// Returns the row with clustering key `clustering`.
    pub fn row(&self, clustering: &ClusteringKey) -> Option<&Row> {
        self.rows
            .iter()
            .find(|r| r.clustering() == Some(clustering))
    }

    /// Returns true if nothing was read.
    pub fn is_empty(&self) -> bool {
        self.static_row.is_none() && self.rows.is_empty()
    }
}

/// Point reads against committed table data.
///
/// Reads are scoped to an [`OpGroup`]: they observe every write ordered
/// before the group and none at or after it. Reads may block.
pub trait RowReader: Send + Sync {
    /// Reads a partition.
    ///
    /// With `clusterings` set only those rows are returned; with `None`
    /// every row is. Returns `None` if the partition holds no data.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the read fails.
    fn read_partition(
        &self,
        key: &DecoratedKey,
        clusterings: Option<&[ClusteringKey]>,
        now_in_sec: i64,
        op_group: OpGroup,
    ) -> IndexResult<Option<PartitionRead>>;
}
