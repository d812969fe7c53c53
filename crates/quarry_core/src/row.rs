//! Row images as delivered by the storage engine.
//!
//! Timestamps are write timestamps in microseconds; `now_in_sec` and local
//! deletion times are seconds since the epoch.

use crate::key::ClusteringKey;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};

/// One cell of a row.
///
/// Multi-cell columns use one cell per element: lists are keyed by a
/// timeuuid path, sets by the element (with an empty value), maps by the
/// entry key and non-frozen UDTs by the field index as a big-endian `i16`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Column name.
    pub column: String,
    /// Element path for multi-cell columns.
    pub path: Option<Bytes>,
    /// Serialized value; empty for tombstones.
    pub value: Bytes,
    /// Write timestamp in microseconds.
    pub timestamp: i64,
    /// Time to live in seconds, for expiring cells.
    pub ttl: Option<u32>,
    /// When the cell stops being live, in seconds.
    pub local_deletion_time: Option<i64>,
    /// Whether this cell is a deletion marker.
    pub tombstone: bool,
}

impl Cell {
    /// Creates a live cell.
    pub fn live(column: impl Into<String>, value: impl Into<Bytes>, timestamp: i64) -> Self {
        Self {
            column: column.into(),
            path: None,
            value: value.into(),
            timestamp,
            ttl: None,
            local_deletion_time: None,
            tombstone: false,
        }
    }

    /// Creates a cell expiring `ttl` seconds after `now_in_sec`.
    pub fn expiring(
        column: impl Into<String>,
        value: impl Into<Bytes>,
        timestamp: i64,
        ttl: u32,
        now_in_sec: i64,
    ) -> Self {
        Self {
            ttl: Some(ttl),
            local_deletion_time: Some(now_in_sec + i64::from(ttl)),
            ..Self::live(column, value, timestamp)
        }
    }

    /// Creates a deletion marker.
    pub fn tombstone(column: impl Into<String>, timestamp: i64, now_in_sec: i64) -> Self {
        Self {
            local_deletion_time: Some(now_in_sec),
            tombstone: true,
            ..Self::live(column, Bytes::new(), timestamp)
        }
    }

    /// Sets the element path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<Bytes>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Returns true if the cell holds data as of `now_in_sec`.
    #[must_use]
    pub fn is_live(&self, now_in_sec: i64) -> bool {
        if self.tombstone {
            return false;
        }
        self.local_deletion_time.map_or(true, |t| now_in_sec < t)
    }

    /// Returns true if this cell wins reconciliation against `other`.
    ///
    /// Higher timestamps win; on a tie a tombstone wins, then the
    /// later-expiring cell, then the greater value.
    #[must_use]
    pub fn supersedes(&self, other: &Cell) -> bool {
        if self.timestamp != other.timestamp {
            return self.timestamp > other.timestamp;
        }
        if self.tombstone != other.tombstone {
            return self.tombstone;
        }
        let expiry = |c: &Cell| c.local_deletion_time.unwrap_or(i64::MAX);
        if expiry(self) != expiry(other) {
            return expiry(self) > expiry(other);
        }
        self.value >= other.value
    }
}

/// Primary key liveness: whether the row exists independently of its
/// cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessInfo {
    /// Write timestamp in microseconds.
    pub timestamp: i64,
    /// When the row marker expires, in seconds.
    pub expires_at: Option<i64>,
}

impl LivenessInfo {
    /// Creates non-expiring liveness.
    #[must_use]
    pub const fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            expires_at: None,
        }
    }

    /// Creates liveness expiring `ttl` seconds after `now_in_sec`.
    #[must_use]
    pub fn expiring(timestamp: i64, ttl: u32, now_in_sec: i64) -> Self {
        Self {
            timestamp,
            expires_at: Some(now_in_sec + i64::from(ttl)),
        }
    }

    /// Returns true if the row marker is live as of `now_in_sec`.
    #[must_use]
    pub fn is_live(&self, now_in_sec: i64) -> bool {
        self.expires_at.map_or(true, |t| now_in_sec < t)
    }
}

/// A row image: a partition's only row (skinny), one clustering row, or
/// the static row of a wide partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    clustering: Option<ClusteringKey>,
    is_static: bool,
    liveness: Option<LivenessInfo>,
    deletion: Option<i64>,
    cells: Vec<Cell>,
}

impl Row {
    /// Creates the row of a skinny partition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clustering row of a wide partition.
    #[must_use]
    pub fn clustered(clustering: ClusteringKey) -> Self {
        Self {
            clustering: Some(clustering),
            ..Self::default()
        }
    }

    /// Creates the static row of a wide partition.
    #[must_use]
    pub fn static_row() -> Self {
        Self {
            is_static: true,
            ..Self::default()
        }
    }

    /// Sets primary key liveness.
    #[must_use]
    pub fn with_liveness(mut self, liveness: LivenessInfo) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// Sets a row deletion at `timestamp`.
    #[must_use]
    pub fn with_deletion(mut self, timestamp: i64) -> Self {
        self.deletion = Some(timestamp);
        self
    }

    /// Adds a cell.
    #[must_use]
    pub fn with_cell(mut self, cell: Cell) -> Self {
        self.cells.push(cell);
        self
    }

    /// Adds a cell in place.
    pub fn add_cell(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Returns the clustering key.
    pub fn clustering(&self) -> Option<&ClusteringKey> {
        self.clustering.as_ref()
    }

    /// Returns true for the static row.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Returns primary key liveness.
    pub fn liveness(&self) -> Option<&LivenessInfo> {
        self.liveness.as_ref()
    }

    /// Returns the row deletion timestamp.
    pub fn deletion(&self) -> Option<i64> {
        self.deletion
    }

    /// Returns every cell, live or not.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns true if the row carries no information at all.
    pub fn is_empty(&self) -> bool {
        self.liveness.is_none() && self.deletion.is_none() && self.cells.is_empty()
    }

    fn shadowed(&self, timestamp: i64) -> bool {
        self.deletion.is_some_and(|d| timestamp <= d)
    }

    /// Returns the cells live as of `now_in_sec` and not covered by the
    /// row deletion.
    pub fn live_cells(&self, now_in_sec: i64) -> impl Iterator<Item = &Cell> {
        self.cells
            .iter()
            .filter(move |c| c.is_live(now_in_sec) && !self.shadowed(c.timestamp))
    }

    /// Returns true if the row has any live data as of `now_in_sec`.
    pub fn has_live_data(&self, now_in_sec: i64) -> bool {
        let marker = self
            .liveness
            .is_some_and(|l| l.is_live(now_in_sec) && !self.shadowed(l.timestamp));
        marker || self.live_cells(now_in_sec).next().is_some()
    }

    /// Returns the names of every column with a cell in this image,
    /// tombstones included.
    pub fn columns_present(&self) -> BTreeSet<&str> {
        self.cells.iter().map(|c| c.column.as_str()).collect()
    }

    /// Reconciles two images of the same row.
    ///
    /// Cells are reconciled per column and path; the greater row deletion
    /// and the newer liveness win, and anything the resulting deletion
    /// covers is purged.
    #[must_use]
    pub fn merge(older: &Row, newer: &Row) -> Row {
        let deletion = older.deletion.max(newer.deletion);
        let liveness = match (older.liveness, newer.liveness) {
            (Some(a), Some(b)) => Some(if b.timestamp >= a.timestamp { b } else { a }),
            (a, b) => b.or(a),
        }
        .filter(|l| deletion.map_or(true, |d| l.timestamp > d));

        let mut cells: BTreeMap<(&str, Option<&[u8]>), &Cell> = BTreeMap::new();
        for cell in older.cells.iter().chain(&newer.cells) {
            let key = (cell.column.as_str(), cell.path.as_deref());
            match cells.get(&key) {
                Some(existing) if !cell.supersedes(existing) => {}
                _ => {
                    cells.insert(key, cell);
                }
            }
        }

        Row {
            clustering: newer.clustering.clone().or_else(|| older.clustering.clone()),
            is_static: newer.is_static || older.is_static,
            liveness,
            deletion,
            cells: cells
                .into_values()
                .filter(|c| deletion.map_or(true, |d| c.timestamp > d))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn cell_liveness() {
        assert!(Cell::live("a", vec![1u8], 1).is_live(NOW));
        assert!(!Cell::tombstone("a", 1, NOW).is_live(NOW));
        let expiring = Cell::expiring("a", vec![1u8], 1, 10, NOW);
        assert!(expiring.is_live(NOW + 9));
        assert!(!expiring.is_live(NOW + 10));
    }

    #[test]
    fn reconciliation_rules() {
        let old = Cell::live("a", vec![1u8], 1);
        let new = Cell::live("a", vec![0u8], 2);
        assert!(new.supersedes(&old));
        assert!(!old.supersedes(&new));

        let tomb = Cell::tombstone("a", 2, NOW);
        assert!(tomb.supersedes(&new));
        assert!(!new.supersedes(&tomb));

        let bigger = Cell::live("a", vec![9u8], 2);
        assert!(bigger.supersedes(&new));
    }

    #[test]
    fn has_live_data() {
        assert!(!Row::new().has_live_data(NOW));
        assert!(Row::new()
            .with_liveness(LivenessInfo::new(1))
            .has_live_data(NOW));
        assert!(Row::new()
            .with_cell(Cell::live("a", vec![1u8], 1))
            .has_live_data(NOW));

        let expired = Row::new()
            .with_liveness(LivenessInfo::expiring(1, 5, NOW - 10))
            .with_cell(Cell::expiring("a", vec![1u8], 1, 5, NOW - 10));
        assert!(!expired.has_live_data(NOW));
    }

    #[test]
    fn liveness_and_cell_expire_together() {
        let ttl = u32::MAX;
        let liveness = LivenessInfo::expiring(1, ttl, NOW);
        let cell = Cell::expiring("a", vec![1u8], 1, ttl, NOW);
        assert_eq!(liveness.expires_at, Some(NOW + i64::from(ttl)));
        assert_eq!(liveness.expires_at, cell.local_deletion_time);
        assert!(liveness.is_live(NOW + i64::from(ttl) - 1));
    }

    #[test]
    fn deletion_shadows_older_data() {
        let row = Row::new()
            .with_deletion(5)
            .with_liveness(LivenessInfo::new(5))
            .with_cell(Cell::live("a", vec![1u8], 4))
            .with_cell(Cell::live("b", vec![1u8], 6));
        let live: Vec<_> = row.live_cells(NOW).map(|c| c.column.as_str()).collect();
        assert_eq!(live, vec!["b"]);
        assert!(row.has_live_data(NOW));
    }

    #[test]
    fn merge_keeps_newest_cell_per_column() {
        let read = Row::new()
            .with_liveness(LivenessInfo::new(1))
            .with_cell(Cell::live("a", vec![1u8], 1))
            .with_cell(Cell::live("b", vec![1u8], 1));
        let pending = Row::new().with_cell(Cell::live("a", vec![2u8], 2));
        let merged = Row::merge(&read, &pending);

        assert_eq!(merged.cells().len(), 2);
        let a = merged.cells().iter().find(|c| c.column == "a").unwrap();
        assert_eq!(&a.value[..], &[2u8]);
        assert_eq!(merged.liveness(), Some(&LivenessInfo::new(1)));
    }

    #[test]
    fn merge_applies_deletion() {
        let read = Row::new()
            .with_liveness(LivenessInfo::new(1))
            .with_cell(Cell::live("a", vec![1u8], 1));
        let pending = Row::new()
            .with_deletion(3)
            .with_cell(Cell::live("b", vec![1u8], 4));
        let merged = Row::merge(&read, &pending);
        assert!(merged.liveness().is_none());
        assert_eq!(merged.columns_present().into_iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn merge_collection_elements_by_path() {
        let read = Row::new()
            .with_cell(Cell::live("tags", Bytes::new(), 1).with_path(b"x".to_vec()))
            .with_cell(Cell::live("tags", Bytes::new(), 1).with_path(b"y".to_vec()));
        let pending =
            Row::new().with_cell(Cell::tombstone("tags", 2, NOW).with_path(b"x".to_vec()));
        let merged = Row::merge(&read, &pending);
        assert_eq!(merged.cells().len(), 2);
        assert_eq!(merged.live_cells(NOW).count(), 1);
    }

    #[test]
    fn emptiness() {
        assert!(Row::new().is_empty());
        assert!(!Row::new().with_deletion(1).is_empty());
        assert!(Row::static_row().is_static());
    }
}
