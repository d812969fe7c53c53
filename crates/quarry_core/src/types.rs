//! Core type definitions for the write path.

use std::fmt;

/// Operation-ordering token handed out by the storage engine.
///
/// A read started under group `g` observes every write committed with a
/// lower sequence and nothing at or after `g`. Writers carry the group of
/// the mutation they index, so a read-before-write never sees its own
/// not-yet-committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpGroup(pub u64);

impl OpGroup {
    /// Creates a new operation group.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next operation group.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns true if a write at `seq` is visible to reads in this group.
    #[must_use]
    pub const fn observes(self, seq: u64) -> bool {
        seq < self.0
    }
}

impl fmt::Display for OpGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op:{}", self.0)
    }
}

/// Kind of storage-engine transaction a writer is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// A regular client write.
    Update,
    /// Rows rewritten by compaction.
    Compaction,
    /// Node cleanup of ranges it no longer owns.
    Cleanup,
    /// Primary-key repair streaming partial row images.
    Repair,
}

impl TransactionKind {
    /// Returns true if finishing this kind must always read the current
    /// row before writing.
    #[must_use]
    pub const fn forces_read_before_write(self) -> bool {
        matches!(self, Self::Compaction | Self::Repair)
    }

    /// Returns true if finishing this kind has no effect on the index.
    #[must_use]
    pub const fn is_noop(self) -> bool {
        matches!(self, Self::Cleanup)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Update => "update",
            Self::Compaction => "compaction",
            Self::Cleanup => "cleanup",
            Self::Repair => "repair",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_group_visibility() {
        let group = OpGroup::new(5);
        assert!(group.observes(4));
        assert!(!group.observes(5));
        assert!(!group.observes(6));
        assert_eq!(group.next().as_u64(), 6);
    }

    #[test]
    fn op_group_display() {
        assert_eq!(format!("{}", OpGroup::new(42)), "op:42");
    }

    #[test]
    fn kind_decisions() {
        assert!(TransactionKind::Compaction.forces_read_before_write());
        assert!(TransactionKind::Repair.forces_read_before_write());
        assert!(!TransactionKind::Update.forces_read_before_write());
        assert!(TransactionKind::Cleanup.is_noop());
        assert!(!TransactionKind::Update.is_noop());
    }
}
