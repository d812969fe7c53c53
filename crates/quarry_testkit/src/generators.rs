//! Property-based test generators using proptest.

use crate::fixtures::{ck, int, static_row, text, wide_row};
use crate::memory_table::Mutation;
use proptest::prelude::*;
use quarry_codec::{CellType, Value};
use quarry_core::{Cell, ClusteringRange, LivenessInfo, Row};

/// Strategy for partition key strings.
pub fn partition_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]{1,12}").expect("Invalid regex")
}

/// Strategy for `int` column values, edges included.
pub fn int_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(i64::from(i32::MIN)),
        Just(-1i64),
        Just(0i64),
        Just(i64::from(i32::MAX)),
        any::<i32>().prop_map(i64::from),
    ]
}

/// Strategy for a typed key component and its value.
pub fn key_component_strategy() -> impl Strategy<Value = (CellType, Value)> {
    prop_oneof![
        any::<i32>().prop_map(|n| (CellType::Int, Value::Integer(i64::from(n)))),
        any::<i64>().prop_map(|n| (CellType::BigInt, Value::Integer(n))),
        "[a-zA-Z0-9 ]{0,16}".prop_map(|s| (CellType::Text, Value::Text(s))),
        any::<bool>().prop_map(|b| (CellType::Boolean, Value::Bool(b))),
        any::<u128>().prop_map(|n| (CellType::Uuid, Value::Uuid(uuid::Uuid::from_u128(n)))),
    ]
}

/// One event a transaction over a wide partition may carry.
#[derive(Debug, Clone)]
pub enum WideEvent {
    /// Index a row image.
    Index {
        /// Clustering value.
        seq: i64,
        /// Value of `a`.
        a: i64,
    },
    /// Index a partial image carrying only `a`, without liveness.
    Partial {
        /// Clustering value.
        seq: i64,
        /// Value of `a`.
        a: i64,
    },
    /// Delete one row.
    DeleteRow {
        /// Clustering value.
        seq: i64,
    },
    /// Delete an inclusive clustering range.
    DeleteRange {
        /// Lower bound.
        from: i64,
        /// Upper bound.
        to: i64,
    },
    /// Set the static `owner` column.
    Static {
        /// New owner.
        owner: String,
    },
    /// Delete the whole partition.
    DeletePartition,
}

impl WideEvent {
    /// Returns the row mutation this event stores, if it is a row write.
    pub fn mutation(&self, timestamp: i64) -> Option<Mutation> {
        match self {
            Self::Index { seq, a } => Some(Mutation::Row(wide_row(*seq, *a, timestamp))),
            Self::Partial { seq, a } => Some(Mutation::Row(partial_row(*seq, *a, timestamp))),
            Self::Static { owner } => Some(Mutation::Row(static_row(owner, timestamp))),
            Self::DeletePartition => Some(Mutation::DeletePartition(timestamp)),
            Self::DeleteRow { seq } => {
                Some(Mutation::Row(Row::clustered(ck(*seq)).with_deletion(timestamp)))
            }
            Self::DeleteRange { .. } => None,
        }
    }

    /// Returns the range of a range deletion.
    pub fn range(&self) -> Option<ClusteringRange> {
        match self {
            Self::DeleteRange { from, to } => {
                Some(ClusteringRange::inclusive(ck(*from), ck(*to)))
            }
            _ => None,
        }
    }
}

/// A clustered row carrying only `a`, with no liveness info.
pub fn partial_row(seq: i64, a: i64, timestamp: i64) -> Row {
    Row::clustered(ck(seq)).with_cell(Cell::live("a", int(a), timestamp))
}

/// A clustered row whose cells and liveness expired before `now_in_sec`.
pub fn expired_row(seq: i64, a: i64, timestamp: i64, now_in_sec: i64) -> Row {
    Row::clustered(ck(seq))
        .with_liveness(LivenessInfo::expiring(timestamp, 1, now_in_sec - 10))
        .with_cell(Cell::expiring("a", int(a), timestamp, 1, now_in_sec - 10))
}

/// Strategy for one wide-partition event over a small clustering domain.
pub fn wide_event_strategy() -> impl Strategy<Value = WideEvent> {
    let seq = 0i64..6;
    prop_oneof![
        4 => (seq.clone(), int_strategy()).prop_map(|(seq, a)| WideEvent::Index { seq, a }),
        2 => (seq.clone(), int_strategy()).prop_map(|(seq, a)| WideEvent::Partial { seq, a }),
        2 => seq.clone().prop_map(|seq| WideEvent::DeleteRow { seq }),
        1 => (seq.clone(), seq).prop_map(|(a, b)| WideEvent::DeleteRange {
            from: a.min(b),
            to: a.max(b),
        }),
        1 => "[a-z]{1,6}".prop_map(|owner| WideEvent::Static { owner }),
        1 => Just(WideEvent::DeletePartition),
    ]
}

/// Strategy for a transaction's worth of wide events.
pub fn wide_transaction_strategy() -> impl Strategy<Value = Vec<WideEvent>> {
    prop::collection::vec(wide_event_strategy(), 1..8)
}

/// Strategy for encoded `text` partition keys.
pub fn encoded_key_strategy() -> impl Strategy<Value = Vec<u8>> {
    partition_key_strategy().prop_map(|s| text(&s))
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn ranges_are_ordered(event in wide_event_strategy()) {
            if let WideEvent::DeleteRange { from, to } = event {
                prop_assert!(from <= to);
            }
        }

        #[test]
        fn row_events_carry_mutations(event in wide_event_strategy()) {
            prop_assert_eq!(event.mutation(1).is_none(), event.range().is_some());
        }

        #[test]
        fn int_values_fit_column(n in int_strategy()) {
            prop_assert!(i32::try_from(n).is_ok());
        }
    }
}
