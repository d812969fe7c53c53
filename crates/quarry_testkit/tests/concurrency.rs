//! Writers over distinct partitions running in parallel.

use quarry_core::{Query, Term};
use quarry_testkit::prelude::*;
use std::thread;

const THREADS: i64 = 8;
const ROWS_PER_PARTITION: i64 = 25;

#[test]
fn parallel_partitions_index_independently() {
    init_test_logging();
    let index = TestIndex::new(wide_table(), r#"{"fields": {"a": {"type": "integer"}}}"#);

    thread::scope(|scope| {
        for t in 0..THREADS {
            let index = &index;
            scope.spawn(move || {
                let key = index.key(&format!("device-{t}"));
                for seq in 0..ROWS_PER_PARTITION {
                    let ts = seq + 1;
                    index
                        .update(&key, vec![Mutation::Row(wide_row(seq, t, ts))])
                        .unwrap();
                }
                index
                    .update(
                        &key,
                        vec![Mutation::Row(
                            quarry_core::Row::clustered(ck(0)).with_deletion(ROWS_PER_PARTITION + 1),
                        )],
                    )
                    .unwrap();
            });
        }
    });

    let expected = usize::try_from(THREADS * (ROWS_PER_PARTITION - 1)).unwrap();
    assert_eq!(index.num_docs().unwrap(), expected);
    for t in 0..THREADS {
        let hits = index
            .search(&Query::Term(Term::long("a", t)), 1_000)
            .unwrap();
        assert_eq!(hits.len(), usize::try_from(ROWS_PER_PARTITION - 1).unwrap());
        assert!(hits.iter().all(|h| h.key == index.key(&format!("device-{t}"))));
    }
    let stats = index.stats().snapshot();
    assert_eq!(stats.transactions_finished, u64::try_from(THREADS * (ROWS_PER_PARTITION + 1)).unwrap());
}
