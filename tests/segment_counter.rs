//! The cumulative segment counter under concurrent growth.
//!
//! This binary holds a single test so nothing else grows the process-wide
//! segment while it runs. Fresh threads start with empty free lists, so
//! every allocation below grows the segment by exactly its rounded size plus
//! one header, and the counter must account for every one of them.

use std::thread;

use fitalloc::{allocate_threadsafe_unlocked, segment_bytes_total, BLOCK_HEADER_SIZE, WORD_SIZE};

#[test]
fn concurrent_growth_is_counted_exactly() {
    const THREADS: usize = 8;
    const ALLOCATIONS: usize = 250;

    let before = segment_bytes_total();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            thread::spawn(move || {
                let mut grown = 0;

                for i in 0..ALLOCATIONS {
                    let size = 1 + (t * 7 + i * 13) % 100;
                    let ptr = allocate_threadsafe_unlocked(size);
                    assert!(!ptr.is_null());
                    grown += size.div_ceil(WORD_SIZE) * WORD_SIZE + BLOCK_HEADER_SIZE;
                }

                grown
            })
        })
        .collect();

    let expected: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(segment_bytes_total() - before, expected);
}
