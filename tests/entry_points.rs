//! Process-wide entry points exercised from real threads.
//!
//! Each test runs on its own thread and therefore starts with an empty free
//! list, but all of them share the one data segment.

use std::{sync::mpsc, thread};

use fitalloc::{
    allocate_best_fit, allocate_first_fit, allocate_threadsafe_locked,
    allocate_threadsafe_unlocked, free_best_fit, free_first_fit, free_threadsafe_locked,
    free_threadsafe_unlocked, segment_bytes_free, segment_bytes_total, BLOCK_HEADER_SIZE,
    WORD_SIZE,
};

/// Raw pointers are not `Send`; this moves one between threads on purpose.
struct SendPtr(*mut u8);

unsafe impl Send for SendPtr {}

#[test]
fn round_trip_recycles_without_growing() {
    for (alloc, free) in [
        (allocate_first_fit as fn(usize) -> *mut u8, free_first_fit as unsafe fn(*mut u8)),
        (allocate_best_fit, free_best_fit),
        (allocate_threadsafe_locked, free_threadsafe_locked),
        (allocate_threadsafe_unlocked, free_threadsafe_unlocked),
    ] {
        let first = alloc(120);
        assert!(!first.is_null());
        assert_eq!(first as usize % WORD_SIZE, 0);

        unsafe {
            first.write_bytes(0xC3, 120);
            free(first);
        }

        let second = alloc(120);
        assert_eq!(first, second);
        unsafe { free(second) };
    }
}

#[test]
fn free_bytes_are_thread_private() {
    let block = allocate_best_fit(64);
    unsafe { free_best_fit(block) };
    let mine = segment_bytes_free();
    assert_eq!(mine, 64 + BLOCK_HEADER_SIZE);

    let theirs = thread::spawn(|| {
        let ptr = allocate_threadsafe_unlocked(512);
        unsafe { free_threadsafe_unlocked(ptr) };
        segment_bytes_free()
    })
    .join()
    .unwrap();

    assert_eq!(theirs, 512 + BLOCK_HEADER_SIZE);
    assert_eq!(segment_bytes_free(), mine);
}

#[test]
fn block_freed_on_another_thread_joins_that_threads_list() {
    let ptr = SendPtr(allocate_threadsafe_locked(200));
    let before = segment_bytes_free();

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let ptr = ptr;
        unsafe { free_threadsafe_locked(ptr.0) };
        tx.send(segment_bytes_free()).unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(rx.recv().unwrap(), 200 + BLOCK_HEADER_SIZE);
    assert_eq!(segment_bytes_free(), before);
}

#[test]
fn segment_total_never_decreases() {
    let mut last = segment_bytes_total();
    let mut live = Vec::new();

    for i in 0..200 {
        live.push(allocate_first_fit(16 + i % 64));
        let now = segment_bytes_total();
        assert!(now >= last);
        last = now;
    }

    for ptr in live {
        unsafe { free_first_fit(ptr) };
        let now = segment_bytes_total();
        assert!(now >= last);
        last = now;
    }

    assert!(segment_bytes_free() > 0);
}

#[test]
fn concurrent_workers_keep_their_data() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 500;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            thread::spawn(move || {
                let mut live: Vec<(*mut u8, usize, u8)> = Vec::new();

                for i in 0..ROUNDS {
                    let size = 8 + (t * 31 + i * 17) % 240;
                    let fill = (t * ROUNDS + i) as u8;
                    let ptr = if t % 2 == 0 {
                        allocate_threadsafe_locked(size)
                    } else {
                        allocate_threadsafe_unlocked(size)
                    };
                    assert!(!ptr.is_null());
                    unsafe { ptr.write_bytes(fill, size) };
                    live.push((ptr, size, fill));

                    if live.len() > 16 {
                        let (ptr, size, fill) = live.remove(i % live.len());
                        unsafe {
                            let bytes = std::slice::from_raw_parts(ptr, size);
                            assert!(bytes.iter().all(|b| *b == fill));
                            if t % 2 == 0 {
                                free_threadsafe_locked(ptr);
                            } else {
                                free_threadsafe_unlocked(ptr);
                            }
                        }
                    }
                }

                for (ptr, size, fill) in live {
                    unsafe {
                        let bytes = std::slice::from_raw_parts(ptr, size);
                        assert!(bytes.iter().all(|b| *b == fill));
                        free_threadsafe_unlocked(ptr);
                    }
                }

                segment_bytes_free()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap() > 0);
    }
}
