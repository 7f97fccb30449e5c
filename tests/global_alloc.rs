//! Integration test: use FitAlloc as the global allocator and exercise
//! standard Rust collections.

use std::collections::HashMap;

use fitalloc::FitAlloc;

#[global_allocator]
static GLOBAL: FitAlloc = FitAlloc;

#[test]
fn test_box() {
    let b = Box::new(42u64);
    assert_eq!(*b, 42);
    drop(b);
}

#[test]
fn test_vec_growth() {
    let mut v = Vec::new();
    for i in 0..10_000 {
        v.push(i);
    }
    assert_eq!(v.len(), 10_000);
    assert_eq!(v[5_000], 5_000);
}

#[test]
fn test_string() {
    let mut s = String::new();
    for _ in 0..100 {
        s.push_str("hello world ");
    }
    assert_eq!(s.len(), 1_200);
}

#[test]
fn test_hashmap() {
    // Table storage is over-aligned on some targets and takes the System path.
    let mut map = HashMap::new();
    for i in 0..500 {
        map.insert(i, format!("value_{i}"));
    }
    assert_eq!(map.len(), 500);
    assert_eq!(map[&42], "value_42");
}

#[test]
fn test_freed_memory_is_reused() {
    let a = Box::new([0u8; 64]);
    drop(a);

    let free = fitalloc::segment_bytes_free();
    assert!(free >= 64 + fitalloc::BLOCK_HEADER_SIZE);

    let b = Box::new([1u8; 64]);
    assert!(fitalloc::segment_bytes_free() < free);
    assert!(b.iter().all(|x| *x == 1));
}

#[test]
fn test_threads() {
    let handles: Vec<_> = (0..8)
        .map(|t| {
            std::thread::spawn(move || {
                let mut vecs: Vec<Vec<u64>> = Vec::new();
                for i in 0..500 {
                    vecs.push((0..50).map(|x| x + t * 1_000 + i).collect());
                    if vecs.len() > 10 {
                        vecs.remove(0);
                    }
                }
                vecs.iter().map(|v| v.len()).sum::<usize>()
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap(), 500);
    }
}

#[test]
fn test_cross_thread_free() {
    let (tx, rx) = std::sync::mpsc::channel::<Vec<Box<[u8; 64]>>>();

    let producer = std::thread::spawn(move || {
        let items = (0..200).map(|i| Box::new([i as u8; 64])).collect();
        tx.send(items).unwrap();
    });

    let items = rx.recv().unwrap();
    producer.join().unwrap();

    for (i, item) in items.iter().enumerate() {
        assert!(item.iter().all(|b| *b == i as u8));
    }
    drop(items);
}
