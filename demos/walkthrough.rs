//! Walks through placement, splitting and merging on the process data
//! segment and prints what happens at each step.

use fitalloc::{
    allocate_best_fit, allocate_first_fit, free_best_fit, free_first_fit, segment_bytes_free,
    segment_bytes_total, BLOCK_HEADER_SIZE,
};

fn log_alloc(label: &str, addr: *mut u8, size: usize) {
    println!("[{label}] requested {size} bytes, received {addr:?}");
    println!(
        "    segment total = {} bytes, free on this thread = {} bytes",
        segment_bytes_total(),
        segment_bytes_free(),
    );
}

fn main() {
    println!("Header size: {BLOCK_HEADER_SIZE} bytes\n");

    unsafe {
        let a = allocate_first_fit(8);
        log_alloc("a", a, 8);

        let b = allocate_first_fit(64);
        log_alloc("b", b, 64);

        let c = allocate_first_fit(16);
        log_alloc("c", c, 16);

        let _guard = allocate_first_fit(8);

        free_first_fit(a);
        println!("\nfreed a, free on this thread = {}", segment_bytes_free());

        let d = allocate_first_fit(8);
        log_alloc("d (should reuse a)", d, 8);

        free_first_fit(d);
        free_first_fit(c);
        println!("\nfreed a and c, free on this thread = {}", segment_bytes_free());

        // Releasing b bridges a and c into a single free block.
        free_best_fit(b);
        println!("freed b, free on this thread = {}", segment_bytes_free());

        let e = allocate_best_fit(64 + 16);
        log_alloc("e (fits in the merged run)", e, 64 + 16);

        if e == d {
            println!("Correctly reused the merged run at {e:?}");
        } else {
            println!("Merged run not reused. a was at {d:?} and e is at {e:?}");
        }

        free_best_fit(e);
    }
}
