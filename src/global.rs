use std::alloc::{GlobalAlloc, Layout, System};

use crate::{malloc, utils::WORD_SIZE};

/// Lets the thread-private best-fit allocator back Rust's own heap.
///
/// ```ignore
/// #[global_allocator]
/// static ALLOCATOR: fitalloc::FitAlloc = fitalloc::FitAlloc;
/// ```
///
/// Blocks are only guaranteed word alignment, so layouts asking for more are
/// served by [`System`] instead. `dealloc` makes the same decision from the
/// layout it is given, so every pointer goes back where it came from.
///
/// No logger may be installed that allocates through this allocator: a log
/// call made while the free list is borrowed would see the allocation fail.
pub struct FitAlloc;

impl FitAlloc {
    #[inline]
    fn is_over_aligned(layout: Layout) -> bool {
        layout.align() > WORD_SIZE
    }
}

unsafe impl GlobalAlloc for FitAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if Self::is_over_aligned(layout) {
            return unsafe { System.alloc(layout) };
        }

        malloc::allocate_threadsafe_unlocked(layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if Self::is_over_aligned(layout) {
            return unsafe { System.dealloc(ptr, layout) };
        }

        unsafe { malloc::free_threadsafe_unlocked(ptr) }
    }
}
