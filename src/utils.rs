//! This file contains all the helper functions for the allocator.
//! This are functions that don't particularly belong to any concrete module of the program.

use std::mem;

/// Machine word size. Every header and payload handed out by the allocator
/// is aligned to this.
pub const WORD_SIZE: usize = mem::size_of::<usize>();

/// It aligns `to_be_aligned` using `aligment`.
///
/// This method is used to align requested sizes to be a multiple of the
/// computer's pointer size and arena capacities to be a multiple of
/// [`crate::kernel::page_size`]. `aligment` must be a power of two.
pub fn align(to_be_aligned: usize, aligment: usize) -> usize {
    (to_be_aligned + aligment - 1) & !(aligment - 1)
}

/// Same as [`align`] but returns `None` instead of wrapping when
/// `to_be_aligned` is too close to `usize::MAX`.
pub fn checked_align(to_be_aligned: usize, aligment: usize) -> Option<usize> {
    to_be_aligned
        .checked_add(aligment - 1)
        .map(|size| size & !(aligment - 1))
}
