//! # fitalloc
//!
//! A `malloc`/`free` replacement with two placement strategies, first fit and
//! best fit, over a single data segment that only ever grows.
//!
//! Every block, free or handed out, starts with a small header. While the
//! block is free the header also links it into its thread's free list:
//!
//! ```text
//!   data segment (grows ->)
//!
//!   +--------+---------+--------+---------+--------+---------+
//!   | header | payload | header | payload | header | payload |  ...
//!   +--------+---------+--------+---------+--------+---------+
//!       |       in use            free ^      free
//!       |                              |
//!       +-- thread free list: ---------+-------> (address order)
//! ```
//!
//! Each thread owns its free list, so allocation and release never contend
//! on it. Only growing the segment is shared, and that has its own lock.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let ptr = fitalloc::allocate_best_fit(64);
//! assert!(!ptr.is_null());
//!
//! unsafe { fitalloc::free_best_fit(ptr) };
//! assert!(fitalloc::segment_bytes_free() > 0);
//! ```
//!
//! The engine can also be driven directly, without the process-wide
//! state, by pairing a [`Heap`] with a [`Segment`]:
//!
//! ```rust,ignore
//! use fitalloc::{Arena, Fit, Heap, Segment};
//!
//! let segment = Segment::new(Arena::new(64 * 1024)?);
//! let mut heap = Heap::new(&segment);
//!
//! let ptr = heap.allocate(100, Fit::FirstFit)?;
//! unsafe { heap.release(ptr.as_ptr()) };
//! ```
//!
//! ## Limitations
//!
//! - Memory is never returned to the operating system.
//! - Only neighbouring free blocks are merged; there is no compaction.
//! - Blocks are word aligned; nothing stronger is supported.
//! - Not async-signal-safe.
//! - No in-place resizing.

mod block;
mod error;
mod freelist;
mod global;
mod heap;
mod kernel;
mod list;
mod malloc;
mod segment;
mod utils;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use block::BLOCK_HEADER_SIZE;
pub use error::AllocError;
pub use freelist::{Blocks, Fit, FreeBlock, FreeList};
pub use global::FitAlloc;
pub use heap::Heap;
pub use malloc::{
    allocate_best_fit, allocate_first_fit, allocate_threadsafe_locked,
    allocate_threadsafe_unlocked, free_best_fit, free_first_fit, free_threadsafe_locked,
    free_threadsafe_unlocked, segment_bytes_free, segment_bytes_total,
};
pub use segment::{Arena, ProgramBreak, Segment, SegmentSource};
pub use utils::WORD_SIZE;
