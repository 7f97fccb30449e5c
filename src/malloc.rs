//! Process-wide entry points.
//!
//! Every thread gets its own [`Heap`], so the free lists are never shared.
//! All of them grow the same [`Segment`] over the program break, which is
//! why that segment carries its own lock.
//!
//! The locked entry points additionally take an allocator-wide lock around
//! the whole call. Free lists are thread-private either way, so that lock
//! does not protect list integrity; what it buys is full serialization of
//! every locked allocate and free against each other, for callers that rely
//! on that ordering.

use std::{cell::RefCell, ptr};

use log::warn;
use spin::Mutex;

use crate::{
    freelist::Fit,
    heap::Heap,
    segment::{ProgramBreak, Segment},
};

/// The data segment shared by every thread.
static SEGMENT: Segment<ProgramBreak> = Segment::new(ProgramBreak::new());

/// Serializes the locked entry points.
static MALLOC_LOCK: Mutex<()> = Mutex::new(());

/// A thread's heap over the process data segment.
type ThreadHeap = Heap<'static, ProgramBreak>;

thread_local! {
    // Lazily initialized: a const initializer cannot borrow `SEGMENT`.
    // Building the heap never allocates and it has no destructor.
    static HEAP: RefCell<ThreadHeap> = RefCell::new(Heap::new(&SEGMENT));
}

/// Runs `f` on the calling thread's heap. Returns `None` if the heap is
/// already borrowed further up the stack, i.e. the allocator was re-entered.
fn with_heap<R>(f: impl FnOnce(&mut ThreadHeap) -> R) -> Option<R> {
    HEAP.try_with(|heap| heap.try_borrow_mut().ok().map(|mut heap| f(&mut heap)))
        .ok()
        .flatten()
}

fn allocate(size: usize, fit: Fit) -> *mut u8 {
    match with_heap(|heap| heap.allocate(size, fit)) {
        Some(Ok(ptr)) => ptr.as_ptr(),
        Some(Err(_)) => ptr::null_mut(),
        None => {
            warn!("allocator re-entered while allocating {size} bytes");
            ptr::null_mut()
        }
    }
}

unsafe fn release(ptr: *mut u8) {
    if with_heap(|heap| unsafe { heap.release(ptr) }).is_none() {
        warn!("allocator re-entered while releasing {:p}, block leaked", ptr);
    }
}

/// Allocates `size` bytes placed by first fit. Returns null when the data
/// segment cannot grow.
pub fn allocate_first_fit(size: usize) -> *mut u8 {
    allocate(size, Fit::FirstFit)
}

/// Releases a block into the calling thread's free list. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or come from one of this crate's allocate functions
/// and not have been released since.
pub unsafe fn free_first_fit(ptr: *mut u8) {
    unsafe { release(ptr) }
}

/// Allocates `size` bytes placed by best fit. Returns null when the data
/// segment cannot grow.
pub fn allocate_best_fit(size: usize) -> *mut u8 {
    allocate(size, Fit::BestFit)
}

/// Same as [`free_first_fit`]; both strategies release the same way.
///
/// # Safety
///
/// See [`free_first_fit`].
pub unsafe fn free_best_fit(ptr: *mut u8) {
    unsafe { release(ptr) }
}

/// Best-fit allocation serialized behind the allocator-wide lock.
pub fn allocate_threadsafe_locked(size: usize) -> *mut u8 {
    let _guard = MALLOC_LOCK.lock();
    allocate(size, Fit::BestFit)
}

/// Release serialized behind the allocator-wide lock.
///
/// # Safety
///
/// See [`free_first_fit`].
pub unsafe fn free_threadsafe_locked(ptr: *mut u8) {
    let _guard = MALLOC_LOCK.lock();
    unsafe { release(ptr) }
}

/// Best-fit allocation without the allocator-wide lock. Safe to call from
/// any thread because each thread only ever touches its own free list.
pub fn allocate_threadsafe_unlocked(size: usize) -> *mut u8 {
    allocate(size, Fit::BestFit)
}

/// Release without the allocator-wide lock.
///
/// # Safety
///
/// See [`free_first_fit`].
pub unsafe fn free_threadsafe_unlocked(ptr: *mut u8) {
    unsafe { release(ptr) }
}

/// Bytes ever obtained from the data segment, headers included. Never
/// decreases, since memory is never given back.
pub fn segment_bytes_total() -> usize {
    SEGMENT.total_bytes()
}

/// Bytes sitting in the calling thread's free list, headers included.
/// Memory freed by other threads is not visible here.
pub fn segment_bytes_free() -> usize {
    with_heap(|heap| heap.free_bytes()).unwrap_or(0)
}
