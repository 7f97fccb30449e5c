use std::ptr::NonNull;

use log::warn;

use crate::{
    block,
    error::AllocError,
    freelist::{Fit, FreeList},
    segment::{Segment, SegmentSource},
    utils::{checked_align, WORD_SIZE},
};

/// One thread's view of the allocator: its private free list plus the
/// placement and release logic that runs over it.
///
/// A `Heap` never touches another heap's blocks, so nothing in here needs a
/// lock. The only shared state is the [`Segment`] it grows from, which
/// synchronizes itself. The process-wide entry points keep one `Heap` per
/// thread; embedders and tests can create as many as they like.
///
/// The heap borrows its segment, so the memory its free list points into
/// stays mapped for as long as the heap exists:
///
/// ```compile_fail
/// use fitalloc::{Arena, Fit, Heap, Segment};
///
/// let mut heap;
/// {
///     let segment = Segment::new(Arena::new(4096).unwrap());
///     heap = Heap::new(&segment);
///     heap.allocate(8, Fit::FirstFit).unwrap();
/// }
/// heap.free_bytes();
/// ```
///
/// ```text
///   allocate(size)                       release(ptr)
///        |                                    |
///        v                                    v
///   free list hit? --yes--> split -->    insert in address order
///        |                  remove            |
///        no                   |               v
///        |                    v          merge with touching
///        v                 payload       neighbours
///   segment.grow_block --> payload
/// ```
pub struct Heap<'s, S> {
    segment: &'s Segment<S>,
    free_list: FreeList,
}

impl<'s, S> Heap<'s, S> {
    pub const fn new(segment: &'s Segment<S>) -> Self {
        Self { segment, free_list: FreeList::new() }
    }

    /// The segment this heap grows from.
    pub fn segment(&self) -> &'s Segment<S> {
        self.segment
    }

    /// The free blocks owned by this heap.
    pub fn free_list(&self) -> &FreeList {
        &self.free_list
    }

    /// Bytes currently free in this heap, headers included.
    pub fn free_bytes(&self) -> usize {
        self.free_list.free_bytes()
    }

    /// Gives the block behind `ptr` back to this heap and merges it with any
    /// free block it touches. Releasing null does nothing.
    ///
    /// **SAFETY**: `ptr` must be null or a pointer returned by
    /// [`Heap::allocate`] on a heap over this same segment, not released
    /// since. Double releases and foreign pointers are not detected.
    pub unsafe fn release(&mut self, ptr: *mut u8) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };

        unsafe {
            let node = block::from_payload(ptr);

            self.free_list.insert(node);
            self.free_list.coalesce(node);
        }
    }
}

impl<S: SegmentSource> Heap<'_, S> {
    /// Returns a pointer to at least `size` usable bytes, word aligned.
    ///
    /// `size` is rounded up to the word size first. The free list is searched
    /// with `fit`; if nothing qualifies the segment grows by exactly the
    /// rounded size plus one header. Requests are never retried.
    pub fn allocate(&mut self, size: usize, fit: Fit) -> Result<NonNull<u8>, AllocError> {
        let Some(size) = checked_align(size, WORD_SIZE) else {
            warn!("request of {size} bytes overflows when rounded to a word");
            return Err(AllocError::SizeOverflow { requested: size });
        };

        let node = match self.free_list.find(size, fit) {
            Some(node) => unsafe {
                self.free_list.split(node, size);
                self.free_list.remove(node);
                node
            },
            None => self.segment.grow_block(size)?,
        };

        Ok(unsafe { block::payload(node) })
    }
}
