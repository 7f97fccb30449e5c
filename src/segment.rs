//! The shared memory segment every thread's heap grows into.
//!
//! There is exactly one [`Segment`] behind the process-wide entry points, and
//! it only ever grows. Free memory is recycled through the per-thread free
//! lists and is never handed back to the operating system.

use std::{
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

use log::{debug, warn};
use spin::Mutex;

use crate::{
    block::{self, Block, BLOCK_HEADER_SIZE},
    error::AllocError,
    kernel,
    list::Node,
    utils::{checked_align, WORD_SIZE},
};

/// Something that can hand out more contiguous, writable memory on demand.
///
/// This is the allocator's only dependency on its environment. The
/// process-wide entry points use [`ProgramBreak`]; tests and embedders can
/// use a bounded [`Arena`] instead.
pub trait SegmentSource {
    /// Extends the segment by `len` bytes and returns the start of the new
    /// range, or `None` if the segment cannot grow.
    ///
    /// **SAFETY**: the returned range must be word aligned, writable and not
    /// overlap any range returned before. Implementations may assume calls
    /// are serialized.
    unsafe fn grow(&mut self, len: usize) -> Option<NonNull<u8>>;
}

/// The process data segment.
///
/// On unix this moves the program break with `sbrk`. Windows has no
/// break, so the same behaviour is emulated on top of reserved address space.
pub struct ProgramBreak {
    #[cfg(windows)]
    emulated: kernel::EmulatedBreak,
}

impl ProgramBreak {
    pub const fn new() -> Self {
        Self {
            #[cfg(windows)]
            emulated: kernel::EmulatedBreak::new(),
        }
    }
}

impl Default for ProgramBreak {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentSource for ProgramBreak {
    unsafe fn grow(&mut self, len: usize) -> Option<NonNull<u8>> {
        #[cfg(unix)]
        return unsafe { kernel::extend_break(len) };

        #[cfg(windows)]
        return unsafe { self.emulated.extend(len) };
    }
}

/// A fixed-capacity region mapped once from the platform page allocator.
///
/// Growth bumps through the region and fails once it is used up, which makes
/// the layout of blocks fully predictable: consecutive growths are always
/// adjacent. The mapping is returned to the platform when the arena is dropped,
/// so every block carved from it must be dead by then.
pub struct Arena {
    base: NonNull<u8>,
    capacity: usize,
    used: usize,
}

// The arena only hands out disjoint ranges and is never aliased by itself.
unsafe impl Send for Arena {}

impl Arena {
    /// Maps a region of at least `capacity` bytes, rounded up to whole pages.
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        let capacity = checked_align(capacity.max(1), kernel::page_size())
            .ok_or(AllocError::SizeOverflow { requested: capacity })?;

        let base = unsafe { kernel::request_memory(capacity) }
            .ok_or(AllocError::Platform { len: capacity })?;

        debug!("arena mapped {capacity} bytes at {:p}", base);

        Ok(Self { base, capacity, used: 0 })
    }

    /// Total bytes the arena can hand out.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes handed out so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// First byte of the mapping.
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }
}

impl SegmentSource for Arena {
    unsafe fn grow(&mut self, len: usize) -> Option<NonNull<u8>> {
        let end = self.used.checked_add(len).filter(|end| *end <= self.capacity)?;
        let addr = unsafe { self.base.add(self.used) };

        self.used = end;

        Some(addr)
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { kernel::return_memory(self.base.as_ptr(), self.capacity) };
    }
}

/// A growable segment shared by every heap that draws from it.
///
/// The source sits behind its own lock, distinct from any lock an entry
/// point may take, because growth requests from different threads must not
/// interleave. The cumulative byte counter is advanced while that lock is
/// still held, so concurrent growth never loses an update.
pub struct Segment<S> {
    source: Mutex<S>,
    total: AtomicUsize,
}

impl<S> Segment<S> {
    pub const fn new(source: S) -> Self {
        Self {
            source: Mutex::new(source),
            total: AtomicUsize::new(0),
        }
    }

    /// Bytes ever obtained from the source, headers included. Never decreases.
    pub fn total_bytes(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    /// Runs `f` on the source while holding the segment lock.
    ///
    /// Only shared access is given out. Replacing the source behind a
    /// segment would unmap memory that heaps over it still point into.
    pub fn with_source<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.source.lock())
    }
}

impl<S: SegmentSource> Segment<S> {
    /// Grows the segment by `space` bytes plus a header and writes a fresh,
    /// unlinked block header at the start of the new range.
    ///
    /// `space` must already be a multiple of the word size so the next block
    /// grown after this one stays aligned. On failure the counter is left
    /// untouched.
    pub(crate) fn grow_block(&self, space: usize) -> Result<NonNull<Node<Block>>, AllocError> {
        debug_assert_eq!(space % WORD_SIZE, 0);

        let Some(len) = space.checked_add(BLOCK_HEADER_SIZE) else {
            warn!("growing by {space} bytes plus a header overflows");
            return Err(AllocError::SizeOverflow { requested: space });
        };

        let (base, total) = {
            let mut source = self.source.lock();

            let Some(base) = (unsafe { source.grow(len) }) else {
                warn!("segment exhausted growing by {len} bytes");
                return Err(AllocError::SegmentExhausted { requested: len });
            };

            (base, self.total.fetch_add(len, Ordering::AcqRel) + len)
        };

        debug!("segment grew by {len} bytes at {:p}, {total} bytes total", base);

        Ok(unsafe { block::init(base, space) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_rounds_capacity_to_pages() {
        let arena = Arena::new(1).unwrap();

        assert_eq!(arena.capacity(), kernel::page_size());
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn arena_growth_is_contiguous_until_exhausted() {
        let mut arena = Arena::new(kernel::page_size()).unwrap();
        let capacity = arena.capacity();

        unsafe {
            let first = arena.grow(64).unwrap();
            let second = arena.grow(128).unwrap();

            assert_eq!(first, arena.base());
            assert_eq!(second.as_ptr() as usize, first.as_ptr() as usize + 64);
            assert!(arena.grow(capacity).is_none());
            assert_eq!(arena.used(), 192);

            assert!(arena.grow(capacity - 192).is_some());
            assert!(arena.grow(1).is_none());
        }
    }

    #[test]
    fn grow_block_writes_header_and_counts_bytes() {
        let segment = Segment::new(Arena::new(4096).unwrap());

        let node = segment.grow_block(40).unwrap();

        unsafe {
            assert_eq!(block::space(node), 40);
            assert!(node.as_ref().next.is_none());
            assert!(node.as_ref().prev.is_none());
        }
        assert_eq!(segment.total_bytes(), 40 + BLOCK_HEADER_SIZE);
        assert_eq!(segment.with_source(|arena| arena.used()), 40 + BLOCK_HEADER_SIZE);
    }

    #[test]
    fn exhaustion_does_not_advance_counter() {
        let segment = Segment::new(Arena::new(4096).unwrap());
        let capacity = segment.with_source(|arena| arena.capacity());

        segment.grow_block(64).unwrap();
        let before = segment.total_bytes();

        assert_eq!(
            segment.grow_block(capacity),
            Err(AllocError::SegmentExhausted { requested: capacity + BLOCK_HEADER_SIZE }),
        );
        assert_eq!(segment.total_bytes(), before);
    }

    #[test]
    fn overflowing_request_is_rejected() {
        let segment = Segment::new(Arena::new(4096).unwrap());

        assert_eq!(
            segment.grow_block(usize::MAX - 7),
            Err(AllocError::SizeOverflow { requested: usize::MAX - 7 }),
        );
        assert_eq!(segment.total_bytes(), 0);
    }

    #[test]
    fn concurrent_growth_never_loses_counter_updates() {
        const THREADS: usize = 8;
        const GROWTHS: usize = 200;

        let segment = Segment::new(Arena::new(THREADS * GROWTHS * 128).unwrap());

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let segment = &segment;
                scope.spawn(move || {
                    for i in 0..GROWTHS {
                        segment.grow_block(8 * ((t + i) % 8)).unwrap();
                    }
                });
            }
        });

        let expected: usize = (0..THREADS)
            .flat_map(|t| (0..GROWTHS).map(move |i| 8 * ((t + i) % 8) + BLOCK_HEADER_SIZE))
            .sum();

        assert_eq!(segment.total_bytes(), expected);
        assert_eq!(segment.with_source(|arena| arena.used()), expected);
    }
}
