use std::ptr::NonNull;

use log::trace;

use crate::{
    block::{self, Block, BLOCK_HEADER_SIZE},
    list::{self, Link, List, Node},
};

/// Placement strategy used to pick a free block for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// Take the lowest-addressed block that is large enough.
    FirstFit,
    /// Take the block that leaves the fewest bytes over, lowest address on ties.
    BestFit,
}

/// Linked list to keep track of free [`Block`]s.
///
/// The list is intrusive: the links live in the header of each free block,
/// so keeping track of free memory never needs memory of its own. Members are
/// kept sorted by address.
///
/// ```text
///                         Free List
///
///          +---------------------------+  +----------------------+
///          |                           |  |                      |
/// +--------|-----+    +-------+    +---|--|-+    +-------+    +--|-----+
/// | Block (free) |    | Block |    | Block (free) |    | Block |    | Block (free) |
/// +--------------+    +-------+    +--------------+    +-------+    +--------------+
///
///   low address  ------------------------------------------------>  high address
/// ```
///
/// Because of the ordering, two free blocks that touch in memory are always
/// neighbours in the list, and merging them only needs to look at the
/// immediate neighbours of the block being released.
pub struct FreeList {
    blocks: List<Block>,
}

/// A member of a [`FreeList`] as seen from outside the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    /// Address of the block header.
    pub addr: NonNull<u8>,
    /// Usable bytes after the header.
    pub space: usize,
}

impl FreeBlock {
    /// First address past the block, header included.
    pub fn end(&self) -> usize {
        self.addr.as_ptr() as usize + BLOCK_HEADER_SIZE + self.space
    }
}

/// Iterator over the members of a [`FreeList`], lowest address first.
pub struct Blocks<'a> {
    iter: list::Iter<'a, Block>,
}

impl Iterator for Blocks<'_> {
    type Item = FreeBlock;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|node| FreeBlock {
            addr: node.cast(),
            space: unsafe { block::space(node) },
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl FreeList {
    /// Creates a new empty List
    pub const fn new() -> Self {
        Self { blocks: List::new() }
    }

    /// It tells whether the FreeList is empty or not.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of free blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Free blocks in address order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks { iter: self.blocks.iter() }
    }

    /// Bytes held by the list, headers included.
    pub fn free_bytes(&self) -> usize {
        self.blocks().map(|block| block.space + BLOCK_HEADER_SIZE).sum()
    }

    /// Inserts `node` at its address-ordered position.
    ///
    /// **SAFETY**: `node` must be a valid block header that is not in any list.
    pub(crate) unsafe fn insert(&mut self, node: NonNull<Node<Block>>) {
        unsafe { self.blocks.insert(node) }
    }

    /// Removes `node` from the list.
    ///
    /// **SAFETY**: `node` must be a member of this list.
    pub(crate) unsafe fn remove(&mut self, node: NonNull<Node<Block>>) {
        unsafe { self.blocks.remove(node) }
    }

    /// Returns the block to place a request of `size` bytes in, or `None`
    /// when no member is large enough.
    pub(crate) fn find(&self, size: usize, fit: Fit) -> Link<Node<Block>> {
        match fit {
            Fit::FirstFit => self.first_fit(size),
            Fit::BestFit => self.best_fit(size),
        }
    }

    /// First member, in address order, with at least `size` bytes.
    fn first_fit(&self, size: usize) -> Link<Node<Block>> {
        self.blocks
            .iter()
            .find(|node| unsafe { block::space(*node) } >= size)
    }

    /// Member with the smallest leftover for `size`. An exact fit ends the
    /// scan; otherwise the whole list is walked and the first minimum wins.
    fn best_fit(&self, size: usize) -> Link<Node<Block>> {
        let mut best: Option<(NonNull<Node<Block>>, usize)> = None;

        for node in &self.blocks {
            let space = unsafe { block::space(node) };

            if space < size {
                continue;
            }

            let leftover = space - size;

            if leftover == 0 {
                return Some(node);
            }

            if best.is_none_or(|(_, smallest)| leftover < smallest) {
                best = Some((node, leftover));
            }
        }

        best.map(|(node, _)| node)
    }

    /// Shrinks `node` to `size` bytes and puts the rest back in the list as
    /// a new free block, if the rest is large enough to be worth a header.
    ///
    /// A leftover of at most one header stays inside `node`, so the caller
    /// gets a few bytes more than it asked for instead of the list gaining a
    /// block that can hold nothing. Returns whether a split happened.
    ///
    /// **SAFETY**: `node` must be a valid block header with at least `size`
    /// bytes of space; `size` must be word aligned.
    pub(crate) unsafe fn split(&mut self, mut node: NonNull<Node<Block>>, size: usize) -> bool {
        unsafe {
            let leftover = block::space(node) - size;

            if leftover <= BLOCK_HEADER_SIZE {
                return false;
            }

            let rest_addr = block::payload(node).add(size);
            let rest = block::init(rest_addr, leftover - BLOCK_HEADER_SIZE);

            node.as_mut().data.space = size;
            self.insert(rest);

            trace!(
                "split {:p}: kept {size} bytes, {} bytes free at {:p}",
                node,
                leftover - BLOCK_HEADER_SIZE,
                rest,
            );

            true
        }
    }

    /// Merges `second` into `first` if `second` starts exactly where `first`
    /// ends. `second` leaves the list and `first` grows by its header and
    /// payload. Returns the merged block.
    ///
    /// **SAFETY**: both must be members of this list and `first < second`.
    unsafe fn merge(
        &mut self,
        mut first: NonNull<Node<Block>>,
        second: NonNull<Node<Block>>,
    ) -> Link<Node<Block>> {
        unsafe {
            if block::end(first) != second.as_ptr() as usize {
                return None;
            }

            first.as_mut().data.space += BLOCK_HEADER_SIZE + block::space(second);
            self.remove(second);

            trace!("merged {:p} into {:p}, now {} bytes", second, first, block::space(first));

            Some(first)
        }
    }

    /// Merges a freshly inserted `node` with whichever of its list neighbours
    /// touch it in memory. When `node` bridges two free blocks all three end
    /// up as one, so at most two merges happen.
    ///
    /// **SAFETY**: `node` must be a member of this list.
    pub(crate) unsafe fn coalesce(&mut self, node: NonNull<Node<Block>>) {
        unsafe {
            let (prev, next) = (node.as_ref().prev, node.as_ref().next);

            match (prev, next) {
                (None, None) => {}
                (Some(prev), None) => {
                    self.merge(prev, node);
                }
                (None, Some(next)) => {
                    self.merge(node, next);
                }
                (Some(prev), Some(next)) => match self.merge(prev, node) {
                    Some(merged) => {
                        self.merge(merged, next);
                    }
                    None => {
                        self.merge(node, next);
                    }
                },
            }
        }
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}
