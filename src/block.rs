use std::{mem, ptr::NonNull};
use crate::list::Node;

/// Header size of a block. We need to add the overhead introduced by our
/// [`Node`] structure since we always use our `Block` as a node of the free list,
/// even while the block is handed out to the user.
pub const BLOCK_HEADER_SIZE: usize = mem::size_of::<Node<Block>>();

/// This is the structure of a block. The fields of the block are it's metadata,
/// content is placed after this header.
///
/// ```text
/// +---------------------+ <------+
/// |        space        |        |
/// +---------------------+        |
/// |        next         |        | -> Header (Node<Block>)
/// +---------------------+        |
/// |        prev         |        |
/// +---------------------+ <------+ <-- pointer returned to the user
/// |       Content       |        |
/// |         ...         |        | -> `space` bytes
/// |         ...         |        |
/// +---------------------+ <------+ <-- next block's header, if any
/// ```
///
/// `next` and `prev` only mean something while the block sits in a free list.
/// Once the block is handed out they are stale and nobody reads them until the
/// block is released again.
pub(crate) struct Block {
    /// Usable bytes after the header.
    pub space: usize,
}

/// Writes a fresh, unlinked header at `addr` describing `space` payload bytes.
///
/// **SAFETY**: `addr` must be word aligned and valid for writes of
/// `BLOCK_HEADER_SIZE + space` bytes.
pub(crate) unsafe fn init(addr: NonNull<u8>, space: usize) -> NonNull<Node<Block>> {
    let node = addr.cast::<Node<Block>>();

    unsafe { node.as_ptr().write(Node::new(Block { space })) };

    node
}

/// Address of the first payload byte of `node`.
///
/// **SAFETY**: `node` must point to a block header written by [`init`].
#[inline]
pub(crate) unsafe fn payload(node: NonNull<Node<Block>>) -> NonNull<u8> {
    unsafe { node.cast::<u8>().add(BLOCK_HEADER_SIZE) }
}

/// Recovers the header from a pointer previously returned by [`payload`].
///
/// **SAFETY**: `ptr` must have been produced by [`payload`].
#[inline]
pub(crate) unsafe fn from_payload(ptr: NonNull<u8>) -> NonNull<Node<Block>> {
    unsafe { ptr.sub(BLOCK_HEADER_SIZE).cast() }
}

/// Usable bytes of `node`.
///
/// **SAFETY**: same as [`payload`].
#[inline]
pub(crate) unsafe fn space(node: NonNull<Node<Block>>) -> usize {
    unsafe { node.as_ref().data.space }
}

/// First address past the payload of `node`. If another block starts here
/// the two are adjacent.
///
/// **SAFETY**: same as [`payload`].
#[inline]
pub(crate) unsafe fn end(node: NonNull<Node<Block>>) -> usize {
    node.as_ptr() as usize + BLOCK_HEADER_SIZE + unsafe { space(node) }
}
