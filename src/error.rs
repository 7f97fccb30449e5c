use thiserror::Error;

/// Reasons an allocation can fail. The pointer-returning entry points turn
/// every variant into a null pointer; the engine types surface them as is.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The segment source could not supply `requested` more bytes.
    #[error("segment cannot grow by {requested} bytes")]
    SegmentExhausted { requested: usize },

    /// The request plus its header does not fit in a `usize`.
    #[error("request of {requested} bytes overflows the address space")]
    SizeOverflow { requested: usize },

    /// The platform page allocator refused to map `len` bytes.
    #[error("platform refused to map {len} bytes")]
    Platform { len: usize },
}
