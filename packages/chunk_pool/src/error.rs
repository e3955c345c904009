use thiserror::Error;

/// Errors that can occur when creating a [`ChunkPool`][crate::ChunkPool].
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum BuildError {
    /// The pool was configured to hold zero chunks per block.
    #[error("chunks per block must be greater than zero")]
    ZeroChunksPerBlock,

    /// The pool was configured to hold zero blocks.
    #[error("max blocks must be greater than zero")]
    ZeroMaxBlocks,

    /// The requested capacity cannot be represented in the address space, either for a single
    /// block, for the block table or for the pool as a whole.
    #[error("the requested pool capacity does not fit in the address space")]
    CapacityOverflow,

    /// The backing allocator refused to provide memory for the block table.
    #[error("the backing allocator could not provide {bytes} bytes for the block table")]
    BlockTableAllocation {
        /// Size of the refused allocation request.
        bytes: usize,
    },
}

/// Errors that can occur when allocating a chunk from a [`ChunkPool`][crate::ChunkPool].
///
/// Neither error leaves the pool in a different state than before the call, so the caller
/// is free to treat them as recoverable (e.g. skip spawning an entity) or as fatal.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum AllocateError {
    /// Every chunk of every block is in use and the pool has already created its maximum number
    /// of blocks.
    #[error("all {max_blocks} blocks are in use and no free chunk remains")]
    Exhausted {
        /// The block ceiling of the pool.
        max_blocks: usize,
    },

    /// The pool needed a new block but the backing allocator refused to provide it.
    #[error("the backing allocator could not provide {bytes} bytes for a new block")]
    OutOfMemory {
        /// Size of the refused allocation request.
        bytes: usize,
    },
}
