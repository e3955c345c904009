use std::alloc::{GlobalAlloc, System};
use std::any::type_name;
use std::ptr::NonNull;

use crate::{
    AllocateError, BlockLayout, BlockTable, BuildError, Chunk, ChunkPoolBuilder, LogLevel,
};

/// A fixed-capacity pool that hands out storage for one `T` at a time.
///
/// The pool carves its storage out of blocks of `chunks_per_block` chunks, each block obtained in
/// one request from the backing allocator `A`. Blocks are created lazily, one at a time, only
/// when no free chunk remains, and never more than `max_blocks` of them. Once that ceiling is
/// reached and every chunk is in use, [`allocate()`][Self::allocate] fails with
/// [`AllocateError::Exhausted`].
///
/// Free chunks form an intrusive singly-linked list: the link to the next free chunk is stored in
/// the free chunk itself. Deallocation pushes the chunk onto the head of this list, so the most
/// recently deallocated chunk is the next one handed out.
///
/// # Out of band access
///
/// The pool hands out raw pointers and never creates references to the storage it lends out.
/// Between a successful `allocate()` and the matching `deallocate()`, the chunk belongs entirely
/// to the caller. The pool neither initializes nor drops values stored in its chunks.
///
/// # Resource usage
///
/// Memory is only returned to the backing allocator when the pool is dropped. Dropping the pool
/// releases every block it created (including chunks that are still allocated, which become
/// dangling) followed by the block table.
///
/// # Example
///
/// ```rust
/// use chunk_pool::{AllocateError, ChunkPool};
///
/// let mut pool = ChunkPool::<u64>::new(1, 1).unwrap();
///
/// let first = pool.allocate().unwrap();
/// assert_eq!(
///     pool.allocate().unwrap_err(),
///     AllocateError::Exhausted { max_blocks: 1 }
/// );
///
/// // SAFETY: The chunk came from this pool and has not been deallocated yet.
/// unsafe { pool.deallocate(first) };
///
/// // The freed chunk is handed out again.
/// assert_eq!(pool.allocate().unwrap(), first);
/// ```
pub struct ChunkPool<T, A: GlobalAlloc = System> {
    /// First chunk of the free list, or `None` if every chunk of every created block is in use.
    /// Every chunk reachable from here is free and lies inside a block recorded in `blocks`.
    free_head: Option<NonNull<Chunk<T>>>,

    blocks: BlockTable<T>,

    block_layout: BlockLayout<T>,

    /// Number of chunks currently handed out to callers.
    len: usize,

    log_level: LogLevel,

    allocator: A,
}

impl<T> ChunkPool<T, System> {
    /// Creates a pool with blocks of `chunks_per_block` chunks and at most `max_blocks` blocks,
    /// backed by the system allocator.
    ///
    /// Only the block table is allocated up front. The first block is allocated on the first call
    /// to [`allocate()`][Self::allocate].
    ///
    /// # Errors
    ///
    /// Returns an error if either capacity is zero or too large to represent, or if the block
    /// table cannot be allocated.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::{BuildError, ChunkPool};
    ///
    /// let pool = ChunkPool::<u32>::new(8, 2).unwrap();
    /// assert_eq!(pool.block_count(), 0);
    /// assert_eq!(pool.max_capacity(), 16);
    ///
    /// assert_eq!(
    ///     ChunkPool::<u32>::new(0, 2).unwrap_err(),
    ///     BuildError::ZeroChunksPerBlock
    /// );
    /// ```
    pub fn new(chunks_per_block: usize, max_blocks: usize) -> Result<Self, BuildError> {
        Self::builder()
            .chunks_per_block(chunks_per_block)
            .max_blocks(max_blocks)
            .build()
    }

    /// Starts building a new [`ChunkPool`].
    ///
    /// Use this when you want to configure the log level or the backing allocator.
    pub fn builder() -> ChunkPoolBuilder<T> {
        ChunkPoolBuilder::new()
    }
}

impl<T, A: GlobalAlloc> ChunkPool<T, A> {
    pub(crate) fn new_inner(
        chunks_per_block: usize,
        max_blocks: usize,
        log_level: LogLevel,
        allocator: A,
    ) -> Result<Self, BuildError> {
        if chunks_per_block == 0 {
            return Err(BuildError::ZeroChunksPerBlock);
        }

        if max_blocks == 0 {
            return Err(BuildError::ZeroMaxBlocks);
        }

        let block_layout =
            BlockLayout::new(chunks_per_block).ok_or(BuildError::CapacityOverflow)?;

        // We promise that max_capacity() is representable.
        chunks_per_block
            .checked_mul(max_blocks)
            .ok_or(BuildError::CapacityOverflow)?;

        let blocks = BlockTable::new(&allocator, max_blocks)?;

        if log_level.shows_allocations() {
            tracing::debug!(
                address = ?blocks.address(),
                max_blocks,
                "allocated block table"
            );
        }

        Ok(Self {
            free_head: None,
            blocks,
            block_layout,
            len: 0,
            log_level,
            allocator,
        })
    }

    /// Hands out uninitialized storage for one `T`.
    ///
    /// If no free chunk remains, the pool first allocates a new block from the backing allocator,
    /// unless it has already created `max_blocks` blocks.
    ///
    /// The returned pointer is aligned for `T` and valid for reads and writes of one `T` until it
    /// is passed to [`deallocate()`][Self::deallocate] or the pool is dropped. The storage is not
    /// initialized; writing a value into it is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`AllocateError::Exhausted`] if every chunk is in use and the pool may not create
    /// more blocks, or [`AllocateError::OutOfMemory`] if the backing allocator refused to provide a
    /// new block. The pool is unchanged in either case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<String>::new(4, 1).unwrap();
    ///
    /// let item = pool.allocate().unwrap();
    ///
    /// // SAFETY: The chunk is valid for writes of one String.
    /// unsafe { item.write("Hello".to_string()) };
    ///
    /// // The pool does not drop values, so we do it before giving the chunk back.
    /// // SAFETY: We initialized the value above and nothing else refers to it.
    /// unsafe { item.drop_in_place() };
    ///
    /// // SAFETY: The chunk came from this pool and has not been deallocated yet.
    /// unsafe { pool.deallocate(item) };
    /// ```
    pub fn allocate(&mut self) -> Result<NonNull<T>, AllocateError> {
        if self.free_head.is_none() {
            self.grow()?;
        }

        let chunk = self
            .free_head
            .expect("growing always leaves a free chunk at the head of the free list");

        // SAFETY: Every chunk on the free list is inside a live block and has its link written.
        self.free_head = unsafe { Chunk::next_free(chunk) };

        self.len = self
            .len
            .checked_add(1)
            .expect("cannot hand out more chunks than fit in the address space");

        if self.log_level.shows_allocations() {
            tracing::debug!(address = ?chunk, "allocated chunk");
        }

        Ok(Chunk::as_item(chunk))
    }

    /// Allocates a new block and makes its chunks the free list. Only called when the free list
    /// is empty.
    fn grow(&mut self) -> Result<(), AllocateError> {
        debug_assert!(self.free_head.is_none());

        if self.blocks.is_full() {
            return Err(AllocateError::Exhausted {
                max_blocks: self.blocks.capacity(),
            });
        }

        let first = self
            .block_layout
            .allocate(&self.allocator)
            .ok_or(AllocateError::OutOfMemory {
                bytes: self.block_layout.size(),
            })?;

        let block_index = self.blocks.len();
        self.blocks.push(first);

        if self.log_level.shows_allocations() {
            tracing::debug!(address = ?first, block_index, "allocated block");
        }

        self.free_head = Some(first);

        Ok(())
    }

    /// Returns a chunk to the pool, making it the next chunk to be handed out.
    ///
    /// The pool does not drop the value stored in the chunk. If the value needs to be dropped,
    /// the caller must do so before calling this.
    ///
    /// # Safety
    ///
    /// The pointer must have been returned by [`allocate()`][Self::allocate] on this same pool
    /// and must not have been deallocated since. The caller must not access the storage after
    /// this call.
    ///
    /// Debug builds panic if the pointer does not point at a chunk of this pool. No other
    /// misuse is detected.
    pub unsafe fn deallocate(&mut self, item: NonNull<T>) {
        let chunk = Chunk::from_item(item);

        debug_assert!(
            self.contains(item),
            "deallocated {chunk:?} which is not a chunk of this pool of {}",
            type_name::<T>()
        );

        // SAFETY: The caller guarantees the chunk is ours and is no longer used by them, so we
        // may reuse its storage for the free list link.
        unsafe {
            Chunk::set_next_free(chunk, self.free_head);
        }

        self.free_head = Some(chunk);

        self.len = self
            .len
            .checked_sub(1)
            .expect("more chunks were deallocated than were allocated");

        if self.log_level.shows_allocations() {
            tracing::debug!(address = ?chunk, "deallocated chunk");
        }
    }

    /// Whether the pointer points at the start of a chunk in one of the blocks of this pool.
    ///
    /// This says nothing about whether the chunk is currently allocated. The check visits every
    /// created block.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::ptr::NonNull;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<u64>::new(4, 1).unwrap();
    /// let item = pool.allocate().unwrap();
    ///
    /// assert!(pool.contains(item));
    ///
    /// let mut elsewhere = 0_u64;
    /// assert!(!pool.contains(NonNull::from(&mut elsewhere)));
    /// ```
    #[must_use]
    pub fn contains(&self, item: NonNull<T>) -> bool {
        let chunk = Chunk::from_item(item);

        self.blocks
            .iter()
            .any(|first| self.block_layout.index_of(first, chunk).is_some())
    }

    /// Size in bytes of the element type the pool stores.
    #[must_use]
    pub fn element_size(&self) -> usize {
        size_of::<T>()
    }

    /// Size in bytes of one chunk. This is at least [`element_size()`][Self::element_size] and
    /// at least the size of a pointer, rounded up to the alignment of `T`.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        Chunk::<T>::SIZE
    }

    /// Number of chunks in each block.
    #[must_use]
    pub fn chunks_per_block(&self) -> usize {
        self.block_layout.chunks_per_block()
    }

    /// Maximum number of blocks the pool may create.
    #[must_use]
    pub fn max_blocks(&self) -> usize {
        self.blocks.capacity()
    }

    /// Number of blocks the pool has created so far. Never decreases.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of chunks in the blocks created so far, whether allocated or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.block_count()
            .checked_mul(self.chunks_per_block())
            .expect("guarded by max_capacity() being representable")
    }

    /// Maximum number of chunks that can be allocated at the same time.
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.max_blocks()
            .checked_mul(self.chunks_per_block())
            .expect("guarded by validation in the pool constructor")
    }

    /// Number of chunks currently allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no chunks are currently allocated. An empty pool may still hold blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The [log level][LogLevel] the pool was created with.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// The backing allocator the pool obtains its memory from.
    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// The free chunks, starting from the head of the free list.
    #[cfg(test)]
    pub(crate) fn free_chunks(&self) -> Vec<NonNull<T>> {
        let mut chunks = Vec::new();
        let mut current = self.free_head;

        while let Some(chunk) = current {
            assert!(
                chunks.len() < self.capacity(),
                "free list of pool of {} is longer than its capacity",
                type_name::<T>()
            );

            chunks.push(Chunk::as_item(chunk));

            // SAFETY: Chunks on the free list are inside live blocks and have their link written.
            current = unsafe { Chunk::next_free(chunk) };
        }

        chunks
    }

    #[cfg(test)]
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    pub(crate) fn integrity_check(&self) {
        let free_chunks = self.free_chunks();

        for chunk in &free_chunks {
            assert!(
                self.contains(*chunk),
                "free chunk {chunk:?} is outside the blocks of pool of {}",
                type_name::<T>()
            );
        }

        let mut unique = free_chunks.clone();
        unique.sort_unstable();
        unique.dedup();

        assert_eq!(
            unique.len(),
            free_chunks.len(),
            "free list of pool of {} contains a chunk twice",
            type_name::<T>()
        );

        assert_eq!(
            free_chunks.len().checked_add(self.len),
            Some(self.capacity()),
            "free and allocated chunks do not add up to the capacity of pool of {}",
            type_name::<T>()
        );
    }
}

impl<T, A: GlobalAlloc> Drop for ChunkPool<T, A> {
    fn drop(&mut self) {
        for first in self.blocks.iter() {
            if self.log_level.shows_allocations() {
                tracing::debug!(address = ?first, "released block");
            }

            // SAFETY: Every recorded block was allocated by `block_layout` with our allocator and
            // is released exactly once, here. Outstanding chunks become dangling, which the
            // caller accepted by dropping the pool.
            unsafe {
                self.block_layout.release(&self.allocator, first);
            }
        }

        // SAFETY: The table was created with our allocator and we never touch it again.
        unsafe {
            self.blocks.release(&self.allocator);
        }
    }
}

impl<T, A: GlobalAlloc> std::fmt::Debug for ChunkPool<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("allocator_type", &format_args!("{}", type_name::<A>()))
            .field("chunks_per_block", &self.chunks_per_block())
            .field("max_blocks", &self.max_blocks())
            .field("block_count", &self.block_count())
            .field("len", &self.len)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

// SAFETY: The raw pointers all point into memory exclusively owned by the pool, so nothing ties
// the pool to a particular thread. As long as the items and the allocator can move between
// threads, so can the pool. It is never `Sync` because all mutation goes through `&mut self`
// without synchronization and the raw pointers opt out of `Sync`.
unsafe impl<T: Send, A: GlobalAlloc + Send> Send for ChunkPool<T, A> {}
