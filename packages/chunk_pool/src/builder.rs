use std::alloc::{GlobalAlloc, System};
use std::any::type_name;
use std::marker::PhantomData;

use crate::{BuildError, ChunkPool, LogLevel};

/// Builder for creating an instance of [`ChunkPool`].
///
/// Both capacities are mandatory and must be non-zero; [`build()`][Self::build] reports an error
/// otherwise. The log level and the backing allocator are optional.
///
/// # Examples
///
/// ```
/// use chunk_pool::{ChunkPool, LogLevel};
///
/// let pool = ChunkPool::<u32>::builder()
///     .chunks_per_block(64)
///     .max_blocks(16)
///     .log_level(LogLevel::Off)
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.max_capacity(), 1024);
/// ```
///
/// Using a custom backing allocator:
///
/// ```
/// use std::alloc::System;
///
/// use chunk_pool::ChunkPool;
///
/// let pool = ChunkPool::<u32>::builder()
///     .chunks_per_block(64)
///     .max_blocks(16)
///     .allocator(System)
///     .build()
///     .unwrap();
/// ```
#[must_use]
pub struct ChunkPoolBuilder<T, A = System> {
    chunks_per_block: usize,
    max_blocks: usize,
    log_level: LogLevel,
    allocator: A,

    _item: PhantomData<T>,
}

impl<T, A> std::fmt::Debug for ChunkPoolBuilder<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("allocator_type", &format_args!("{}", type_name::<A>()))
            .field("chunks_per_block", &self.chunks_per_block)
            .field("max_blocks", &self.max_blocks)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl<T> ChunkPoolBuilder<T, System> {
    pub(crate) fn new() -> Self {
        Self {
            chunks_per_block: 0,
            max_blocks: 0,
            log_level: LogLevel::default(),
            allocator: System,
            _item: PhantomData,
        }
    }
}

impl<T, A: GlobalAlloc> ChunkPoolBuilder<T, A> {
    /// Sets the number of chunks in each block. Each time the pool runs out of free chunks, it
    /// requests one block of this many chunks from the backing allocator.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::<u32>::builder()
    ///     .chunks_per_block(8)
    ///     .max_blocks(1)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(pool.chunks_per_block(), 8);
    /// ```
    pub fn chunks_per_block(mut self, chunks_per_block: usize) -> Self {
        self.chunks_per_block = chunks_per_block;
        self
    }

    /// Sets the maximum number of blocks the pool may create over its lifetime.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::<u32>::builder()
    ///     .chunks_per_block(8)
    ///     .max_blocks(4)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(pool.max_blocks(), 4);
    /// ```
    pub fn max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = max_blocks;
        self
    }

    /// Sets the [log level][LogLevel] of the pool.
    pub fn log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Sets the allocator the pool obtains its blocks and block table from.
    pub fn allocator<B: GlobalAlloc>(self, allocator: B) -> ChunkPoolBuilder<T, B> {
        ChunkPoolBuilder {
            chunks_per_block: self.chunks_per_block,
            max_blocks: self.max_blocks,
            log_level: self.log_level,
            allocator,
            _item: PhantomData,
        }
    }

    /// Builds the pool with the specified configuration, allocating its block table.
    ///
    /// No blocks are allocated until the first chunk is requested.
    ///
    /// # Errors
    ///
    /// Returns an error if either capacity is zero or too large to represent, or if the backing
    /// allocator refuses to provide the block table.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::{BuildError, ChunkPool};
    ///
    /// let result = ChunkPool::<u32>::builder().chunks_per_block(8).build();
    /// assert_eq!(result.unwrap_err(), BuildError::ZeroMaxBlocks);
    /// ```
    pub fn build(self) -> Result<ChunkPool<T, A>, BuildError> {
        ChunkPool::new_inner(
            self.chunks_per_block,
            self.max_blocks,
            self.log_level,
            self.allocator,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_rejected() {
        let result = ChunkPool::<u64>::builder().build();

        assert_eq!(result.unwrap_err(), BuildError::ZeroChunksPerBlock);
    }

    #[test]
    fn settings_reach_the_pool() {
        let pool = ChunkPool::<u64>::builder()
            .chunks_per_block(3)
            .max_blocks(5)
            .log_level(LogLevel::ShowAllocations)
            .build()
            .unwrap();

        assert_eq!(pool.chunks_per_block(), 3);
        assert_eq!(pool.max_blocks(), 5);
        assert_eq!(pool.log_level(), LogLevel::ShowAllocations);
    }

    #[test]
    fn debug_output_names_types() {
        let builder = ChunkPool::<u64>::builder().chunks_per_block(3);
        let output = format!("{builder:?}");

        assert!(output.contains("u64"));
        assert!(output.contains("System"));
        assert!(output.contains("chunks_per_block: 3"));
    }
}
