/// Determines whether a pool reports its memory activity through [`tracing`].
///
/// By default, the pool is silent and does not construct any events.
///
/// # Examples
///
/// ```
/// use chunk_pool::{ChunkPool, LogLevel};
///
/// // The log level is set at pool creation time.
/// let pool = ChunkPool::<u64>::builder()
///     .chunks_per_block(8)
///     .max_blocks(2)
///     .log_level(LogLevel::ShowAllocations)
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.log_level(), LogLevel::ShowAllocations);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum LogLevel {
    /// The pool emits no events. This is the default.
    #[default]
    Off,

    /// The pool emits a `DEBUG` event, tagged with the affected address, whenever it allocates
    /// its block table, allocates a block, hands out a chunk, takes back a chunk or releases
    /// a block.
    ShowAllocations,
}

impl LogLevel {
    #[must_use]
    pub(crate) fn shows_allocations(self) -> bool {
        matches!(self, Self::ShowAllocations)
    }
}
