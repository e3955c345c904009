//! A fixed-capacity pool allocator for uniformly-sized records.
//!
//! This crate provides [`ChunkPool`], an allocator that hands out storage for exactly one `T` at a
//! time. Storage comes from blocks of `chunks_per_block` chunks that the pool requests from a
//! backing allocator only when it runs out of free chunks, up to a fixed ceiling of `max_blocks`
//! blocks. Returned chunks are threaded onto an intrusive free list and reused in LIFO order, so
//! steady-state allocation and deallocation never touch the backing allocator.
//!
//! This makes the pool a good fit for high-frequency churn of small, same-sized records such as
//! game entities, where a general-purpose allocator would add overhead and fragmentation.
//!
//! # Key Features
//!
//! - **Bounded memory**: at most `chunks_per_block * max_blocks` chunks can ever be outstanding
//! - **Lazy growth**: no block is allocated until the first chunk is requested
//! - **O(1) allocate and deallocate**: a block is carved only on the growth path
//! - **Failure as a value**: exhaustion and backing allocation failure are reported through
//!   [`AllocateError`], never by panicking or unwinding
//! - **Pluggable backing allocator**: any [`std::alloc::GlobalAlloc`], [`std::alloc::System`]
//!   by default
//! - **Opt-in allocation tracing**: see [`LogLevel`]
//!
//! # Ownership
//!
//! The pool never constructs or drops the values stored in its chunks. A chunk returned by
//! [`allocate()`](ChunkPool::allocate) is uninitialized storage that the caller may write a
//! value into and must finalize (if needed) before handing it back through
//! [`deallocate()`](ChunkPool::deallocate). When the pool is dropped, all of its memory is
//! released, including chunks the caller never deallocated.
//!
//! # Example
//!
//! ```rust
//! use chunk_pool::ChunkPool;
//!
//! #[derive(Debug)]
//! struct Item {
//!     x: i32,
//!     y: i32,
//!     speed: f64,
//! }
//!
//! // Up to 2 blocks of 8 items each.
//! let mut pool = ChunkPool::<Item>::new(8, 2).unwrap();
//!
//! let item = pool.allocate().unwrap();
//!
//! // The chunk is valid for writes of one `Item` until deallocated or the pool is dropped.
//! unsafe {
//!     item.write(Item {
//!         x: 10,
//!         y: 10,
//!         speed: 0.5,
//!     });
//! }
//!
//! // The item was just initialized and nothing else refers to it.
//! assert_eq!(unsafe { item.as_ref() }.x, 10);
//!
//! // The chunk came from this pool and has not been deallocated yet.
//! unsafe { pool.deallocate(item) };
//!
//! assert!(pool.is_empty());
//! ```
//!
//! # Thread safety
//!
//! The pool is thread-mobile ([`Send`]) when `T` and the backing allocator are, but it is not
//! thread-safe ([`Sync`]). Concurrent use requires external synchronization.

mod block;
mod block_table;
mod builder;
mod chunk;
mod error;
mod log_level;
mod pool;

pub(crate) use block::*;
pub(crate) use block_table::*;
pub use builder::*;
pub(crate) use chunk::*;
pub use error::*;
pub use log_level::*;
pub use pool::*;
