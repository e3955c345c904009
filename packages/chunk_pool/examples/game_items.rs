//! Allocates game items from a `ChunkPool` with allocation tracing enabled.
//!
//! Run with `cargo run --example game_items` to see the pool allocate its block table, grow by
//! two blocks, hand out and take back ten items and finally release its blocks.

use std::ptr::NonNull;

use chunk_pool::{ChunkPool, LogLevel};
use tracing::Level;

/// An example item that could be allocated in a game.
#[derive(Debug)]
struct Item {
    x: i32,
    y: i32,
    speed: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    // Up to 2 blocks containing 8 items each.
    let mut pool = ChunkPool::<Item>::builder()
        .chunks_per_block(8)
        .max_blocks(2)
        .log_level(LogLevel::ShowAllocations)
        .build()
        .expect("a pool of 2 blocks of 8 items must be constructible");

    let items: Vec<NonNull<Item>> = (0..10)
        .map(|_| {
            pool.allocate()
                .expect("10 items fit in 2 blocks of 8 items each")
        })
        .collect();

    let first = *items
        .first()
        .expect("at least one item was allocated above");

    // SAFETY: The chunk was just allocated and is valid for writes of one `Item`.
    unsafe {
        first.write(Item {
            x: 10,
            y: 10,
            speed: 0.5,
        });
    }

    // SAFETY: We initialized the item above and nothing else refers to it.
    let item = unsafe { first.as_ref() };
    eprintln!(
        "Item ({}, {}, {}): {first:?}",
        item.x, item.y, item.speed
    );

    // Return the items in reverse order of allocation.
    for item in items.into_iter().rev() {
        // SAFETY: Every item came from this pool and is deallocated exactly once. `Item` has no
        // drop logic, so there is nothing to finalize first.
        unsafe {
            pool.deallocate(item);
        }
    }

    eprintln!(
        "{} of {} chunks in use across {} blocks",
        pool.len(),
        pool.capacity(),
        pool.block_count()
    );

    // Dropping the pool releases both blocks and the block table.
}
