use std::alloc::{GlobalAlloc, Layout};
use std::any::type_name;
use std::marker::PhantomData;
use std::ptr::NonNull;

use num_integer::Integer;

use crate::Chunk;

/// The shape shared by every block of a pool: how many chunks a block holds and the memory layout
/// requested from the backing allocator for it.
///
/// A block is a contiguous run of chunks obtained in one allocation. The block itself is
/// represented only by a pointer to its first chunk; this type knows how to create, inspect and
/// release such blocks.
pub(crate) struct BlockLayout<T> {
    chunks_per_block: usize,
    layout: Layout,

    _item: PhantomData<T>,
}

impl<T> BlockLayout<T> {
    /// Returns `None` if a block of this many chunks cannot be described by a [`Layout`].
    ///
    /// # Panics
    ///
    /// Panics if `chunks_per_block` is zero.
    #[must_use]
    pub(crate) fn new(chunks_per_block: usize) -> Option<Self> {
        assert!(chunks_per_block > 0, "a block must hold at least one chunk");

        let layout = Layout::array::<Chunk<T>>(chunks_per_block).ok()?;

        Some(Self {
            chunks_per_block,
            layout,
            _item: PhantomData,
        })
    }

    #[must_use]
    pub(crate) fn chunks_per_block(&self) -> usize {
        self.chunks_per_block
    }

    /// Size of one block in bytes.
    #[must_use]
    pub(crate) fn size(&self) -> usize {
        self.layout.size()
    }

    /// Requests a new block from the backing allocator and threads all of its chunks into a free
    /// list, so that chunk `i` links to chunk `i + 1` and the last chunk links to nothing.
    ///
    /// Returns the first chunk of the block, which is also the head of the new free list, or
    /// `None` if the backing allocator refused the request.
    #[must_use]
    pub(crate) fn allocate<A: GlobalAlloc>(&self, allocator: &A) -> Option<NonNull<Chunk<T>>> {
        // SAFETY: The layout is not zero-sized because we hold at least one chunk and a chunk is
        // never zero-sized (it always has room for the free list link).
        let first = NonNull::new(unsafe { allocator.alloc(self.layout) }.cast::<Chunk<T>>())?;

        for index in 0..self.chunks_per_block {
            let next_index = index
                .checked_add(1)
                .expect("guarded by loop range which is below usize::MAX");

            let next = (next_index < self.chunks_per_block).then(|| {
                // SAFETY: The index is in bounds of the block we just allocated.
                unsafe { first.add(next_index) }
            });

            // SAFETY: The index is in bounds of the block we just allocated.
            let chunk = unsafe { first.add(index) };

            // SAFETY: The chunk is inside a block we exclusively own and nobody has been handed
            // its storage yet.
            unsafe {
                Chunk::set_next_free(chunk, next);
            }
        }

        Some(first)
    }

    /// Returns a block to the backing allocator.
    ///
    /// # Safety
    ///
    /// The block must have been returned by [`allocate()`][Self::allocate] on this same layout
    /// with the same allocator, and must not have been released already. Any chunk of the block
    /// is dangling afterwards.
    pub(crate) unsafe fn release<A: GlobalAlloc>(&self, allocator: &A, first: NonNull<Chunk<T>>) {
        // SAFETY: Forwarding guarantees from the caller, which include matching layout.
        unsafe {
            allocator.dealloc(first.as_ptr().cast(), self.layout);
        }
    }

    /// Returns the index of the chunk within the block if `chunk` points exactly at the start of
    /// one of the block's chunks, `None` otherwise.
    #[must_use]
    pub(crate) fn index_of(
        &self,
        first: NonNull<Chunk<T>>,
        chunk: NonNull<Chunk<T>>,
    ) -> Option<usize> {
        let offset = chunk.as_ptr().addr().checked_sub(first.as_ptr().addr())?;

        if offset >= self.size() {
            return None;
        }

        let (index, remainder) = offset.div_rem(&Chunk::<T>::SIZE);

        (remainder == 0).then_some(index)
    }
}

impl<T> std::fmt::Debug for BlockLayout<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockLayout")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("chunks_per_block", &self.chunks_per_block)
            .field("layout", &self.layout)
            .finish()
    }
}
