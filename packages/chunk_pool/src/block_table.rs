use std::alloc::{GlobalAlloc, Layout};
use std::ptr::NonNull;
use std::slice;

use crate::{BuildError, Chunk};

type Entry<T> = Option<NonNull<Chunk<T>>>;

/// Bounded, append-only record of the first chunk of every block a pool has created.
///
/// The table storage is obtained from the same backing allocator as the blocks and is
/// zero-initialized, so every slot beyond `len` reads as `None`. Blocks are appended left to
/// right and never removed; the table is only used to find the blocks again at teardown (and
/// for ownership checks in debug builds).
#[derive(Debug)]
pub(crate) struct BlockTable<T> {
    first_entry_ptr: NonNull<Entry<T>>,

    /// Number of slots in the table, fixed at creation.
    capacity: usize,

    /// Number of blocks recorded so far. Only ever grows.
    len: usize,
}

impl<T> BlockTable<T> {
    /// Allocates a table with room for `capacity` blocks from the backing allocator.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub(crate) fn new<A: GlobalAlloc>(allocator: &A, capacity: usize) -> Result<Self, BuildError> {
        assert!(capacity > 0, "a block table must have room for at least one block");

        let layout = Self::layout(capacity).ok_or(BuildError::CapacityOverflow)?;

        // SAFETY: The layout is not zero-sized because capacity is non-zero and a pointer-sized
        // entry is never zero-sized.
        let ptr = unsafe { allocator.alloc_zeroed(layout) };

        #[expect(
            clippy::cast_ptr_alignment,
            reason = "the allocator honors the alignment of the entry array layout"
        )]
        let ptr = ptr.cast::<Entry<T>>();

        let first_entry_ptr = NonNull::new(ptr).ok_or(BuildError::BlockTableAllocation {
            bytes: layout.size(),
        })?;

        Ok(Self {
            first_entry_ptr,
            capacity,
            len: 0,
        })
    }

    fn layout(capacity: usize) -> Option<Layout> {
        Layout::array::<Entry<T>>(capacity).ok()
    }

    fn entries(&self) -> &[Entry<T>] {
        // SAFETY: The storage was allocated for `capacity` entries and zero-initialized, which is
        // a valid bit pattern (`None`) for every entry. It lives until `release()`.
        unsafe { slice::from_raw_parts(self.first_entry_ptr.as_ptr(), self.capacity) }
    }

    fn entries_mut(&mut self) -> &mut [Entry<T>] {
        // SAFETY: See `entries()`. We hold an exclusive reference to the table.
        unsafe { slice::from_raw_parts_mut(self.first_entry_ptr.as_ptr(), self.capacity) }
    }

    /// Address of the table storage, for diagnostics.
    #[must_use]
    pub(crate) fn address(&self) -> NonNull<u8> {
        self.first_entry_ptr.cast()
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub(crate) fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Records a new block at the end of the table.
    ///
    /// # Panics
    ///
    /// Panics if the table is full.
    pub(crate) fn push(&mut self, first_chunk: NonNull<Chunk<T>>) {
        let index = self.len;

        let slot = self
            .entries_mut()
            .get_mut(index)
            .expect("cannot record a block in a full block table");

        debug_assert!(slot.is_none(), "block table slot {index} was already used");
        *slot = Some(first_chunk);

        self.len = index
            .checked_add(1)
            .expect("guarded by the bounds check above");
    }

    /// The recorded blocks, in the order they were created.
    pub(crate) fn iter(&self) -> impl Iterator<Item = NonNull<Chunk<T>>> + '_ {
        self.entries()
            .iter()
            .take(self.len)
            .map(|entry| entry.expect("every slot below len is populated"))
    }

    /// Returns the table storage to the backing allocator. The blocks it records are not touched.
    ///
    /// # Safety
    ///
    /// The allocator must be the one the table was created with. The table must not be used in
    /// any way afterwards, other than being forgotten or dropped.
    pub(crate) unsafe fn release<A: GlobalAlloc>(&mut self, allocator: &A) {
        let layout =
            Self::layout(self.capacity).expect("layout was valid when the table was created");

        // SAFETY: Forwarding guarantees from the caller. The layout matches the one used for the
        // allocation in `new()`.
        unsafe {
            allocator.dealloc(self.first_entry_ptr.as_ptr().cast(), layout);
        }
    }
}
