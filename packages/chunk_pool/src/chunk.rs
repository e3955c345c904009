use std::mem::{ManuallyDrop, MaybeUninit};
use std::ptr::NonNull;

/// One fixed-size storage slot in a block.
///
/// While the chunk is free, `next_free` links it to the next free chunk (in the same block or in
/// another one), forming an intrusive free list. While the chunk is allocated, the whole slot
/// belongs to the caller as storage for one `T` and the pool does not read or write it.
///
/// All fields start at offset zero, so a pointer to the chunk is also a valid pointer to the item
/// storage and vice versa.
#[repr(C)]
pub(crate) union Chunk<T> {
    next_free: Option<NonNull<Chunk<T>>>,

    #[allow(dead_code, reason = "only accessed through pointer casts")]
    item: ManuallyDrop<MaybeUninit<T>>,
}

impl<T> Chunk<T> {
    /// Size of the slot in bytes. Never zero, even for zero-sized `T`, because a free chunk must
    /// be able to hold its link.
    pub(crate) const SIZE: usize = size_of::<Self>();

    /// Writes the free list link of a chunk that is (or is becoming) free.
    ///
    /// # Safety
    ///
    /// The pointer must be valid for writes of a `Chunk<T>` and the caller must not be holding
    /// any item stored in the chunk.
    pub(crate) unsafe fn set_next_free(chunk: NonNull<Self>, next: Option<NonNull<Self>>) {
        // SAFETY: Forwarding guarantees from the caller. A union has no validity requirements
        // beyond its size, so a reference to it is fine even while the item storage is
        // uninitialized.
        let chunk = unsafe { &mut *chunk.as_ptr() };

        // Writing a `Copy` union field never drops the previous contents.
        chunk.next_free = next;
    }

    /// Reads the free list link of a free chunk.
    ///
    /// # Safety
    ///
    /// The pointer must be valid for reads of a `Chunk<T>` and the chunk must be free, i.e. its
    /// link must have been written by [`set_next_free()`][Self::set_next_free] after the chunk
    /// was last handed out.
    #[must_use]
    pub(crate) unsafe fn next_free(chunk: NonNull<Self>) -> Option<NonNull<Self>> {
        // SAFETY: Forwarding guarantees from the caller.
        let chunk = unsafe { chunk.as_ref() };

        // SAFETY: The chunk is free, so its link is the field that was last written.
        unsafe { chunk.next_free }
    }

    /// Reinterprets a chunk as storage for one item.
    #[must_use]
    pub(crate) fn as_item(chunk: NonNull<Self>) -> NonNull<T> {
        chunk.cast()
    }

    /// Reinterprets item storage handed out by the pool as the chunk that holds it.
    #[must_use]
    pub(crate) fn from_item(item: NonNull<T>) -> NonNull<Self> {
        item.cast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_fits_link_and_item() {
        assert!(Chunk::<u8>::SIZE >= size_of::<usize>());
        assert!(Chunk::<[u64; 4]>::SIZE >= size_of::<[u64; 4]>());
        assert!(Chunk::<()>::SIZE >= size_of::<usize>());
    }

    #[test]
    fn chunk_alignment_satisfies_item() {
        #[repr(align(64))]
        struct Aligned(#[allow(dead_code, reason = "only the layout matters")] u8);

        assert_eq!(align_of::<Chunk<Aligned>>() % align_of::<Aligned>(), 0);
        assert_eq!(Chunk::<Aligned>::SIZE % align_of::<Aligned>(), 0);
    }

    #[test]
    fn link_round_trips_through_chunk() {
        let mut a = MaybeUninit::<Chunk<u64>>::uninit();
        let mut b = MaybeUninit::<Chunk<u64>>::uninit();

        let a = NonNull::new(a.as_mut_ptr()).unwrap();
        let b = NonNull::new(b.as_mut_ptr()).unwrap();

        // SAFETY: Both pointers refer to live stack slots of the right type.
        unsafe {
            Chunk::set_next_free(a, Some(b));
        }
        // SAFETY: Both pointers refer to live stack slots of the right type.
        unsafe {
            Chunk::set_next_free(b, None);
        }

        // SAFETY: The links were written above.
        assert_eq!(unsafe { Chunk::next_free(a) }, Some(b));
        // SAFETY: The links were written above.
        assert_eq!(unsafe { Chunk::next_free(b) }, None);
    }

    #[test]
    fn relinking_replaces_previous_link() {
        let mut slots = [const { MaybeUninit::<Chunk<u64>>::uninit() }; 3];
        let [a, b, c] = &mut slots;
        let a = NonNull::new(a.as_mut_ptr()).unwrap();
        let b = NonNull::new(b.as_mut_ptr()).unwrap();
        let c = NonNull::new(c.as_mut_ptr()).unwrap();

        // SAFETY: The slots are valid for writes and hold no items.
        unsafe {
            Chunk::set_next_free(a, Some(b));
        }
        // SAFETY: The slots are valid for writes and hold no items.
        unsafe {
            Chunk::set_next_free(a, Some(c));
        }

        // SAFETY: The link was written above.
        assert_eq!(unsafe { Chunk::next_free(a) }, Some(c));

        // SAFETY: The slots are valid for writes and hold no items.
        unsafe {
            Chunk::set_next_free(a, None);
        }

        // SAFETY: The link was written above.
        assert_eq!(unsafe { Chunk::next_free(a) }, None);
    }

    #[test]
    fn item_pointer_is_chunk_pointer() {
        let mut slot = MaybeUninit::<Chunk<u32>>::uninit();
        let chunk = NonNull::new(slot.as_mut_ptr()).unwrap();

        let item = Chunk::as_item(chunk);
        assert_eq!(item.as_ptr().cast::<u8>(), chunk.as_ptr().cast::<u8>());
        assert_eq!(Chunk::from_item(item), chunk);
    }
}
