//! Returning blocks to the free list.

use tracing::{trace, warn};

use crate::coalesce::coalesce;
use crate::error::HeapError;
use crate::guard;
use crate::header::Header;
use crate::heap::Heap;

impl Heap {
    /// Release the allocation at payload address `addr`.
    ///
    /// The header is validated by the corruption guard before anything is
    /// written. On success the block is restamped as released, linked back
    /// into the free list in address order, and contiguous free blocks are
    /// merged.
    ///
    /// # Errors
    ///
    /// - [`HeapError::NotInitialized`] before [`init`](Heap::init).
    /// - [`HeapError::InvalidFree`] if `addr` was never returned by
    ///   [`allocate`](Heap::allocate), was already freed, or its header is
    ///   damaged. Nothing is modified on this path.
    pub fn free(&mut self, addr: usize) -> Result<(), HeapError> {
        self.ensure_initialized()?;

        let header = guard::check_allocated(&self.arena, addr).map_err(|reason| {
            warn!(addr, %reason, "rejected free");
            HeapError::InvalidFree { addr, reason }
        })?;

        self.arena
            .write_header(header.start, &Header::released(header.size, header.start));
        self.free_list.insert(&mut self.arena, header.start);
        let merges = coalesce(&self.free_list, &mut self.arena);
        trace!(offset = header.start, size = header.size, merges, "freed block");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{HeapError, InvalidFreeReason};
    use crate::header::HEADER_SIZE;
    use crate::heap::Heap;

    #[test]
    fn round_trip_restores_single_fragment() {
        let mut heap = Heap::with_capacity(1000).unwrap();
        let addr = heap.allocate(300).unwrap();
        heap.free(addr).unwrap();
        assert_eq!(heap.fragment_count(), 1);
        assert_eq!(heap.free_bytes(), 1000);
        assert_eq!(heap.free_list_head(), Some(0));
    }

    #[test]
    fn double_free_is_rejected_without_changes() {
        let mut heap = Heap::with_capacity(1000).unwrap();
        let a = heap.allocate(100).unwrap();
        let _b = heap.allocate(100).unwrap();
        heap.free(a).unwrap();

        let before = heap.arena_bytes().to_vec();
        let fragments = heap.fragments();
        assert_eq!(
            heap.free(a),
            Err(HeapError::InvalidFree {
                addr: a,
                reason: InvalidFreeReason::AlreadyFreed,
            })
        );
        assert_eq!(heap.arena_bytes(), &before[..]);
        assert_eq!(heap.fragments(), fragments);
    }

    #[test]
    fn double_free_after_merge_is_still_detected() {
        let mut heap = Heap::with_capacity(1000).unwrap();
        let a = heap.allocate(100).unwrap();
        let b = heap.allocate(100).unwrap();
        heap.allocate(100).unwrap();
        heap.free(a).unwrap();
        heap.free(b).unwrap();
        // b's header is now interior to a's merged block.
        assert!(matches!(
            heap.free(b),
            Err(HeapError::InvalidFree {
                reason: InvalidFreeReason::AlreadyFreed,
                ..
            })
        ));
    }

    #[test]
    fn free_of_interior_address_is_rejected() {
        let mut heap = Heap::with_capacity(1000).unwrap();
        let a = heap.allocate(100).unwrap();
        let before = heap.arena_bytes().to_vec();
        assert!(matches!(
            heap.free(a + 8),
            Err(HeapError::InvalidFree { .. })
        ));
        assert_eq!(heap.arena_bytes(), &before[..]);
    }

    #[test]
    fn free_of_split_remainder_is_rejected() {
        let mut heap = Heap::with_capacity(1000).unwrap();
        let a = heap.allocate(100).unwrap();
        let remainder_payload = a + 100 + HEADER_SIZE;
        assert_eq!(
            heap.free(remainder_payload),
            Err(HeapError::InvalidFree {
                addr: remainder_payload,
                reason: InvalidFreeReason::NotAllocated,
            })
        );
    }

    #[test]
    fn free_out_of_bounds_is_rejected() {
        let mut heap = Heap::with_capacity(1000).unwrap();
        for addr in [0, 1, 5000, usize::MAX] {
            assert_eq!(
                heap.free(addr),
                Err(HeapError::InvalidFree {
                    addr,
                    reason: InvalidFreeReason::OutOfBounds,
                })
            );
        }
    }

    #[test]
    fn freed_block_is_reused_first_fit() {
        let mut heap = Heap::with_capacity(1000).unwrap();
        let a = heap.allocate(100).unwrap();
        heap.allocate(100).unwrap();
        heap.free(a).unwrap();
        assert_eq!(heap.allocate(50).unwrap(), a);
    }

    #[test]
    fn reallocated_address_can_be_freed_again() {
        let mut heap = Heap::with_capacity(1000).unwrap();
        let a = heap.allocate(100).unwrap();
        heap.free(a).unwrap();
        let again = heap.allocate(100).unwrap();
        assert_eq!(again, a);
        assert_eq!(heap.free(again), Ok(()));
    }
}
