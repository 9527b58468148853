//! First-fit allocation with block splitting.

use tracing::{debug, trace};

use crate::error::HeapError;
use crate::header::{Header, HEADER_SIZE};
use crate::heap::Heap;

impl Heap {
    /// Allocate `size` payload bytes and return the payload address.
    ///
    /// Picks the first free block in address order that can hold
    /// `size + HEADER_SIZE` bytes. The remainder is split off as a new free
    /// block unless it is too small to carry a header, in which case it is
    /// folded into the allocation.
    ///
    /// # Errors
    ///
    /// - [`HeapError::NotInitialized`] before [`init`](Heap::init).
    /// - [`HeapError::OutOfMemory`] when no free block is large enough.
    ///   Nothing is modified on this path.
    pub fn allocate(&mut self, size: usize) -> Result<usize, HeapError> {
        self.ensure_initialized()?;

        let total = size
            .checked_add(HEADER_SIZE)
            .and_then(|total| u32::try_from(total).ok());
        let Some(total) = total else {
            return Err(self.out_of_memory(size));
        };
        let Some(selected) = self.free_list.first_fit(&self.arena, total) else {
            return Err(self.out_of_memory(size));
        };

        self.free_list.remove(&mut self.arena, selected.offset);

        let leftover = selected.size - total;
        let total = if (leftover as usize) < HEADER_SIZE {
            total + leftover
        } else {
            let remainder = selected.offset + total;
            self.arena
                .write_header(remainder, &Header::free(leftover, remainder));
            self.free_list.insert(&mut self.arena, remainder);
            trace!(offset = selected.offset, remainder, leftover, "split free block");
            total
        };

        self.arena
            .write_header(selected.offset, &Header::allocated(total, selected.offset));
        trace!(offset = selected.offset, size = total, "allocated block");
        Ok(selected.offset as usize + HEADER_SIZE)
    }

    /// Allocate `count * size` payload bytes.
    ///
    /// The returned region is **not** zeroed: it holds whatever bytes the
    /// arena contained at that position. Callers that need zeroed memory
    /// must clear it through [`payload_mut`](Heap::payload_mut).
    ///
    /// An overflowing `count * size` is reported as
    /// [`HeapError::OutOfMemory`].
    pub fn calloc(&mut self, count: usize, size: usize) -> Result<usize, HeapError> {
        match count.checked_mul(size) {
            Some(bytes) => self.allocate(bytes),
            None => {
                self.ensure_initialized()?;
                Err(self.out_of_memory(usize::MAX))
            }
        }
    }

    fn out_of_memory(&self, requested: usize) -> HeapError {
        let largest_free = self.largest_fragment();
        debug!(requested, largest_free, "allocation failed");
        HeapError::OutOfMemory {
            requested,
            largest_free,
        }
    }
}
