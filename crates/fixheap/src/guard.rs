//! Corruption guard: decides whether an address names a live allocation.
//!
//! The stamp words are checked at the exact recovered header location
//! before the size or start fields are trusted. A block released by `free`
//! keeps its release mark until the bytes are reused, so a repeated `free`
//! is told apart from a free of an address that was never allocated.

use crate::arena::Arena;
use crate::error::InvalidFreeReason;
use crate::header::{BlockKind, Header, HEADER_SIZE};

/// Validate that the payload address `addr` belongs to a live allocation
/// and return its header. Reads only.
pub(crate) fn check_allocated(arena: &Arena, addr: usize) -> Result<Header, InvalidFreeReason> {
    let offset = addr
        .checked_sub(HEADER_SIZE)
        .filter(|&offset| arena.holds_header(offset))
        .ok_or(InvalidFreeReason::OutOfBounds)?;
    // holds_header bounds offset by the capacity, which fits in u32.
    let offset = offset as u32;

    let header = arena
        .read_header(offset)
        .map_err(|_| InvalidFreeReason::NotAllocated)?;
    match header.kind {
        BlockKind::Allocated => {}
        BlockKind::FreedTwice => return Err(InvalidFreeReason::AlreadyFreed),
        BlockKind::Free => return Err(InvalidFreeReason::NotAllocated),
    }

    if header.start != offset {
        return Err(InvalidFreeReason::Misplaced);
    }
    let in_range = (header.size as usize) >= HEADER_SIZE
        && offset as usize + header.size as usize <= arena.capacity();
    if !in_range {
        return Err(InvalidFreeReason::BadSize);
    }
    Ok(header)
}
