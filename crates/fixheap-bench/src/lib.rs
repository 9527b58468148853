//! Benchmark profiles for the fixheap allocator.
//!
//! - [`steady_state`]: a heap pre-churned into a realistic mix of live
//!   blocks and holes
//! - [`comb`]: a worst case for first fit, with many small holes ahead of
//!   the only large block

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use fixheap::{Heap, HeapError};
use fixheap_test_utils::fixtures::{run, Workload};

/// Arena size used by every profile.
pub const PROFILE_CAPACITY: usize = 256 * 1024;

/// A heap after `warmup_ops` seeded allocate/free steps, plus the
/// addresses still live.
pub fn steady_state(seed: u64, warmup_ops: usize) -> Result<(Heap, Vec<usize>), HeapError> {
    let mut heap = Heap::with_capacity(PROFILE_CAPACITY).expect("profile capacity is valid");
    let mut live = Vec::new();
    let ops = Workload::new(seed, 512).ops(warmup_ops);
    run(&mut heap, &mut live, &ops)?;
    Ok((heap, live))
}

/// A heap whose free list holds `holes` fragments of `hole_payload` bytes
/// each, separated by live blocks, followed by the remaining space.
pub fn comb(holes: usize, hole_payload: usize) -> Result<Heap, HeapError> {
    let mut heap = Heap::with_capacity(PROFILE_CAPACITY).expect("profile capacity is valid");
    let mut freed = Vec::with_capacity(holes);
    for _ in 0..holes {
        freed.push(heap.allocate(hole_payload)?);
        heap.allocate(0)?;
    }
    for addr in freed {
        heap.free(addr)?;
    }
    Ok(heap)
}
