//! Reusable heap fixtures.
//!
//! - [`fragmented`] builds a heap whose free list holds blocks of chosen
//!   sizes, each pinned in place by a live separator allocation.
//! - [`Workload`] generates a deterministic, seeded stream of
//!   allocate/free operations for stress tests and benchmarks.

use fixheap::{Heap, HeapError, HEADER_SIZE};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Payload size of the separators placed by [`fragmented`].
pub const SEPARATOR_PAYLOAD: usize = 8;

/// A heap with one free fragment per entry of `fragment_sizes`.
///
/// Each size is a total block size, header included, and must be at least
/// [`HEADER_SIZE`]. Fragments are laid out from offset 0 in the order
/// given, each followed by a separator allocation that stays live.
/// Whatever remains after the last separator is one more free block.
///
/// Returns the heap and the separator addresses.
pub fn fragmented(capacity: usize, fragment_sizes: &[usize]) -> (Heap, Vec<usize>) {
    let mut heap = Heap::with_capacity(capacity).expect("fixture capacity");
    let mut holes = Vec::with_capacity(fragment_sizes.len());
    let mut separators = Vec::with_capacity(fragment_sizes.len());
    for &size in fragment_sizes {
        assert!(size >= HEADER_SIZE, "fragment of {size} bytes cannot hold a header");
        holes.push(heap.allocate(size - HEADER_SIZE).expect("fixture hole"));
        separators.push(heap.allocate(SEPARATOR_PAYLOAD).expect("fixture separator"));
    }
    for hole in holes {
        heap.free(hole).expect("fixture free");
    }
    (heap, separators)
}

/// One step of a generated workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Allocate this many payload bytes.
    Alloc(usize),
    /// Free the live allocation at this index (modulo the live count).
    Free(usize),
}

/// Seeded generator of allocate/free sequences.
///
/// The same seed always yields the same operations.
pub struct Workload {
    rng: ChaCha8Rng,
    max_payload: usize,
    free_ratio: f64,
}

impl Workload {
    pub fn new(seed: u64, max_payload: usize) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_payload,
            free_ratio: 0.4,
        }
    }

    /// Probability in `[0, 1]` that a step is a free.
    pub fn with_free_ratio(mut self, ratio: f64) -> Self {
        self.free_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn next_op(&mut self) -> Op {
        if self.rng.random_bool(self.free_ratio) {
            Op::Free(self.rng.random_range(0..usize::MAX))
        } else {
            Op::Alloc(self.rng.random_range(0..=self.max_payload))
        }
    }

    pub fn ops(&mut self, count: usize) -> Vec<Op> {
        (0..count).map(|_| self.next_op()).collect()
    }
}

/// Outcome counters from [`run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub allocated: usize,
    pub freed: usize,
    pub out_of_memory: usize,
}

/// Apply `ops` to `heap`, tracking live addresses in `live`.
///
/// Out-of-memory results are counted; any other error is returned.
/// `Free` steps with nothing live are skipped.
pub fn run(heap: &mut Heap, live: &mut Vec<usize>, ops: &[Op]) -> Result<RunSummary, HeapError> {
    let mut summary = RunSummary::default();
    for &op in ops {
        match op {
            Op::Alloc(size) => match heap.allocate(size) {
                Ok(addr) => {
                    live.push(addr);
                    summary.allocated += 1;
                }
                Err(HeapError::OutOfMemory { .. }) => summary.out_of_memory += 1,
                Err(e) => return Err(e),
            },
            Op::Free(pick) => {
                if live.is_empty() {
                    continue;
                }
                let addr = live.swap_remove(pick % live.len());
                heap.free(addr)?;
                summary.freed += 1;
            }
        }
    }
    Ok(summary)
}
