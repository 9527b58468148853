//! First-fit free-list allocator over a single fixed-size byte arena.
//!
//! A [`Heap`] owns one arena and hands out byte offsets into it. All
//! bookkeeping lives inside the arena itself: every block starts with a
//! [`HEADER_SIZE`]-byte header, and free blocks are chained into an
//! address-ordered singly-linked list through their headers.
//!
//! # Architecture
//!
//! ```text
//! Heap (context: config + lifecycle)
//! ├── Arena          fixed Box<[u8]>, word-level header field access
//! ├── header         Header / BlockKind encode + decode
//! ├── FreeList       head offset + non-empty flag, predicate search,
//! │                  sorted insert, remove
//! ├── alloc          first-fit, split, stamp
//! ├── dealloc        guard check, restamp, insert, coalesce
//! ├── coalesce       merge contiguous free blocks
//! ├── guard          sentinel validation of caller addresses
//! └── inspect        stats, block walk, invariant verification
//! ```
//!
//! # Block layout
//!
//! ```text
//! offset 0                                                capacity
//! ┌────────┬──────────┬────────┬──────────┬────────┬──────────────┐
//! │ header │ payload  │ header │ payload  │ header │     free     │
//! │ alloc  │          │ freed  │ (stale)  │ free   │              │
//! └────────┴──────────┴────────┴──────────┴────────┴──────────────┘
//!          ▲
//!          └── address returned by allocate()
//! ```
//!
//! Block sizes always include the header; the initial free block spans
//! the whole capacity.
//!
//! # Guarantees
//!
//! - Blocks partition `[0, capacity)` at all times.
//! - After every `allocate` and `free`, no two consecutive free-list
//!   entries are contiguous.
//! - Every failing operation is a no-op.
//!
//! Not provided: thread safety, growth, alignment, zeroing in
//! [`Heap::calloc`].
//!
//! # Example
//!
//! ```
//! use fixheap::Heap;
//!
//! let mut heap = Heap::with_capacity(1000).unwrap();
//! let addr = heap.allocate(40).unwrap();
//! heap.payload_mut(addr).unwrap()[..4].copy_from_slice(&42u32.to_le_bytes());
//! heap.free(addr).unwrap();
//! assert_eq!(heap.fragment_count(), 1);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod alloc;
pub mod arena;
mod coalesce;
pub mod config;
mod dealloc;
pub mod error;
pub mod free_list;
mod guard;
pub mod header;
pub mod heap;
pub mod inspect;

// Public re-exports for the primary API surface.
pub use config::HeapConfig;
pub use error::{ConfigError, HeapError, InvalidFreeReason};
pub use header::{BlockKind, HEADER_SIZE};
pub use heap::Heap;
pub use inspect::{BlockInfo, Fragment, HeapStats, InvariantViolation};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Alloc(usize),
        Free(usize),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..300).prop_map(Op::Alloc),
            (0usize..64).prop_map(Op::Free),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_under_random_workload(
            capacity in 64usize..4096,
            ops in proptest::collection::vec(arb_op(), 1..120),
        ) {
            let mut heap = Heap::with_capacity(capacity).unwrap();
            let mut live: Vec<usize> = Vec::new();
            for op in ops {
                match op {
                    Op::Alloc(size) => {
                        let free_before = heap.free_bytes();
                        match heap.allocate(size) {
                            Ok(addr) => {
                                prop_assert!(heap.payload(addr).unwrap().len() >= size);
                                live.push(addr);
                            }
                            Err(HeapError::OutOfMemory { .. }) => {
                                prop_assert_eq!(heap.free_bytes(), free_before);
                            }
                            Err(e) => prop_assert!(false, "unexpected error {e}"),
                        }
                    }
                    Op::Free(pick) if !live.is_empty() => {
                        let addr = live.swap_remove(pick % live.len());
                        prop_assert_eq!(heap.free(addr), Ok(()));
                    }
                    Op::Free(_) => {}
                }
                prop_assert_eq!(heap.verify(), Ok(()));
            }

            // Releasing everything always returns the arena to one block.
            for addr in live {
                prop_assert_eq!(heap.free(addr), Ok(()));
            }
            prop_assert_eq!(heap.fragment_count(), 1);
            prop_assert_eq!(heap.free_bytes(), capacity);
        }

        #[test]
        fn live_allocations_never_overlap(
            sizes in proptest::collection::vec(0usize..200, 1..40),
        ) {
            let mut heap = Heap::with_capacity(8192).unwrap();
            let mut ranges = Vec::new();
            for size in sizes {
                if let Ok(addr) = heap.allocate(size) {
                    let len = heap.payload(addr).unwrap().len();
                    ranges.push((addr - HEADER_SIZE, addr + len));
                }
            }
            ranges.sort_unstable();
            for pair in ranges.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].0);
            }
        }
    }
}
