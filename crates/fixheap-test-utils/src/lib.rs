//! Test utilities for fixheap development.
//!
//! Provides invariant assertions, byte-level [`HeapSnapshot`]s for
//! "nothing changed" checks, and the fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use fixheap::{Fragment, Heap};

/// Panic with the violated invariant if the heap is inconsistent.
#[track_caller]
pub fn assert_heap_consistent(heap: &Heap) {
    if let Err(violation) = heap.verify() {
        panic!("heap invariant violated: {violation}\nfragments: {:?}", heap.fragments());
    }
}

/// Panic unless the free list holds exactly `expected` as (offset, size) pairs.
#[track_caller]
pub fn assert_fragments(heap: &Heap, expected: &[(usize, usize)]) {
    let actual: Vec<(usize, usize)> = heap
        .fragments()
        .iter()
        .map(|fragment| (fragment.offset, fragment.size))
        .collect();
    assert_eq!(actual, expected, "free list mismatch");
}

/// A full copy of a heap's observable state.
///
/// Compare a snapshot taken before a failing operation with one taken
/// after it to prove the operation left the heap untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapSnapshot {
    pub bytes: Vec<u8>,
    pub fragments: Vec<Fragment>,
    pub head: Option<usize>,
}

impl HeapSnapshot {
    pub fn capture(heap: &Heap) -> Self {
        Self {
            bytes: heap.arena_bytes().to_vec(),
            fragments: heap.fragments(),
            head: heap.free_list_head(),
        }
    }

    /// Panic if `heap` differs from this snapshot in any byte.
    #[track_caller]
    pub fn assert_unchanged(&self, heap: &Heap) {
        let now = Self::capture(heap);
        assert_eq!(self.head, now.head, "free list head changed");
        assert_eq!(self.fragments, now.fragments, "free list changed");
        if let Some(offset) = self
            .bytes
            .iter()
            .zip(&now.bytes)
            .position(|(before, after)| before != after)
        {
            panic!("arena changed at byte {offset}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_detects_no_change_on_failed_free() {
        let mut heap = Heap::with_capacity(500).unwrap();
        let addr = heap.allocate(40).unwrap();
        heap.free(addr).unwrap();
        let snapshot = HeapSnapshot::capture(&heap);
        assert!(heap.free(addr).is_err());
        snapshot.assert_unchanged(&heap);
    }

    #[test]
    #[should_panic(expected = "arena changed")]
    fn snapshot_detects_write() {
        let mut heap = Heap::with_capacity(500).unwrap();
        let addr = heap.allocate(40).unwrap();
        let snapshot = HeapSnapshot::capture(&heap);
        heap.payload_mut(addr).unwrap()[0] = 0xFF;
        snapshot.assert_unchanged(&heap);
    }

    #[test]
    fn fresh_heap_is_consistent() {
        let heap = Heap::with_capacity(500).unwrap();
        assert_heap_consistent(&heap);
        assert_fragments(&heap, &[(0, 500)]);
    }
}
