//! Read-only diagnostics: free-list statistics, physical block walks and
//! full invariant verification.
//!
//! Nothing in this module mutates the heap.

use std::fmt;

use crate::header::{BlockKind, HEADER_SIZE};
use crate::heap::Heap;

/// A free block as reported by [`Heap::fragments`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fragment {
    /// Offset of the block in the arena.
    pub offset: usize,
    /// Total size in bytes, header included.
    pub size: usize,
}

/// One block found by walking the arena from offset 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block in the arena.
    pub offset: usize,
    /// Total size in bytes, header included.
    pub size: usize,
    /// Decoded kind.
    pub kind: BlockKind,
}

/// Aggregate heap statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Arena capacity in bytes.
    pub capacity: usize,
    /// Bytes held by free blocks, headers included.
    pub free_bytes: usize,
    /// Number of free-list entries.
    pub fragment_count: usize,
    /// Size of the largest free block.
    pub largest_fragment: usize,
    /// Number of live allocations.
    pub allocated_blocks: usize,
    /// Bytes held by live allocations, headers included.
    pub allocated_bytes: usize,
}

/// A broken heap invariant found by [`Heap::verify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A block header along the physical walk has unknown stamps.
    CorruptHeader {
        /// Offset of the header.
        offset: usize,
    },
    /// A header's start field disagrees with its location.
    MisplacedHeader {
        /// Where the header was found.
        offset: usize,
        /// The start offset it records.
        recorded: usize,
    },
    /// A block is smaller than a header or runs past the arena end.
    BadBlockSize {
        /// Offset of the block.
        offset: usize,
        /// Its recorded size.
        size: usize,
    },
    /// The physical walk does not cover the arena exactly.
    PartitionGap {
        /// Offset where the walk stopped.
        offset: usize,
    },
    /// The free list visits more nodes than the arena can hold.
    FreeListCycle,
    /// Two consecutive free-list entries are not in ascending order.
    UnsortedFreeList {
        /// The earlier entry.
        prev: usize,
        /// The entry that follows it.
        next: usize,
    },
    /// Two consecutive free-list entries are contiguous and were not merged.
    AdjacentFragments {
        /// The earlier entry.
        prev: usize,
        /// The entry starting where `prev` ends.
        next: usize,
    },
    /// A free-list entry is not a free block on the physical walk.
    StrayFreeListEntry {
        /// Offset of the entry.
        offset: usize,
    },
    /// A free block on the physical walk is missing from the free list.
    UnlistedFreeBlock {
        /// Offset of the block.
        offset: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorruptHeader { offset } => write!(f, "corrupt header at {offset}"),
            Self::MisplacedHeader { offset, recorded } => {
                write!(f, "header at {offset} records start {recorded}")
            }
            Self::BadBlockSize { offset, size } => {
                write!(f, "block at {offset} has invalid size {size}")
            }
            Self::PartitionGap { offset } => {
                write!(f, "block walk does not reach arena end (stopped at {offset})")
            }
            Self::FreeListCycle => write!(f, "free list does not terminate"),
            Self::UnsortedFreeList { prev, next } => {
                write!(f, "free list out of order: {prev} before {next}")
            }
            Self::AdjacentFragments { prev, next } => {
                write!(f, "uncoalesced free blocks at {prev} and {next}")
            }
            Self::StrayFreeListEntry { offset } => {
                write!(f, "free list entry {offset} is not a free block")
            }
            Self::UnlistedFreeBlock { offset } => {
                write!(f, "free block {offset} missing from free list")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

impl Heap {
    /// Number of free-list entries.
    pub fn fragment_count(&self) -> usize {
        self.free_list.iter(&self.arena).count()
    }

    /// Total bytes held by free blocks, headers included.
    pub fn free_bytes(&self) -> usize {
        self.free_list
            .iter(&self.arena)
            .map(|node| node.size as usize)
            .sum()
    }

    /// Offset of the first free block, or `None` when nothing is free or
    /// the heap is uninitialised.
    pub fn free_list_head(&self) -> Option<usize> {
        self.free_list.head().map(|head| head as usize)
    }

    /// Size of the largest free block, or 0 when nothing is free.
    pub fn largest_fragment(&self) -> usize {
        self.free_list
            .iter(&self.arena)
            .map(|node| node.size as usize)
            .max()
            .unwrap_or(0)
    }

    /// Free blocks in address order.
    pub fn fragments(&self) -> Vec<Fragment> {
        self.free_list
            .iter(&self.arena)
            .map(|node| Fragment {
                offset: node.offset as usize,
                size: node.size as usize,
            })
            .collect()
    }

    /// The raw arena bytes.
    pub fn arena_bytes(&self) -> &[u8] {
        self.arena.as_bytes()
    }

    /// Walk every block from offset 0 to the end of the arena.
    ///
    /// Returns an empty list on an uninitialised heap.
    pub fn blocks(&self) -> Result<Vec<BlockInfo>, InvariantViolation> {
        let mut blocks = Vec::new();
        if !self.initialized {
            return Ok(blocks);
        }
        let capacity = self.arena.capacity();
        let mut offset = 0usize;
        while offset < capacity {
            if !self.arena.holds_header(offset) {
                return Err(InvariantViolation::PartitionGap { offset });
            }
            let header = self
                .arena
                .read_header(offset as u32)
                .map_err(|_| InvariantViolation::CorruptHeader { offset })?;
            if header.start as usize != offset {
                return Err(InvariantViolation::MisplacedHeader {
                    offset,
                    recorded: header.start as usize,
                });
            }
            let size = header.size as usize;
            if size < HEADER_SIZE || offset + size > capacity {
                return Err(InvariantViolation::BadBlockSize { offset, size });
            }
            blocks.push(BlockInfo {
                offset,
                size,
                kind: header.kind,
            });
            offset += size;
        }
        Ok(blocks)
    }

    /// Aggregate statistics. Allocation counts come from a physical walk;
    /// if the walk fails they are reported as zero.
    pub fn stats(&self) -> HeapStats {
        let (allocated_blocks, allocated_bytes) = self
            .blocks()
            .unwrap_or_default()
            .iter()
            .filter(|block| block.kind == BlockKind::Allocated)
            .fold((0, 0), |(count, bytes), block| (count + 1, bytes + block.size));
        HeapStats {
            capacity: self.arena.capacity(),
            free_bytes: self.free_bytes(),
            fragment_count: self.fragment_count(),
            largest_fragment: self.largest_fragment(),
            allocated_blocks,
            allocated_bytes,
        }
    }

    /// Check every structural invariant:
    ///
    /// - blocks partition `[0, capacity)` with valid headers;
    /// - the free list is finite, strictly ascending and never lists two
    ///   contiguous blocks;
    /// - the free list holds exactly the free blocks of the partition.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let blocks = self.blocks()?;
        if !self.initialized {
            return Ok(());
        }

        let mut free_blocks = blocks
            .iter()
            .filter(|block| block.kind.is_free())
            .map(|block| block.offset);

        // Every node occupies at least one header, which bounds the length.
        let max_nodes = self.arena.capacity() / HEADER_SIZE;
        let mut prev: Option<(usize, usize)> = None;
        for (visited, node) in self.free_list.iter(&self.arena).enumerate() {
            if visited >= max_nodes {
                return Err(InvariantViolation::FreeListCycle);
            }
            let offset = node.offset as usize;
            if let Some((prev_offset, prev_end)) = prev {
                if offset <= prev_offset {
                    return Err(InvariantViolation::UnsortedFreeList {
                        prev: prev_offset,
                        next: offset,
                    });
                }
                if prev_end == offset {
                    return Err(InvariantViolation::AdjacentFragments {
                        prev: prev_offset,
                        next: offset,
                    });
                }
            }
            match free_blocks.next() {
                Some(expected) if expected == offset => {}
                Some(expected) if expected < offset => {
                    return Err(InvariantViolation::UnlistedFreeBlock { offset: expected });
                }
                _ => return Err(InvariantViolation::StrayFreeListEntry { offset }),
            }
            prev = Some((offset, node.end() as usize));
        }
        if let Some(offset) = free_blocks.next() {
            return Err(InvariantViolation::UnlistedFreeBlock { offset });
        }
        Ok(())
    }
}
