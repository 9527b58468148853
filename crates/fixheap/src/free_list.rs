//! Address-ordered singly-linked list of free blocks.
//!
//! The list lives inside the arena: each node is the header of a free block
//! and its `next` word holds the offset of the following free block. The
//! [`FreeList`] value itself only remembers the head offset and whether the
//! list is non-empty, since an arena-resident head cannot be "null".
//!
//! All lookups go through one traversal primitive, [`FreeList::find`],
//! which walks nodes in ascending address order and returns the first one
//! accepted by a `(node, target)` predicate.

use crate::arena::Arena;

/// A free block as seen through its header's size and link words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreeNode {
    /// Offset of the block (and its header) in the arena.
    pub offset: u32,
    /// Total footprint in bytes, header included.
    pub size: u32,
    /// Offset of the next free block, if any.
    pub next: Option<u32>,
}

impl FreeNode {
    /// Read the node whose header sits at `offset`.
    pub fn read(arena: &Arena, offset: u32) -> Self {
        Self {
            offset,
            size: arena.size_at(offset),
            next: arena.link_at(offset),
        }
    }

    /// Offset one past the last byte of the block.
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }
}

/// First-fit predicate: the block can host `target` bytes.
fn fits(node: &FreeNode, target: u32) -> bool {
    node.size >= target
}

/// Predecessor predicate: the node starts below `target` and its successor
/// (if any) starts at or beyond it.
fn precedes(node: &FreeNode, target: u32) -> bool {
    node.offset < target && node.next.is_none_or(|next| next >= target)
}

/// Successor predicate: the node starts beyond `target`.
fn follows(node: &FreeNode, target: u32) -> bool {
    node.offset > target
}

/// Head of the in-arena free list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreeList {
    head: u32,
    non_empty: bool,
}

impl FreeList {
    /// An empty list.
    pub const fn empty() -> Self {
        Self {
            head: 0,
            non_empty: false,
        }
    }

    /// A list holding the single block at `offset`.
    pub const fn single(offset: u32) -> Self {
        Self {
            head: offset,
            non_empty: true,
        }
    }

    /// Offset of the first (lowest-address) free block.
    pub fn head(&self) -> Option<u32> {
        self.non_empty.then_some(self.head)
    }

    /// Whether the list has no nodes.
    pub fn is_empty(&self) -> bool {
        !self.non_empty
    }

    /// Walk the list in address order and return the first node for which
    /// `pred(node, target)` holds.
    pub fn find<P>(&self, arena: &Arena, target: u32, mut pred: P) -> Option<FreeNode>
    where
        P: FnMut(&FreeNode, u32) -> bool,
    {
        let mut cursor = self.head()?;
        loop {
            let node = FreeNode::read(arena, cursor);
            if pred(&node, target) {
                return Some(node);
            }
            cursor = node.next?;
        }
    }

    /// First block in address order whose size is at least `size`.
    pub fn first_fit(&self, arena: &Arena, size: u32) -> Option<FreeNode> {
        self.find(arena, size, fits)
    }

    /// The node with the greatest offset strictly below `offset`.
    pub fn predecessor(&self, arena: &Arena, offset: u32) -> Option<FreeNode> {
        self.find(arena, offset, precedes)
    }

    /// The node with the smallest offset strictly above `offset`.
    pub fn successor(&self, arena: &Arena, offset: u32) -> Option<FreeNode> {
        self.find(arena, offset, follows)
    }

    /// Link the block whose header is already stamped at `offset` into its
    /// sorted position.
    ///
    /// `offset` must not already be in the list.
    pub fn insert(&mut self, arena: &mut Arena, offset: u32) {
        let pred = self.predecessor(arena, offset);
        let succ = self.successor(arena, offset);

        arena.set_link(offset, succ.map(|n| n.offset));
        match pred {
            Some(pred) => arena.set_link(pred.offset, Some(offset)),
            None => {
                self.head = offset;
                self.non_empty = true;
            }
        }
    }

    /// Unlink the block at `offset`. Its own header is left untouched.
    ///
    /// `offset` must be in the list.
    pub fn remove(&mut self, arena: &mut Arena, offset: u32) {
        let pred = self.predecessor(arena, offset);
        let succ = self.successor(arena, offset);

        match (pred, succ) {
            (Some(pred), succ) => arena.set_link(pred.offset, succ.map(|n| n.offset)),
            (None, Some(succ)) => self.head = succ.offset,
            (None, None) => self.non_empty = false,
        }
    }

    /// Iterate nodes in address order.
    pub fn iter<'a>(&self, arena: &'a Arena) -> Iter<'a> {
        Iter {
            arena,
            cursor: self.head(),
        }
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::empty()
    }
}

/// Address-order iterator over a [`FreeList`].
pub struct Iter<'a> {
    arena: &'a Arena,
    cursor: Option<u32>,
}

impl Iterator for Iter<'_> {
    type Item = FreeNode;

    fn next(&mut self) -> Option<FreeNode> {
        let node = FreeNode::read(self.arena, self.cursor?);
        self.cursor = node.next;
        Some(node)
    }
}
