//! Merging of address-adjacent free blocks.

use tracing::trace;

use crate::arena::Arena;
use crate::free_list::{FreeList, FreeNode};

/// Walk `list` from the head and merge every node with its successor when
/// the two are contiguous. After a merge the same node is tested again, so
/// runs of three or more fragments collapse in a single pass.
///
/// Returns the number of merges performed.
pub(crate) fn coalesce(list: &FreeList, arena: &mut Arena) -> usize {
    let Some(mut cursor) = list.head() else {
        return 0;
    };
    let mut merges = 0;
    loop {
        let node = FreeNode::read(arena, cursor);
        let Some(next_offset) = node.next else {
            break;
        };
        if node.end() == next_offset {
            let next = FreeNode::read(arena, next_offset);
            arena.set_size(cursor, node.size + next.size);
            arena.set_link(cursor, next.next);
            trace!(
                offset = cursor,
                absorbed = next_offset,
                size = node.size + next.size,
                "merged free blocks"
            );
            merges += 1;
        } else {
            cursor = next_offset;
        }
    }
    merges
}
