//! Block header codec.
//!
//! Every block starts with a fixed [`HEADER_SIZE`]-byte header made of six
//! little-endian `u32` words. Free and Allocated headers share the same
//! footprint so a block can change kind in place:
//!
//! ```text
//! 0       4         8       12      16      20      24
//! ┌───────┬─────────┬───────┬───────┬───────┬───────┐
//! │  tag  │ release │ size  │ start │ next  │ flags │
//! └───────┴─────────┴───────┴───────┴───────┴───────┘
//! ```
//!
//! `tag` and `release` together form the block's [`BlockKind`]. `next` and
//! `flags` are only meaningful on blocks that sit in the free list.

/// Size of every block header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Sentinel in the `tag` word of an allocated block.
pub const ALLOCATED_TAG: u32 = 86_456_231;

/// Sentinel in the `tag` word of a free block.
pub const FREE_TAG: u32 = 0x4652_4545;

/// Sentinel in the `release` word of a block that went through `free`.
pub const RELEASE_MARK: u32 = 0x5245_4C53;

/// Null link: stored in the `next` word when a free block has no successor.
pub const NIL: u32 = u32::MAX;

pub(crate) const TAG_AT: usize = 0;
pub(crate) const RELEASE_AT: usize = 4;
pub(crate) const SIZE_AT: usize = 8;
pub(crate) const START_AT: usize = 12;
pub(crate) const NEXT_AT: usize = 16;
pub(crate) const FLAGS_AT: usize = 20;

const FLAG_HAS_NEXT: u32 = 1;

/// Discriminant decoded from a header's `tag` and `release` words.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Handed out by `allocate`; payload owned by the caller.
    Allocated,
    /// Free space that has never been released by `free` (the initial block
    /// or a split remainder).
    Free,
    /// Free space that was released by `free`. Carries the release mark so
    /// a second `free` on the same address is recognised.
    FreedTwice,
}

impl BlockKind {
    /// The `(tag, release)` word pair written for this kind.
    pub fn stamps(self) -> (u32, u32) {
        match self {
            Self::Allocated => (ALLOCATED_TAG, 0),
            Self::Free => (FREE_TAG, 0),
            Self::FreedTwice => (FREE_TAG, RELEASE_MARK),
        }
    }

    /// Decode a `(tag, release)` pair. Returns `None` for any combination
    /// this allocator never writes.
    pub fn from_stamps(tag: u32, release: u32) -> Option<Self> {
        match (tag, release) {
            (ALLOCATED_TAG, 0) => Some(Self::Allocated),
            (FREE_TAG, 0) => Some(Self::Free),
            (FREE_TAG, RELEASE_MARK) => Some(Self::FreedTwice),
            _ => None,
        }
    }

    /// Whether blocks of this kind belong in the free list.
    pub fn is_free(self) -> bool {
        matches!(self, Self::Free | Self::FreedTwice)
    }
}

/// The stamp words of a header that did not decode to a known [`BlockKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownStamp {
    /// Raw `tag` word.
    pub tag: u32,
    /// Raw `release` word.
    pub release: u32,
}

/// Decoded block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Block kind.
    pub kind: BlockKind,
    /// Total footprint of the block in bytes, header included.
    pub size: u32,
    /// Offset of the block within the arena.
    pub start: u32,
    /// Offset of the next free block, if any. Always `None` on allocated blocks.
    pub next: Option<u32>,
}

impl Header {
    /// Header for a live allocation.
    pub fn allocated(size: u32, start: u32) -> Self {
        Self {
            kind: BlockKind::Allocated,
            size,
            start,
            next: None,
        }
    }

    /// Header for a fresh free block (not yet linked).
    pub fn free(size: u32, start: u32) -> Self {
        Self {
            kind: BlockKind::Free,
            size,
            start,
            next: None,
        }
    }

    /// Header for a block just returned through `free` (not yet linked).
    pub fn released(size: u32, start: u32) -> Self {
        Self {
            kind: BlockKind::FreedTwice,
            size,
            start,
            next: None,
        }
    }

    /// Offset one past the last byte of the block.
    pub fn end(&self) -> u32 {
        self.start + self.size
    }

    /// Encode into the on-arena byte layout.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let (tag, release) = self.kind.stamps();
        let (next, flags) = encode_link(self.next);
        let mut buf = [0u8; HEADER_SIZE];
        put_u32_le(&mut buf, TAG_AT, tag);
        put_u32_le(&mut buf, RELEASE_AT, release);
        put_u32_le(&mut buf, SIZE_AT, self.size);
        put_u32_le(&mut buf, START_AT, self.start);
        put_u32_le(&mut buf, NEXT_AT, next);
        put_u32_le(&mut buf, FLAGS_AT, flags);
        buf
    }

    /// Decode from the first [`HEADER_SIZE`] bytes of `bytes`.
    ///
    /// The stamp words are checked before any other field is interpreted.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than [`HEADER_SIZE`].
    pub fn decode(bytes: &[u8]) -> Result<Self, UnknownStamp> {
        let tag = get_u32_le(bytes, TAG_AT);
        let release = get_u32_le(bytes, RELEASE_AT);
        let kind = BlockKind::from_stamps(tag, release).ok_or(UnknownStamp { tag, release })?;
        Ok(Self {
            kind,
            size: get_u32_le(bytes, SIZE_AT),
            start: get_u32_le(bytes, START_AT),
            next: decode_link(
                get_u32_le(bytes, NEXT_AT),
                get_u32_le(bytes, FLAGS_AT),
            ),
        })
    }
}

/// Interpret a raw `(next, flags)` word pair.
pub(crate) fn decode_link(next: u32, flags: u32) -> Option<u32> {
    if flags & FLAG_HAS_NEXT != 0 && next != NIL {
        Some(next)
    } else {
        None
    }
}

/// Raw `(next, flags)` word pair for a link.
pub(crate) fn encode_link(next: Option<u32>) -> (u32, u32) {
    match next {
        Some(next) => (next, FLAG_HAS_NEXT),
        None => (NIL, 0),
    }
}

/// Read a little-endian u32 at byte `at`.
pub(crate) fn get_u32_le(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(word)
}

/// Write a little-endian u32 at byte `at`.
pub(crate) fn put_u32_le(bytes: &mut [u8], at: usize, v: u32) {
    bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
}
