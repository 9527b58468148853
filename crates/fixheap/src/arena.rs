//! The fixed-capacity byte buffer every block lives in.
//!
//! [`Arena`] owns the bytes and offers word-level accessors for the header
//! fields the free list rewrites in place. It knows nothing about which
//! offsets hold valid headers; callers are responsible for that.

use crate::header::{self, Header, UnknownStamp, HEADER_SIZE};

/// Fixed-capacity backing storage. Never grows after construction.
pub struct Arena {
    bytes: Box<[u8]>,
}

impl Arena {
    /// Create a zero-filled arena of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Zero every byte, erasing all stamps left by a previous lifetime.
    pub fn reset(&mut self) {
        self.bytes.fill(0);
    }

    /// Copy `src` into the arena starting at `dest`.
    ///
    /// # Panics
    ///
    /// Panics if `dest + src.len()` exceeds the capacity.
    pub fn copy(&mut self, src: &[u8], dest: usize) {
        self.bytes[dest..dest + src.len()].copy_from_slice(src);
    }

    /// Whether a full header fits at `offset`.
    pub fn holds_header(&self, offset: usize) -> bool {
        offset
            .checked_add(HEADER_SIZE)
            .is_some_and(|end| end <= self.bytes.len())
    }

    /// Decode the header at `offset`.
    pub fn read_header(&self, offset: u32) -> Result<Header, UnknownStamp> {
        Header::decode(self.header_bytes(offset))
    }

    /// Encode `header` at `offset`.
    pub fn write_header(&mut self, offset: u32, header: &Header) {
        self.copy(&header.encode(), offset as usize);
    }

    /// The `size` word of the header at `offset`.
    pub fn size_at(&self, offset: u32) -> u32 {
        header::get_u32_le(self.header_bytes(offset), header::SIZE_AT)
    }

    /// Overwrite the `size` word of the header at `offset`.
    pub fn set_size(&mut self, offset: u32, size: u32) {
        header::put_u32_le(self.header_bytes_mut(offset), header::SIZE_AT, size);
    }

    /// The free-list link stored in the header at `offset`.
    pub fn link_at(&self, offset: u32) -> Option<u32> {
        let bytes = self.header_bytes(offset);
        header::decode_link(
            header::get_u32_le(bytes, header::NEXT_AT),
            header::get_u32_le(bytes, header::FLAGS_AT),
        )
    }

    /// Overwrite the free-list link of the header at `offset`, leaving the
    /// stamp and size words untouched.
    pub fn set_link(&mut self, offset: u32, next: Option<u32>) {
        let (next, flags) = header::encode_link(next);
        let bytes = self.header_bytes_mut(offset);
        header::put_u32_le(bytes, header::NEXT_AT, next);
        header::put_u32_le(bytes, header::FLAGS_AT, flags);
    }

    /// Shared view of `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.bytes[offset..offset + len]
    }

    /// Mutable view of `len` bytes starting at `offset`.
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.bytes[offset..offset + len]
    }

    /// The whole arena.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn header_bytes(&self, offset: u32) -> &[u8] {
        self.slice(offset as usize, HEADER_SIZE)
    }

    fn header_bytes_mut(&mut self, offset: u32) -> &mut [u8] {
        self.slice_mut(offset as usize, HEADER_SIZE)
    }
}
