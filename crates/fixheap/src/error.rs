//! Heap error types.

use std::error::Error;
use std::fmt;

/// Errors returned by heap operations.
///
/// Every failing call leaves the heap exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// The heap has not been initialised with [`Heap::init`](crate::Heap::init).
    NotInitialized,
    /// No free block is large enough for the request.
    OutOfMemory {
        /// Payload bytes requested (saturated on arithmetic overflow).
        requested: usize,
        /// Largest free block in bytes, header included.
        largest_free: usize,
    },
    /// `free` was called on an address that does not name a live allocation.
    InvalidFree {
        /// The address passed to `free`.
        addr: usize,
        /// Which check rejected it.
        reason: InvalidFreeReason,
    },
    /// A payload accessor was given an address that does not name a live
    /// allocation.
    InvalidAddress {
        /// The address that was rejected.
        addr: usize,
    },
}

/// Why the corruption guard rejected an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidFreeReason {
    /// The recovered header location lies outside the arena.
    OutOfBounds,
    /// No allocated sentinel at the recovered header location.
    NotAllocated,
    /// The block carries the release mark of a previous `free`.
    AlreadyFreed,
    /// The header's start offset disagrees with where it was found.
    Misplaced,
    /// The header's size is smaller than a header or overruns the arena.
    BadSize,
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "heap not initialized"),
            Self::OutOfMemory {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} bytes, largest free block {largest_free} bytes"
                )
            }
            Self::InvalidFree { addr, reason } => {
                write!(f, "invalid free of address {addr}: {reason}")
            }
            Self::InvalidAddress { addr } => {
                write!(f, "address {addr} is not a live allocation")
            }
        }
    }
}

impl fmt::Display for InvalidFreeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::OutOfBounds => "header outside arena",
            Self::NotAllocated => "no allocated sentinel",
            Self::AlreadyFreed => "block already freed",
            Self::Misplaced => "header start offset mismatch",
            Self::BadSize => "header size out of range",
        };
        f.write_str(text)
    }
}

impl Error for HeapError {}

/// Errors detected by [`HeapConfig::validate`](crate::HeapConfig::validate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Capacity cannot hold a single header.
    CapacityTooSmall {
        /// The configured capacity.
        capacity: usize,
        /// Smallest accepted capacity.
        minimum: usize,
    },
    /// Capacity does not fit the 32-bit offsets stored in headers.
    CapacityTooLarge {
        /// The configured capacity.
        capacity: usize,
        /// Largest accepted capacity.
        maximum: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityTooSmall { capacity, minimum } => {
                write!(f, "capacity {capacity} below minimum {minimum}")
            }
            Self::CapacityTooLarge { capacity, maximum } => {
                write!(f, "capacity {capacity} above maximum {maximum}")
            }
        }
    }
}

impl Error for ConfigError {}
