//! C-compatible status codes.
//!
//! [`FixheapStatus`] is a `repr(i32)` enum covering every failure an FFI
//! call can report, with conversions from [`HeapError`] and
//! [`ConfigError`].

use fixheap::{ConfigError, HeapError};

/// C-compatible status code returned by all FFI functions.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixheapStatus {
    /// Success.
    Ok = 0,
    /// Handle is invalid or was already destroyed.
    InvalidHandle = -1,
    /// The heap has not been initialised with `fixheap_init`.
    NotInitialized = -2,
    /// No free block can hold the request.
    OutOfMemory = -3,
    /// The address was not a live allocation; nothing was freed.
    InvalidFree = -4,
    /// The address does not name a live allocation.
    InvalidAddress = -5,
    /// Heap configuration rejected.
    ConfigError = -6,
    /// A pointer argument is null.
    InvalidArgument = -7,
    /// The requested byte range runs past the end of the allocation.
    BufferTooSmall = -8,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -9,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&HeapError> for FixheapStatus {
    fn from(e: &HeapError) -> Self {
        match e {
            HeapError::NotInitialized => FixheapStatus::NotInitialized,
            HeapError::OutOfMemory { .. } => FixheapStatus::OutOfMemory,
            HeapError::InvalidFree { .. } => FixheapStatus::InvalidFree,
            HeapError::InvalidAddress { .. } => FixheapStatus::InvalidAddress,
        }
    }
}

impl From<&ConfigError> for FixheapStatus {
    fn from(_e: &ConfigError) -> Self {
        FixheapStatus::ConfigError
    }
}
