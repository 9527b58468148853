//! C FFI bindings for the fixheap allocator.
//!
//! Heaps live in a process-wide handle table and are addressed from C by
//! opaque `u64` handles. Every entry point returns a [`FixheapStatus`]
//! code as `i32` and never unwinds across the boundary. This is the only
//! fixheap crate that contains `unsafe` code.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run an FFI body, converting a caught panic into `Panicked`.
macro_rules! ffi_guard {
    ($body:block) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> i32 { $body })) {
            Ok(code) => code,
            Err(_) => $crate::status::FixheapStatus::Panicked as i32,
        }
    };
}

/// Lock a mutex inside `ffi_guard!`, returning `InternalError` if poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::FixheapStatus::InternalError as i32,
        }
    };
}

mod handle;
pub mod heap;
pub mod logging;
pub mod status;

pub use heap::{
    fixheap_calloc, fixheap_create, fixheap_destroy, fixheap_free, fixheap_init,
    fixheap_malloc, fixheap_read, fixheap_stats, fixheap_write, FixheapStats,
};
pub use logging::fixheap_log_init;
pub use status::FixheapStatus;
