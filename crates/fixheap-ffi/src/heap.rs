//! Heap lifecycle and allocation FFI: create, init, malloc, calloc, free,
//! payload read/write, stats, destroy.
//!
//! Each heap sits behind its own `Arc<Mutex<Heap>>`, so the global `HEAPS`
//! table lock is only held for handle lookup and distinct heaps can be used
//! from different threads at once.

use std::sync::{Arc, Mutex};

use fixheap::{Heap, HeapConfig, HeapStats};

use crate::handle::HandleTable;
use crate::status::FixheapStatus;

type HeapArc = Arc<Mutex<Heap>>;

static HEAPS: Mutex<HandleTable<HeapArc>> = Mutex::new(HandleTable::new());

/// Heap statistics in C layout. Byte counts include block headers.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixheapStats {
    /// Arena capacity in bytes.
    pub capacity: usize,
    /// Bytes held by free blocks.
    pub free_bytes: usize,
    /// Number of free-list entries.
    pub fragment_count: usize,
    /// Size of the largest free block.
    pub largest_fragment: usize,
    /// Number of live allocations.
    pub allocated_blocks: usize,
    /// Bytes held by live allocations.
    pub allocated_bytes: usize,
}

impl From<HeapStats> for FixheapStats {
    fn from(stats: HeapStats) -> Self {
        Self {
            capacity: stats.capacity,
            free_bytes: stats.free_bytes,
            fragment_count: stats.fragment_count,
            largest_fragment: stats.largest_fragment,
            allocated_blocks: stats.allocated_blocks,
            allocated_bytes: stats.allocated_bytes,
        }
    }
}

/// Clone the Arc for a heap handle, briefly locking the global table.
///
/// Returns `None` if the handle is invalid or the mutex is poisoned.
fn get_heap(handle: u64) -> Option<HeapArc> {
    HEAPS.lock().ok()?.get(handle).cloned()
}

/// Create an uninitialised heap with an arena of `capacity` bytes.
///
/// On success, writes the heap handle to `heap_out`. Call
/// [`fixheap_init`] before allocating.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_create(capacity: usize, heap_out: *mut u64) -> i32 {
    ffi_guard!({
        if heap_out.is_null() {
            return FixheapStatus::InvalidArgument as i32;
        }
        let heap = match Heap::new(HeapConfig::new(capacity)) {
            Ok(heap) => heap,
            Err(e) => return FixheapStatus::from(&e) as i32,
        };
        let handle = ffi_lock!(HEAPS).insert(Arc::new(Mutex::new(heap)));
        // SAFETY: heap_out is non-null and valid per caller contract.
        unsafe { *heap_out = handle };
        FixheapStatus::Ok as i32
    })
}

/// Destroy a heap, releasing its arena. Outstanding addresses become
/// meaningless.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_destroy(heap_handle: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(HEAPS).remove(heap_handle) {
            Some(_) => FixheapStatus::Ok as i32,
            None => FixheapStatus::InvalidHandle as i32,
        }
    })
}

/// (Re)initialise a heap: one free block spanning the whole arena.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_init(heap_handle: u64) -> i32 {
    ffi_guard!({
        let Some(arc) = get_heap(heap_handle) else {
            return FixheapStatus::InvalidHandle as i32;
        };
        ffi_lock!(arc).init();
        FixheapStatus::Ok as i32
    })
}

/// Allocate `size` bytes; the payload address is written to `addr_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_malloc(heap_handle: u64, size: usize, addr_out: *mut usize) -> i32 {
    ffi_guard!({
        if addr_out.is_null() {
            return FixheapStatus::InvalidArgument as i32;
        }
        let Some(arc) = get_heap(heap_handle) else {
            return FixheapStatus::InvalidHandle as i32;
        };
        let result = ffi_lock!(arc).allocate(size);
        match result {
            Ok(addr) => {
                // SAFETY: addr_out is non-null and valid per caller contract.
                unsafe { *addr_out = addr };
                FixheapStatus::Ok as i32
            }
            Err(e) => FixheapStatus::from(&e) as i32,
        }
    })
}

/// Allocate `count * size` bytes. The memory is not zeroed.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_calloc(
    heap_handle: u64,
    count: usize,
    size: usize,
    addr_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if addr_out.is_null() {
            return FixheapStatus::InvalidArgument as i32;
        }
        let Some(arc) = get_heap(heap_handle) else {
            return FixheapStatus::InvalidHandle as i32;
        };
        let result = ffi_lock!(arc).calloc(count, size);
        match result {
            Ok(addr) => {
                // SAFETY: addr_out is non-null and valid per caller contract.
                unsafe { *addr_out = addr };
                FixheapStatus::Ok as i32
            }
            Err(e) => FixheapStatus::from(&e) as i32,
        }
    })
}

/// Release the allocation at `addr`. Invalid or repeated frees return
/// `InvalidFree` and leave the heap untouched.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_free(heap_handle: u64, addr: usize) -> i32 {
    ffi_guard!({
        let Some(arc) = get_heap(heap_handle) else {
            return FixheapStatus::InvalidHandle as i32;
        };
        let result = ffi_lock!(arc).free(addr);
        match result {
            Ok(()) => FixheapStatus::Ok as i32,
            Err(e) => FixheapStatus::from(&e) as i32,
        }
    })
}

/// Copy `len` bytes from `src` into the allocation at `addr`, starting
/// `offset` bytes into its payload.
///
/// `src` may be null only when `len == 0`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_write(
    heap_handle: u64,
    addr: usize,
    offset: usize,
    src: *const u8,
    len: usize,
) -> i32 {
    ffi_guard!({
        if src.is_null() && len > 0 {
            return FixheapStatus::InvalidArgument as i32;
        }
        let Some(arc) = get_heap(heap_handle) else {
            return FixheapStatus::InvalidHandle as i32;
        };
        let mut heap = ffi_lock!(arc);
        let payload = match heap.payload_mut(addr) {
            Ok(payload) => payload,
            Err(e) => return FixheapStatus::from(&e) as i32,
        };
        let end = match offset.checked_add(len) {
            Some(end) if end <= payload.len() => end,
            _ => return FixheapStatus::BufferTooSmall as i32,
        };
        if len > 0 {
            // SAFETY: src is non-null and points to `len` readable bytes
            // per caller contract.
            let src = unsafe { std::slice::from_raw_parts(src, len) };
            payload[offset..end].copy_from_slice(src);
        }
        FixheapStatus::Ok as i32
    })
}

/// Copy `len` bytes out of the allocation at `addr`, starting `offset`
/// bytes into its payload, into `dst`.
///
/// `dst` may be null only when `len == 0`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_read(
    heap_handle: u64,
    addr: usize,
    offset: usize,
    dst: *mut u8,
    len: usize,
) -> i32 {
    ffi_guard!({
        if dst.is_null() && len > 0 {
            return FixheapStatus::InvalidArgument as i32;
        }
        let Some(arc) = get_heap(heap_handle) else {
            return FixheapStatus::InvalidHandle as i32;
        };
        let heap = ffi_lock!(arc);
        let payload = match heap.payload(addr) {
            Ok(payload) => payload,
            Err(e) => return FixheapStatus::from(&e) as i32,
        };
        let end = match offset.checked_add(len) {
            Some(end) if end <= payload.len() => end,
            _ => return FixheapStatus::BufferTooSmall as i32,
        };
        if len > 0 {
            // SAFETY: dst is non-null and points to `len` writable bytes
            // per caller contract.
            let dst = unsafe { std::slice::from_raw_parts_mut(dst, len) };
            dst.copy_from_slice(&payload[offset..end]);
        }
        FixheapStatus::Ok as i32
    })
}

/// Write current heap statistics to `stats_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_stats(heap_handle: u64, stats_out: *mut FixheapStats) -> i32 {
    ffi_guard!({
        if stats_out.is_null() {
            return FixheapStatus::InvalidArgument as i32;
        }
        let Some(arc) = get_heap(heap_handle) else {
            return FixheapStatus::InvalidHandle as i32;
        };
        let stats = ffi_lock!(arc).stats();
        // SAFETY: stats_out is non-null and valid per caller contract.
        unsafe { *stats_out = FixheapStats::from(stats) };
        FixheapStatus::Ok as i32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixheap::HEADER_SIZE;

    const OK: i32 = FixheapStatus::Ok as i32;

    /// Helper: create and initialise a heap, returning its handle.
    fn create_ready(capacity: usize) -> u64 {
        let mut h = 0u64;
        assert_eq!(fixheap_create(capacity, &mut h), OK);
        assert_eq!(fixheap_init(h), OK);
        h
    }

    fn stats(h: u64) -> FixheapStats {
        let mut out = FixheapStats::default();
        assert_eq!(fixheap_stats(h, &mut out), OK);
        out
    }

    #[test]
    fn malloc_write_read_free_round_trip() {
        let h = create_ready(1000);
        let mut addr = 0usize;
        assert_eq!(fixheap_malloc(h, 16, &mut addr), OK);
        assert_eq!(addr, HEADER_SIZE);

        let data = *b"fixed-size arena";
        assert_eq!(fixheap_write(h, addr, 0, data.as_ptr(), data.len()), OK);
        let mut back = [0u8; 16];
        assert_eq!(fixheap_read(h, addr, 0, back.as_mut_ptr(), back.len()), OK);
        assert_eq!(back, data);

        assert_eq!(fixheap_free(h, addr), OK);
        let s = stats(h);
        assert_eq!(s.fragment_count, 1);
        assert_eq!(s.free_bytes, 1000);
        assert_eq!(s.allocated_blocks, 0);
        assert_eq!(fixheap_destroy(h), OK);
    }

    #[test]
    fn uninitialised_heap_reports_not_initialized() {
        let mut h = 0u64;
        assert_eq!(fixheap_create(1000, &mut h), OK);
        let mut addr = 0usize;
        assert_eq!(
            fixheap_malloc(h, 8, &mut addr),
            FixheapStatus::NotInitialized as i32
        );
        assert_eq!(fixheap_free(h, 24), FixheapStatus::NotInitialized as i32);
        fixheap_destroy(h);
    }

    #[test]
    fn bad_capacity_is_config_error() {
        let mut h = 0u64;
        assert_eq!(fixheap_create(4, &mut h), FixheapStatus::ConfigError as i32);
    }

    #[test]
    fn null_out_pointers_are_invalid_argument() {
        let h = create_ready(1000);
        let invalid = FixheapStatus::InvalidArgument as i32;
        assert_eq!(fixheap_create(1000, std::ptr::null_mut()), invalid);
        assert_eq!(fixheap_malloc(h, 8, std::ptr::null_mut()), invalid);
        assert_eq!(fixheap_calloc(h, 2, 4, std::ptr::null_mut()), invalid);
        assert_eq!(fixheap_stats(h, std::ptr::null_mut()), invalid);
        assert_eq!(fixheap_write(h, 24, 0, std::ptr::null(), 4), invalid);
        assert_eq!(fixheap_read(h, 24, 0, std::ptr::null_mut(), 4), invalid);
        fixheap_destroy(h);
    }

    #[test]
    fn destroyed_handle_is_invalid() {
        let h = create_ready(1000);
        assert_eq!(fixheap_destroy(h), OK);
        let invalid = FixheapStatus::InvalidHandle as i32;
        assert_eq!(fixheap_destroy(h), invalid);
        assert_eq!(fixheap_init(h), invalid);
        assert_eq!(fixheap_free(h, 24), invalid);
        let mut addr = 0usize;
        assert_eq!(fixheap_malloc(h, 8, &mut addr), invalid);
    }

    #[test]
    fn double_free_is_invalid_free() {
        let h = create_ready(1000);
        let mut a = 0usize;
        let mut b = 0usize;
        assert_eq!(fixheap_malloc(h, 100, &mut a), OK);
        assert_eq!(fixheap_malloc(h, 100, &mut b), OK);
        assert_eq!(fixheap_free(h, a), OK);
        let before = stats(h);
        assert_eq!(fixheap_free(h, a), FixheapStatus::InvalidFree as i32);
        assert_eq!(stats(h), before);
        fixheap_destroy(h);
    }

    #[test]
    fn oversized_request_is_out_of_memory() {
        let h = create_ready(1000);
        let mut addr = 0usize;
        assert_eq!(
            fixheap_malloc(h, 1000, &mut addr),
            FixheapStatus::OutOfMemory as i32
        );
        assert_eq!(
            fixheap_calloc(h, usize::MAX, 2, &mut addr),
            FixheapStatus::OutOfMemory as i32
        );
        fixheap_destroy(h);
    }

    #[test]
    fn payload_access_is_bounds_checked() {
        let h = create_ready(1000);
        let mut addr = 0usize;
        assert_eq!(fixheap_calloc(h, 4, 4, &mut addr), OK);
        let data = [1u8; 8];
        assert_eq!(fixheap_write(h, addr, 8, data.as_ptr(), 8), OK);
        assert_eq!(
            fixheap_write(h, addr, 9, data.as_ptr(), 8),
            FixheapStatus::BufferTooSmall as i32
        );
        let mut out = [0u8; 4];
        assert_eq!(
            fixheap_read(h, addr, usize::MAX, out.as_mut_ptr(), 4),
            FixheapStatus::BufferTooSmall as i32
        );
        assert_eq!(
            fixheap_read(h, addr + 1, 0, out.as_mut_ptr(), 4),
            FixheapStatus::InvalidAddress as i32
        );
        assert_eq!(fixheap_write(h, addr, 0, std::ptr::null(), 0), OK);
        fixheap_destroy(h);
    }

    #[test]
    fn reinit_discards_allocations() {
        let h = create_ready(500);
        let mut addr = 0usize;
        assert_eq!(fixheap_malloc(h, 100, &mut addr), OK);
        assert_eq!(fixheap_init(h), OK);
        let s = stats(h);
        assert_eq!(s.free_bytes, 500);
        assert_eq!(s.allocated_blocks, 0);
        fixheap_destroy(h);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn stats_track_live_allocations(
                sizes in proptest::collection::vec(0usize..128, 1..32),
                free_mask in proptest::collection::vec(any::<bool>(), 32),
            ) {
                let h = create_ready(8192);
                let mut live = Vec::new();
                for size in sizes {
                    let mut addr = 0usize;
                    prop_assert_eq!(fixheap_malloc(h, size, &mut addr), OK);
                    live.push(addr);
                }
                let mut kept = 0usize;
                for (addr, free) in live.iter().zip(&free_mask) {
                    if *free {
                        prop_assert_eq!(fixheap_free(h, *addr), OK);
                    } else {
                        kept += 1;
                    }
                }
                let s = stats(h);
                prop_assert_eq!(s.allocated_blocks, kept);
                prop_assert_eq!(s.free_bytes + s.allocated_bytes, 8192);
                prop_assert_eq!(fixheap_destroy(h), OK);
            }
        }
    }
}
