//! The allocator context: arena, free list and lifecycle state.

use tracing::debug;

use crate::arena::Arena;
use crate::config::HeapConfig;
use crate::error::{ConfigError, HeapError};
use crate::free_list::FreeList;
use crate::guard;
use crate::header::{Header, HEADER_SIZE};

/// A first-fit free-list heap over one fixed-size arena.
///
/// Each `Heap` is fully independent; there is no process-wide state. The
/// heap is created uninitialised and must be brought up with
/// [`init`](Heap::init) before [`allocate`](Heap::allocate) or
/// [`free`](Heap::free) succeed.
///
/// Addresses handed out by the heap are byte offsets into the arena,
/// pointing just past the block header.
pub struct Heap {
    pub(crate) config: HeapConfig,
    pub(crate) arena: Arena,
    pub(crate) free_list: FreeList,
    pub(crate) initialized: bool,
}

impl Heap {
    /// Create an uninitialised heap from a validated config.
    pub fn new(config: HeapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            arena: Arena::new(config.capacity),
            config,
            free_list: FreeList::empty(),
            initialized: false,
        })
    }

    /// Create and initialise a heap of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        let mut heap = Self::new(HeapConfig::new(capacity))?;
        heap.init();
        Ok(heap)
    }

    /// (Re)initialise the heap.
    ///
    /// Zeroes the arena, stamps a single free block spanning the whole
    /// capacity at offset 0 and makes it the free-list head. Every address
    /// handed out before this call becomes invalid.
    pub fn init(&mut self) {
        self.arena.reset();
        // Capacity is bounded by HeapConfig::MAX_CAPACITY, so it fits in u32.
        let capacity = self.config.capacity as u32;
        self.arena.write_header(0, &Header::free(capacity, 0));
        self.free_list = FreeList::single(0);
        self.initialized = true;
        debug!(capacity, "heap initialized");
    }

    /// Whether [`init`](Heap::init) has been called.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The config this heap was built from.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Arena capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// The usable bytes of the live allocation at `addr`.
    ///
    /// The slice covers the whole block after the header, which may be
    /// longer than requested when a small leftover was folded in.
    pub fn payload(&self, addr: usize) -> Result<&[u8], HeapError> {
        let header = self.live_header(addr)?;
        Ok(self
            .arena
            .slice(addr, header.size as usize - HEADER_SIZE))
    }

    /// Mutable view of the live allocation at `addr`.
    pub fn payload_mut(&mut self, addr: usize) -> Result<&mut [u8], HeapError> {
        let header = self.live_header(addr)?;
        Ok(self
            .arena
            .slice_mut(addr, header.size as usize - HEADER_SIZE))
    }

    pub(crate) fn ensure_initialized(&self) -> Result<(), HeapError> {
        if self.initialized {
            Ok(())
        } else {
            Err(HeapError::NotInitialized)
        }
    }

    fn live_header(&self, addr: usize) -> Result<Header, HeapError> {
        self.ensure_initialized()?;
        guard::check_allocated(&self.arena, addr).map_err(|_| HeapError::InvalidAddress { addr })
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("capacity", &self.arena.capacity())
            .field("initialized", &self.initialized)
            .field("free_list_head", &self.free_list.head())
            .finish()
    }
}
