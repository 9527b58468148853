//! Heap configuration parameters.

use crate::error::ConfigError;
use crate::header::{HEADER_SIZE, NIL};

/// Configuration for a [`Heap`](crate::Heap).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Arena capacity in bytes.
    ///
    /// Default: 10_000. Must hold at least one header and stay below the
    /// null-link sentinel so every offset fits in a `u32`.
    pub capacity: usize,
}

impl HeapConfig {
    /// Default arena capacity in bytes.
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// Smallest accepted capacity: one bare header.
    pub const MIN_CAPACITY: usize = HEADER_SIZE;

    /// Largest accepted capacity.
    pub const MAX_CAPACITY: usize = NIL as usize - 1;

    /// Create a config for an arena of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Check the capacity bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < Self::MIN_CAPACITY {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
                minimum: Self::MIN_CAPACITY,
            });
        }
        if self.capacity > Self::MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                capacity: self.capacity,
                maximum: Self::MAX_CAPACITY,
            });
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_ten_thousand() {
        let config = HeapConfig::default();
        assert_eq!(config.capacity, 10_000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_capacity_below_one_header() {
        let err = HeapConfig::new(HEADER_SIZE - 1).validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::CapacityTooSmall {
                capacity: HEADER_SIZE - 1,
                minimum: HEADER_SIZE,
            }
        );
    }

    #[test]
    fn accepts_single_header_capacity() {
        assert_eq!(HeapConfig::new(HEADER_SIZE).validate(), Ok(()));
    }

    #[test]
    fn rejects_capacity_that_collides_with_nil() {
        let err = HeapConfig::new(NIL as usize).validate().unwrap_err();
        assert!(matches!(err, ConfigError::CapacityTooLarge { .. }));
    }
}
