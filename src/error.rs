//! Error types for the cache library
//!
//! Misses are reported through `Option`, never through this type. The only
//! failures are configuration mistakes caught at construction time.

use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Capacity must hold at least one entry
    #[error("Invalid capacity: {0} (a cache must hold at least one entry)")]
    InvalidCapacity(usize),

    /// Expiration must be a non-zero duration
    #[error("Invalid expiration: {0:?} (must be greater than zero)")]
    InvalidExpiration(Duration),

    /// TTL policy was configured without an expiration
    #[error("Missing expiration: the TTL policy requires an expiration duration")]
    MissingExpiration,
}

// == Result Type Alias ==
/// Convenience Result type for the cache library.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Rejects a zero capacity.
pub(crate) fn check_capacity(capacity: usize) -> Result<usize> {
    if capacity == 0 {
        return Err(CacheError::InvalidCapacity(capacity));
    }
    Ok(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_capacity() {
        assert_eq!(check_capacity(1), Ok(1));
        assert_eq!(check_capacity(0), Err(CacheError::InvalidCapacity(0)));
    }

    #[test]
    fn test_error_messages() {
        let err = CacheError::InvalidCapacity(0);
        assert!(err.to_string().contains("Invalid capacity: 0"));

        let err = CacheError::InvalidExpiration(Duration::ZERO);
        assert!(err.to_string().starts_with("Invalid expiration"));

        assert!(CacheError::MissingExpiration
            .to_string()
            .contains("requires an expiration"));
    }
}
