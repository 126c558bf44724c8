//! Error types for sitecache

use std::fmt;

/// Result type alias for sitecache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Cache configured with a capacity below 1
    InvalidCapacity(usize),

    /// Empty string used as a cache key
    EmptyKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity(n) => {
                write!(f, "Invalid cache capacity: {} (must be at least 1)", n)
            }
            Error::EmptyKey => write!(f, "Cache keys must be non-empty"),
        }
    }
}

impl std::error::Error for Error {}
