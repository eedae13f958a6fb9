//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Cache misses and
//! expirations are never errors; only persistence and configuration fail.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Opening, reading or writing the underlying stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record in the stream could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A value could not be encoded by the record codec
    #[error("Encode error: {0}")]
    Encode(String),

    /// Configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
