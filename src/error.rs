//! Error types for the Slidegate service.

use thiserror::Error;

/// Main error type for Slidegate operations.
#[derive(Error, Debug)]
pub enum SlidegateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an unusable scope, identity or increment
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A stored bucket holds something other than a non-negative integer
    #[error("Corrupt counter at {key}: {value:?}")]
    CorruptCounter { key: String, value: String },

    /// Redis command or connection errors
    #[error("Store error: {0}")]
    Store(#[from] ::redis::RedisError),

    /// Failures from non-Redis counter stores
    #[error("Store backend error: {0}")]
    Backend(String),

    /// gRPC server errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for SlidegateError {
    fn from(err: ::config::ConfigError) -> Self {
        SlidegateError::Config(err.to_string())
    }
}

/// Result type alias for Slidegate operations.
pub type Result<T> = std::result::Result<T, SlidegateError>;
