//! Error types for the murmur protocol

use thiserror::Error;

/// Core murmur errors
#[derive(Error, Debug)]
pub enum MurmurError {
    // Wire errors
    #[error("invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("frame too large: {size} > {max}")]
    FrameTooLarge { size: usize, max: usize },

    // Lifecycle errors
    #[error("engine is not running")]
    NotRunning,

    #[error("engine was stopped and cannot be restarted")]
    AlreadyStopped,

    // Transport errors
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for murmur operations
pub type MurmurResult<T> = Result<T, MurmurError>;
