//! Error types for the BIG container library.

use std::path::PathBuf;
use thiserror::Error;

use super::Axis;

/// Main error type for BIG container operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Bad magic, truncated chunk, or a length field past the end of the stream
    #[error("Corrupt BIG stream: {0}")]
    CorruptFormat(String),

    /// Scalar type identifier outside the type width table
    #[error("Unsupported data type id: {0}")]
    UnsupportedDataType(u64),

    /// Admitting the requested bytes would exceed the memory ceiling
    #[error("Memory budget exceeded: {requested} bytes requested, {resident} resident, limit {limit}")]
    CapacityExceeded {
        requested: usize,
        resident: usize,
        limit: usize,
    },

    /// Operation not allowed in the current container state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Dataset shape value rejected
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Data order is not a permutation of the five axes
    #[error("Invalid data order: {0}")]
    InvalidDataOrder(String),

    /// Type assignment length is neither 1 nor the number of images
    #[error("Invalid data type assignment: {types} types for {images} images")]
    InvalidTypeAssignment { types: usize, images: u64 },

    /// Loading is only defined with the image axis outermost
    #[error("Unsupported outermost axis for loading: {0}")]
    UnsupportedDataOrder(Axis),

    /// Image index out of bounds
    #[error("Image index {index} out of bounds (count: {count})")]
    ImageOutOfBounds { index: u64, count: u64 },

    /// Payload length differs from the size computed for it
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Type mismatch when reading typed data
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a corrupt-format error from a string.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptFormat(msg.into())
    }

    /// Create an invalid-state error from a string.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

/// Result type alias for BIG container operations.
pub type Result<T> = std::result::Result<T, Error>;
