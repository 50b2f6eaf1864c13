//! Error types for the compression crate

use pserv_core::ServerError;

/// Codec error types
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// Input was added to a compressor after it was closed
    #[error("compressor is closed")]
    Closed,

    /// A backreference points at or before the beginning of the output
    #[error("backreference offset beyond beginning of output (distance {distance:#X} at output offset {output_offset:#X})")]
    BackreferenceOutOfRange { distance: usize, output_offset: usize },

    /// The input ended partway through an opcode
    #[error("input truncated within opcode at offset {offset:#X}")]
    Truncated { offset: usize },

    /// Decoding would produce more than the caller allows
    #[error("maximum output size exceeded ({limit} bytes)")]
    OutputLimitExceeded { limit: usize },

    /// The match search produced something no opcode can express
    #[error("invalid best match: offset {offset}, size {size}")]
    InvalidMatch { offset: isize, size: usize },

    /// Data bytes were emitted with no control bits announcing them
    #[error("data written without control bits")]
    UncontrolledData,

    /// Sink or external codec I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CompressionError> for ServerError {
    fn from(err: CompressionError) -> Self {
        match err {
            CompressionError::Io(e) => ServerError::Io(e),
            other => ServerError::Compression(other.to_string()),
        }
    }
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CompressionError>;
