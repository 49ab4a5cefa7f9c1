use thiserror::Error;

/// Result type for frame operations.
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors produced while framing or decoding scanner lines.
///
/// The `Display` text of the decode variants is the rejection reason stored
/// alongside invalid records, so it must stay stable.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("incorrect number of fields")]
    FieldCount { found: usize },

    #[error("counter is not a number")]
    InvalidCounter { value: String },

    #[error("line exceeds maximum length of {max} bytes")]
    LineTooLong { max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Whether this error rejects a single record rather than the stream.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::FieldCount { .. } | Self::InvalidCounter { .. })
    }
}
