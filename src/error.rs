//! Error types for the extraction pipeline
//!
//! Only an unreadable input is an error. Missing graph regions, missing
//! markers and out-of-range thresholds are degraded results, not failures.

use thiserror::Error;

/// Errors returned by the extraction pipeline
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The input bytes are not a readable raster image
    #[error("unreadable image: {0}")]
    Decode(#[from] image::ImageError),

    /// The input was empty
    #[error("unreadable image: input is empty")]
    EmptyInput,

    /// The input file could not be read
    #[error("failed to read image file: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// True for the "unreadable image" class (bad or empty bytes)
    pub fn is_decode_error(&self) -> bool {
        matches!(self, ExtractionError::Decode(_) | ExtractionError::EmptyInput)
    }
}

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, ExtractionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_decode_error() {
        let err = ExtractionError::EmptyInput;
        assert!(err.is_decode_error());
        assert!(err.to_string().contains("unreadable image"));
    }

    #[test]
    fn test_io_error_is_not_decode_error() {
        let err = ExtractionError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert!(!err.is_decode_error());
    }
}
