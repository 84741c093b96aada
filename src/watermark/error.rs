//! Watermark error types.
//!
//! Defines errors that can occur during watermark processing.

use std::fmt;

/// Errors that can occur during watermark processing.
#[derive(Debug)]
pub enum WatermarkError {
    /// Failed to decode the base image or watermark asset
    Decode(String),

    /// Failed to encode the composited result
    Encode(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "Failed to decode image: {}", msg),
            Self::Encode(msg) => write!(f, "Failed to encode image: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatermarkError::Decode("invalid PNG".to_string());
        assert_eq!(err.to_string(), "Failed to decode image: invalid PNG");

        let err = WatermarkError::Encode("buffer too small".to_string());
        assert_eq!(err.to_string(), "Failed to encode image: buffer too small");
    }

    #[test]
    fn test_error_debug() {
        let err = WatermarkError::Decode("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Decode"));
        assert!(debug_str.contains("test"));
    }
}
