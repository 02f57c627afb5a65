//! Error types for StripeIO
//!
//! This module defines the common error types used throughout the system.

use thiserror::Error;

/// Common result type for StripeIO operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for StripeIO
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Erasure coding errors
    #[error("insufficient parts for reconstruction: have {available}, need {required}")]
    InsufficientParts { available: usize, required: usize },

    #[error("erasure coding error: {0}")]
    ErasureCoding(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientParts {
            available: 7,
            required: 8,
        };
        assert_eq!(
            err.to_string(),
            "insufficient parts for reconstruction: have 7, need 8"
        );

        let err = Error::invalid_argument("bad size");
        assert_eq!(err.to_string(), "invalid argument: bad size");

        let err = Error::ErasureCoding("singular bit matrix".into());
        assert_eq!(err.to_string(), "erasure coding error: singular bit matrix");
    }

    #[test]
    fn test_error_helpers() {
        assert!(matches!(
            Error::invalid_argument("x"),
            Error::InvalidArgument(_)
        ));
    }
}
