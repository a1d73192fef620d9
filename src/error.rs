//! Error types for table preparation.
//!
//! Every transformation in this crate either completes or fails synchronously
//! with a [`PrepError`]. Nothing is retried internally.
//!
//! Non-finite cells met while reshaping are *not* errors: they are replaced
//! with zero and surfaced as a count on the reshape output.

use thiserror::Error;

/// Errors produced while windowing, splitting, labeling or reshaping tables.
#[derive(Debug, Error)]
pub enum PrepError {
    /// An argument is outside its valid range or names something absent.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of what's wrong with the argument
        message: String,
    },

    /// Two structures that must line up do not.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Where the mismatch was detected
        context: String,
        /// Expected extent
        expected: usize,
        /// Actual extent
        actual: usize,
    },

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse or write failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// NumPy export failure.
    #[error("NumPy write error: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),

    /// Array construction failure (shape does not match element count).
    #[error("Array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Config or metadata (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Parallel batch failure (thread pool setup or a fail-fast source error).
    #[error("Batch error: {0}")]
    Batch(String),
}

impl PrepError {
    /// Create an `InvalidArgument` error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a `ShapeMismatch` error.
    pub fn shape_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// True for precondition failures the caller can fix by changing arguments.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for PrepError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PrepError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PrepError::invalid("fraction must lie in (0, 1)");
        assert!(err.is_invalid_argument());
        assert_eq!(
            err.to_string(),
            "Invalid argument: fraction must lie in (0, 1)"
        );

        let err = PrepError::shape_mismatch("discretize rows", 10, 9);
        assert!(!err.is_invalid_argument());
        assert_eq!(
            err.to_string(),
            "Shape mismatch in discretize rows: expected 10, got 9"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: PrepError = io.into();
        assert!(matches!(err, PrepError::Io(_)));
    }
}
