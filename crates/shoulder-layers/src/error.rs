//! Error types for the shoulder-layers crate.
//!
//! This module defines error types for layer operations, including shape
//! mismatches, configuration errors, and out-of-vocabulary embedding lookups.

use thiserror::Error;

/// Error type for layer operations.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Shape mismatch between expected and actual tensor shapes.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected shape
        expected: Vec<usize>,
        /// The actual shape that was provided
        actual: Vec<usize>,
    },

    /// Invalid input dimension for the layer.
    #[error("Invalid input dimension: expected {expected}, got {actual}")]
    InvalidInputDimension {
        /// The expected input dimension
        expected: usize,
        /// The actual input dimension
        actual: usize,
    },

    /// Invalid output dimension for the layer.
    #[error("Invalid output dimension: expected {expected}, got {actual}")]
    InvalidOutputDimension {
        /// The expected output dimension
        expected: usize,
        /// The actual output dimension
        actual: usize,
    },

    /// Error during forward pass computation.
    #[error("Forward pass error: {message}")]
    ForwardError {
        /// Description of the forward pass error
        message: String,
    },

    /// Layer has not been run in training mode before backward.
    #[error("Layer not initialized: forward_train must be called before backward")]
    NotInitialized,

    /// Configuration error for the layer.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// A token does not index a row of the embedding table.
    #[error("Out of vocabulary: token {token} does not fit an embedding table of {vocab_rows} rows")]
    OutOfVocabulary {
        /// The offending token value
        token: f32,
        /// Number of rows in the embedding table
        vocab_rows: usize,
    },
}

/// Result type alias for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LayerError::ShapeMismatch {
            expected: vec![32, 64],
            actual: vec![32, 128],
        };
        assert!(err.to_string().contains("Shape mismatch"));

        let err = LayerError::OutOfVocabulary {
            token: 12.0,
            vocab_rows: 11,
        };
        assert!(err.to_string().contains("Out of vocabulary"));
        assert!(err.to_string().contains("11 rows"));

        let err = LayerError::NotInitialized;
        assert!(err.to_string().contains("not initialized"));
    }
}
