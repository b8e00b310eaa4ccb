//! Error types for record encoding and batching.

use thiserror::Error;

/// Errors raised while turning raw records into model input.
#[derive(Debug, Error)]
pub enum DataError {
    /// A required key is absent from a record.
    #[error("Record {record} is missing required field '{field}'")]
    MissingField {
        /// Index of the record in the input list
        record: usize,
        /// Name of the missing field
        field: String,
    },

    /// Records in one call do not share the same feature fields.
    #[error("Record {record} has fields {actual:?}, expected {expected:?} like the first record")]
    InconsistentSchema {
        record: usize,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// A field holds a value the encoder cannot interpret.
    #[error("Record {record} has invalid value {value} for field '{field}'")]
    InvalidFieldValue {
        record: usize,
        field: String,
        value: String,
    },

    /// Records do not match the schema a model was trained on.
    #[error("Feature fields {actual:?} do not match the trained schema {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Invalid batching configuration.
    #[error("Invalid batch configuration: {0}")]
    InvalidBatchConfig(String),

    /// Training data arrived without labels.
    #[error("Dataset has no labels")]
    MissingLabels,

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for data operations.
pub type Result<T> = std::result::Result<T, DataError>;
