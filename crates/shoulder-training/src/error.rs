//! Error type returned by the training and recommendation entry points.
//!
//! Every failure is surfaced once, typed, and can be bucketed with
//! [`TrainingError::category`] into the schema / vocabulary / storage /
//! numeric / configuration taxonomy callers branch on.

use shoulder_checkpoint::CheckpointError;
use shoulder_data::DataError;
use shoulder_layers::LayerError;
use shoulder_optimizer::OptimizerError;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`TrainingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing, inconsistent or mistyped record fields.
    Schema,
    /// A token outside the embedding table.
    Vocabulary,
    /// Weights missing or not persistable.
    Storage,
    /// NaN or infinite loss or probabilities.
    Numeric,
    /// Invalid hyperparameters or an empty dataset.
    Configuration,
}

/// Errors from training, finetuning and recommendation.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Record encoding or batching failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A layer rejected its input.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Optimizer configuration is invalid.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Loading or saving weights failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The batch source produced no batches.
    #[error("Empty dataset: no batches to train on")]
    EmptyDataset,

    /// Inference was requested without any trained parameters.
    #[error("Parameters not found: train or load a model before predicting")]
    ParametersNotFound,

    /// An epoch finished with a NaN or infinite mean loss.
    #[error("Non-finite loss {loss} at epoch {epoch}")]
    NonFiniteLoss { epoch: usize, loss: f32 },

    /// A prediction is NaN or infinite.
    #[error("Non-finite probability {value} at row {row}")]
    NonFiniteProbability { row: usize, value: f32 },

    /// Hyperparameters are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be read or parsed.
    #[error("Failed to load config {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },
}

impl TrainingError {
    /// Returns the taxonomy bucket of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TrainingError::Data(err) => match err {
                DataError::MissingField { .. }
                | DataError::InconsistentSchema { .. }
                | DataError::InvalidFieldValue { .. }
                | DataError::SchemaMismatch { .. }
                | DataError::Json(_) => ErrorCategory::Schema,
                DataError::InvalidBatchConfig(_) | DataError::MissingLabels => {
                    ErrorCategory::Configuration
                }
            },
            TrainingError::Layer(LayerError::OutOfVocabulary { .. }) => ErrorCategory::Vocabulary,
            TrainingError::Layer(_) => ErrorCategory::Configuration,
            TrainingError::Optimizer(_) => ErrorCategory::Configuration,
            TrainingError::Checkpoint(_) | TrainingError::ParametersNotFound => {
                ErrorCategory::Storage
            }
            TrainingError::NonFiniteLoss { .. } | TrainingError::NonFiniteProbability { .. } => {
                ErrorCategory::Numeric
            }
            TrainingError::EmptyDataset
            | TrainingError::InvalidConfig(_)
            | TrainingError::ConfigFile { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Result type alias for training operations.
pub type Result<T> = std::result::Result<T, TrainingError>;
