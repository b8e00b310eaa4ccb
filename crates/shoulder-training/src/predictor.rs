//! Read-only inference over a trained model.

use shoulder_checkpoint::{checkpointer_for_path, Checkpointer, ModelState};
use shoulder_data::{encode, EncodeMode, FeatureSchema, RawRecord};
use shoulder_layers::{DeepFm, Tensor};
use std::path::Path;

use crate::error::{Result, TrainingError};

/// Serves attendance probabilities from a fixed parameter tree.
///
/// The predictor never mutates its model; it only runs the pure forward pass.
#[derive(Debug, Clone)]
pub struct Predictor {
    state: ModelState,
}

impl Predictor {
    pub fn new(state: ModelState) -> Self {
        Self { state }
    }

    /// Wraps parameters that may not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::ParametersNotFound`] for `None`.
    pub fn try_from_option(state: Option<ModelState>) -> Result<Self> {
        state.map(Self::new).ok_or(TrainingError::ParametersNotFound)
    }

    /// Loads parameters persisted by a training run.
    pub fn from_checkpoint(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let state = checkpointer_for_path(path).restore(path)?;
        Ok(Self::new(state))
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn model(&self) -> &DeepFm {
        &self.state.model
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.state.schema
    }

    /// Probabilities for an already encoded token matrix, one per row.
    pub fn predict(&self, tokens: &Tensor) -> Result<Vec<f32>> {
        Ok(self.state.model.predict(tokens)?.into_data())
    }

    /// Encodes unlabeled records against the trained schema and scores them
    /// in input order.
    ///
    /// # Errors
    ///
    /// Schema errors from encoding, [`shoulder_data::DataError::SchemaMismatch`]
    /// when the records' fields differ from the trained ones, and
    /// out-of-vocabulary errors for user ids the table never saw.
    pub fn predict_records(&self, records: &[RawRecord]) -> Result<Vec<f32>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let encoded = encode(records, EncodeMode::Inference)?;
        self.state.schema.ensure_matches(&encoded.schema)?;
        self.predict(&encoded.features)
    }
}
