//! Persisted model state.
//!
//! A checkpoint holds the whole DeepFM parameter tree together with the
//! feature schema its token vocabulary was built from, so a later run can
//! refuse records whose fields would land on different tokens.

use serde::{Deserialize, Serialize};
use shoulder_data::FeatureSchema;
use shoulder_layers::DeepFm;
use std::collections::BTreeMap;

use crate::{CheckpointError, Result};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Everything needed to resume training or serve predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    /// Layout version of this file.
    pub format_version: u32,

    /// Sorted feature fields the model was trained on.
    pub schema: FeatureSchema,

    /// Embedding table, FM `{w, V, bias}` and ordered MLP layers.
    pub model: DeepFm,

    /// Free-form annotations such as epoch counts or timestamps.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ModelState {
    /// Wraps a trained model and its schema at the current format version.
    pub fn new(schema: FeatureSchema, model: DeepFm) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            schema,
            model,
            metadata: BTreeMap::new(),
        }
    }

    /// Set a metadata value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Get a metadata value.
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Checks the version and that the model's token columns agree with the
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::VersionMismatch`] for another format version
    /// and [`CheckpointError::Corrupted`] when model and schema disagree.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: FORMAT_VERSION,
                found: self.format_version,
            });
        }
        let columns = self.schema.num_columns();
        if self.model.num_fields() != columns {
            return Err(CheckpointError::Corrupted(format!(
                "model expects {} token columns but schema has {}",
                self.model.num_fields(),
                columns
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use shoulder_layers::DeepFmConfig;

    pub(crate) fn sample_state() -> ModelState {
        let schema = FeatureSchema::new(vec!["music".into(), "outdoors".into()]);
        let model = DeepFmConfig::new(12, schema.num_columns(), 3)
            .with_hidden_sizes(vec![4])
            .build()
            .unwrap();
        ModelState::new(schema, model)
    }

    #[test]
    fn test_new_state_is_valid() {
        let mut state = sample_state();
        state.set_metadata("epochs", "10");
        assert_eq!(state.get_metadata("epochs"), Some("10"));
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_version_mismatch() {
        let mut state = sample_state();
        state.format_version = 99;
        assert!(matches!(
            state.validate(),
            Err(CheckpointError::VersionMismatch { expected: 1, found: 99 })
        ));
    }

    #[test]
    fn test_schema_model_disagreement() {
        let mut state = sample_state();
        state.schema = FeatureSchema::new(vec!["music".into()]);
        assert!(matches!(state.validate(), Err(CheckpointError::Corrupted(_))));
    }
}
