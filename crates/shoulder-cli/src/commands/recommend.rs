//! Recommend Command Implementation

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use shoulder_training::{recommend, sanitize_probabilities, top_k, Predictor};
use std::path::PathBuf;
use tracing::info;

use super::{print_json, read_records};

/// Score unlabeled records with persisted weights
///
/// Prints one probability per record, in input order.
#[derive(Args, Debug, Clone)]
pub struct RecommendCommand {
    /// JSON array of unlabeled records
    #[arg(long, short = 'r')]
    pub records: PathBuf,

    /// Trained weights
    #[arg(long, short = 'w', env = super::WEIGHTS_PATH_ENV)]
    pub weights: PathBuf,

    /// Also print the indices of the best `k` records
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Replace NaN or infinite probabilities with this value
    #[arg(long)]
    pub neutral: Option<f32>,
}

impl RecommendCommand {
    /// Scores the records and returns the output document.
    pub fn execute(&self) -> Result<serde_json::Value> {
        let predictor = Predictor::from_checkpoint(&self.weights)
            .with_context(|| format!("Model not available at {}", self.weights.display()))?;
        let records = read_records(&self.records)?;
        info!(records = records.len(), "Scoring");

        let mut probabilities = recommend(&records, &predictor).context("Scoring failed")?;
        if let Some(neutral) = self.neutral {
            probabilities = sanitize_probabilities(&probabilities, neutral);
        }

        let mut output = json!({ "probabilities": probabilities });
        if let Some(k) = self.top_k {
            output["top_k"] = json!(top_k(&probabilities, k));
        }
        Ok(output)
    }

    /// Execute the recommend command
    pub fn run(&self) -> Result<()> {
        print_json(&self.execute()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_weights_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = RecommendCommand {
            records: dir.path().join("records.json"),
            weights: dir.path().join("weights.json"),
            top_k: None,
            neutral: None,
        };
        let err = cmd.execute().unwrap_err();
        assert!(err.to_string().contains("Model not available"));
    }
}
