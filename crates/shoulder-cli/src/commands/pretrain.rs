//! Pretrain Command Implementation

use anyhow::{Context, Result};
use clap::Args;
use shoulder_training::{pretrain, TrainingConfig};
use std::path::PathBuf;
use tracing::info;

use super::{load_config, print_json, read_records};

/// Train a model from scratch on labeled records
///
/// # Example
///
/// ```bash
/// shoulder pretrain \
///     --records labeled.json \
///     --weights weights/parameters.json \
///     --epochs 20
/// ```
#[derive(Args, Debug, Clone)]
pub struct PretrainCommand {
    /// JSON array of labeled records
    #[arg(long, short = 'r')]
    pub records: PathBuf,

    /// Where the trained weights are written (`.bin` selects the binary format)
    #[arg(long, short = 'w', env = super::WEIGHTS_PATH_ENV)]
    pub weights: PathBuf,

    /// Training configuration file (JSON); missing keys use pretraining defaults
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Override the number of epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Override the batch size
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl PretrainCommand {
    /// Effective configuration: file (or defaults), then flag overrides.
    pub fn config(&self) -> Result<TrainingConfig> {
        let mut config = load_config(self.config.as_deref(), TrainingConfig::pretrain())?;
        if let Some(epochs) = self.epochs {
            config.num_epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        Ok(config)
    }

    /// Trains and returns the report as JSON.
    pub fn execute(&self) -> Result<serde_json::Value> {
        let config = self.config()?;
        let records = read_records(&self.records)?;
        info!(records = records.len(), weights = %self.weights.display(), "Pretraining");

        let report = pretrain(&records, &config, &self.weights).context("Pretraining failed")?;
        Ok(serde_json::to_value(&report)?)
    }

    /// Execute the pretrain command
    pub fn run(&self) -> Result<()> {
        print_json(&self.execute()?)
    }
}
