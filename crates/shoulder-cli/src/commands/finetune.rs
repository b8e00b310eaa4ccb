//! Finetune Command Implementation

use anyhow::{Context, Result};
use clap::Args;
use shoulder_training::{finetune, ModelPaths, TrainingConfig};
use std::path::PathBuf;
use tracing::info;

use super::{load_config, print_json, read_records};

/// Continue training persisted weights on new labeled records
#[derive(Args, Debug, Clone)]
pub struct FinetuneCommand {
    /// JSON array of labeled records
    #[arg(long, short = 'r')]
    pub records: PathBuf,

    /// Weights to start from
    #[arg(long, short = 'w', env = super::WEIGHTS_PATH_ENV)]
    pub weights: PathBuf,

    /// Where the retrained weights go; defaults to overwriting `--weights`
    #[arg(long, short = 'p')]
    pub persist: Option<PathBuf>,

    /// Training configuration file (JSON); missing keys use finetuning defaults
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Override the number of epochs
    #[arg(long)]
    pub epochs: Option<usize>,
}

impl FinetuneCommand {
    pub fn paths(&self) -> ModelPaths {
        match &self.persist {
            Some(persist) => ModelPaths::new(&self.weights, persist),
            None => ModelPaths::in_place(&self.weights),
        }
    }

    pub fn config(&self) -> Result<TrainingConfig> {
        let mut config = load_config(self.config.as_deref(), TrainingConfig::finetune())?;
        if let Some(epochs) = self.epochs {
            config.num_epochs = epochs;
        }
        Ok(config)
    }

    /// Retrains and returns the report as JSON.
    pub fn execute(&self) -> Result<serde_json::Value> {
        let config = self.config()?;
        let paths = self.paths();
        let records = read_records(&self.records)?;
        info!(
            records = records.len(),
            load = %paths.load_path.display(),
            persist = %paths.persist_path.display(),
            "Finetuning"
        );

        let report = finetune(&records, &config, &paths).with_context(|| {
            format!("Finetuning {} failed", paths.load_path.display())
        })?;
        Ok(serde_json::to_value(&report)?)
    }

    /// Execute the finetune command
    pub fn run(&self) -> Result<()> {
        print_json(&self.execute()?)
    }
}
