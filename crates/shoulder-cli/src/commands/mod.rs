//! CLI Command Implementations
//!
//! - [`PretrainCommand`]: train from scratch and persist the weights
//! - [`FinetuneCommand`]: continue training persisted weights
//! - [`RecommendCommand`]: score candidate records

mod finetune;
mod pretrain;
mod recommend;

pub use finetune::FinetuneCommand;
pub use pretrain::PretrainCommand;
pub use recommend::RecommendCommand;

use anyhow::{Context, Result};
use shoulder_data::{parse_records, RawRecord};
use shoulder_training::TrainingConfig;
use std::path::Path;

/// Environment variable consulted when `--weights` is omitted.
pub const WEIGHTS_PATH_ENV: &str = "SHOULDER_WEIGHTS_PATH";

/// Reads a JSON array of records.
pub(crate) fn read_records(path: &Path) -> Result<Vec<RawRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;
    let records = parse_records(&text)
        .with_context(|| format!("Failed to parse records in {}", path.display()))?;
    tracing::debug!(path = %path.display(), count = records.len(), "Loaded records");
    Ok(records)
}

/// The JSON config at `path`, or `defaults` when no file was given.
pub(crate) fn load_config(path: Option<&Path>, defaults: TrainingConfig) -> Result<TrainingConfig> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading training config");
            TrainingConfig::from_json_file(path).context("Invalid training config")
        }
        None => Ok(defaults),
    }
}

/// Writes `value` to stdout as pretty JSON.
pub(crate) fn print_json(value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{text}");
    Ok(())
}
