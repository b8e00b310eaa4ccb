//! Command-line interface for the event recommender.
//!
//! - **Pretrain**: train a model from scratch on labeled records
//! - **Finetune**: continue training persisted weights
//! - **Recommend**: print attendance probabilities for candidate records
//!
//! Reports and probabilities go to stdout as JSON; logs go to stderr.
//!
//! # Example
//!
//! ```bash
//! export SHOULDER_WEIGHTS_PATH=weights/parameters.json
//! shoulder pretrain --records labeled.json --config config.json
//! shoulder finetune --records new_labels.json --epochs 3
//! shoulder recommend --records candidates.json --top-k 10 --neutral 0.5
//! ```

pub mod commands;

use clap::{Parser, Subcommand};

pub use commands::{FinetuneCommand, PretrainCommand, RecommendCommand, WEIGHTS_PATH_ENV};

/// Shoulder - a DeepFM recommender for social events
#[derive(Parser, Debug)]
#[command(name = "shoulder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a model from scratch and persist its weights
    Pretrain(PretrainCommand),

    /// Continue training persisted weights on new records
    Finetune(FinetuneCommand),

    /// Score candidate records with persisted weights
    Recommend(RecommendCommand),
}

impl Commands {
    /// Runs the selected command.
    pub fn run(&self) -> anyhow::Result<()> {
        match self {
            Commands::Pretrain(cmd) => cmd.run(),
            Commands::Finetune(cmd) => cmd.run(),
            Commands::Recommend(cmd) => cmd.run(),
        }
    }
}

/// Result type alias for CLI operations
pub type CliResult<T> = anyhow::Result<T>;
