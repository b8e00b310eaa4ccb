//! Training hyperparameters and weight locations.
//!
//! Nothing here carries a default weight path: callers thread the load and
//! persist locations explicitly through [`ModelPaths`].

use serde::{Deserialize, Serialize};
use shoulder_layers::deepfm::{InitSeeds, DEFAULT_HIDDEN_SIZES};
use shoulder_optimizer::OptimizerConfig;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrainingError};

/// Hyperparameters shared by pretraining and finetuning.
///
/// Missing keys in a JSON file fall back to the pretraining defaults.
///
/// # Example
///
/// ```
/// use shoulder_training::TrainingConfig;
///
/// let config = TrainingConfig::default()
///     .with_batch_size(16)
///     .with_num_epochs(3);
/// assert_eq!(config.num_factors, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Latent factor dimension of the embedding and the FM.
    pub num_factors: usize,
    /// Examples per mini-batch.
    pub batch_size: usize,
    /// Full passes over the data.
    pub num_epochs: usize,
    /// Seed for the per-epoch shuffle.
    pub shuffle_seed: u64,
    /// Seeds for embedding, FM and MLP initialization.
    pub init_seeds: InitSeeds,
    /// Hidden widths of the deep head.
    pub hidden_sizes: Vec<usize>,
    /// Parameter update rule.
    pub optimizer: OptimizerConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::pretrain()
    }
}

impl TrainingConfig {
    /// Defaults for training from scratch: 10 epochs, shuffle seed 1994.
    pub fn pretrain() -> Self {
        Self {
            num_factors: 5,
            batch_size: 32,
            num_epochs: 10,
            shuffle_seed: 1994,
            init_seeds: InitSeeds::default(),
            hidden_sizes: DEFAULT_HIDDEN_SIZES.to_vec(),
            optimizer: OptimizerConfig::default(),
        }
    }

    /// Defaults for incremental retraining: 5 epochs, shuffle seed 1999.
    pub fn finetune() -> Self {
        Self {
            num_epochs: 5,
            shuffle_seed: 1999,
            ..Self::pretrain()
        }
    }

    pub fn with_num_factors(mut self, num_factors: usize) -> Self {
        self.num_factors = num_factors;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_num_epochs(mut self, num_epochs: usize) -> Self {
        self.num_epochs = num_epochs;
        self
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = seed;
        self
    }

    pub fn with_init_seeds(mut self, seeds: impl Into<InitSeeds>) -> Self {
        self.init_seeds = seeds.into();
        self
    }

    pub fn with_hidden_sizes(mut self, hidden_sizes: Vec<usize>) -> Self {
        self.hidden_sizes = hidden_sizes;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::ConfigFile`] if the file is unreadable or
    /// not valid JSON for this struct.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_err = |message: String| TrainingError::ConfigFile {
            path: path.to_path_buf(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| config_err(e.to_string()))
    }

    /// Checks hyperparameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.num_factors == 0 {
            return Err(TrainingError::InvalidConfig(
                "num_factors must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }
        if self.num_epochs == 0 {
            return Err(TrainingError::InvalidConfig(
                "num_epochs must be positive".to_string(),
            ));
        }
        if self.hidden_sizes.iter().any(|&h| h == 0) {
            return Err(TrainingError::InvalidConfig(format!(
                "hidden_sizes must be positive, got {:?}",
                self.hidden_sizes
            )));
        }
        self.optimizer.validate()?;
        Ok(())
    }
}

/// Where finetuning reads weights from and writes them to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPaths {
    pub load_path: PathBuf,
    pub persist_path: PathBuf,
}

impl ModelPaths {
    pub fn new(load_path: impl Into<PathBuf>, persist_path: impl Into<PathBuf>) -> Self {
        Self {
            load_path: load_path.into(),
            persist_path: persist_path.into(),
        }
    }

    /// Reads and overwrites the same file.
    pub fn in_place(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            load_path: path.clone(),
            persist_path: path,
        }
    }
}
