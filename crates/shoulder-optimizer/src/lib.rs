//! Gradient-descent optimizers for DeepFM parameters.
//!
//! Every parameter tensor of the model (the embedding table, FM `w`/`V`/bias,
//! each MLP weight and bias) is a flat `f32` slice here. The trainer keeps one
//! optimizer instance per tensor so stateful variants track their own buffers.
//!
//! # Available Optimizers
//!
//! - [`Sgd`] - Stochastic Gradient Descent (the default)
//! - [`Momentum`] - SGD with a velocity buffer, optionally Nesterov
//!
//! # Example
//!
//! ```
//! use shoulder_optimizer::{Optimizer, Sgd, OptimizerConfig};
//!
//! let config = OptimizerConfig::Sgd { learning_rate: 0.01 };
//! let mut optimizer = Sgd::new(config).unwrap();
//!
//! let mut weights = vec![1.0, 2.0, 3.0];
//! let gradients = vec![0.1, 0.2, 0.3];
//!
//! optimizer.apply_gradients(&mut weights, &gradients);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod momentum;
mod sgd;

pub use momentum::Momentum;
pub use sgd::Sgd;

/// Learning rate used when none is configured.
pub const DEFAULT_LEARNING_RATE: f32 = 0.01;

/// Errors that can occur when working with optimizers.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Configuration type does not match the optimizer type.
    #[error("Config mismatch: expected {expected}, got {got}")]
    ConfigMismatch { expected: String, got: String },

    /// Invalid configuration parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Configuration for the supported optimizer types.
///
/// Serialized with a `type` tag:
///
/// ```
/// use shoulder_optimizer::OptimizerConfig;
///
/// let config: OptimizerConfig =
///     serde_json::from_str(r#"{"type": "momentum", "learning_rate": 0.05, "momentum": 0.9}"#)
///         .unwrap();
/// assert_eq!(config.name(), "Momentum");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerConfig {
    /// Stochastic Gradient Descent configuration.
    Sgd {
        /// Learning rate for gradient updates.
        learning_rate: f32,
    },

    /// Momentum configuration.
    Momentum {
        /// Learning rate for gradient updates.
        learning_rate: f32,
        /// Momentum coefficient in `[0, 1)`.
        momentum: f32,
        /// Whether to use Nesterov momentum.
        #[serde(default)]
        use_nesterov: bool,
    },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Sgd {
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }
}

impl OptimizerConfig {
    /// Returns the name of the optimizer type.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::Sgd { .. } => "Sgd",
            OptimizerConfig::Momentum { .. } => "Momentum",
        }
    }

    /// Returns the learning rate for the optimizer.
    pub fn learning_rate(&self) -> f32 {
        match self {
            OptimizerConfig::Sgd { learning_rate } => *learning_rate,
            OptimizerConfig::Momentum { learning_rate, .. } => *learning_rate,
        }
    }

    /// Checks hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::InvalidParameter`] for a non-positive or
    /// non-finite learning rate, or a momentum outside `[0, 1)`.
    pub fn validate(&self) -> Result<(), OptimizerError> {
        let lr = self.learning_rate();
        if !lr.is_finite() || lr <= 0.0 {
            return Err(OptimizerError::InvalidParameter(format!(
                "learning_rate must be positive and finite, got {}",
                lr
            )));
        }
        if let OptimizerConfig::Momentum { momentum, .. } = self {
            if !(0.0..1.0).contains(momentum) {
                return Err(OptimizerError::InvalidParameter(format!(
                    "momentum must be in [0, 1), got {}",
                    momentum
                )));
            }
        }
        Ok(())
    }
}

/// Trait for parameter optimizers.
///
/// Optimizers update a flat parameter slice in place from a gradient slice
/// of the same length.
pub trait Optimizer: Sized {
    /// Creates a new optimizer from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::ConfigMismatch`] if the configuration type
    /// does not match the optimizer type.
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError>;

    /// Applies gradients to update the parameters.
    ///
    /// # Panics
    ///
    /// May panic if `params` and `gradients` have different lengths.
    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]);

    /// Returns a reference to the optimizer's configuration.
    fn config(&self) -> &OptimizerConfig;
}

/// Creates an optimizer from the given configuration.
///
/// # Errors
///
/// Returns [`OptimizerError::InvalidParameter`] if validation fails.
///
/// # Example
///
/// ```
/// use shoulder_optimizer::{create_optimizer, OptimizerConfig};
///
/// let mut optimizer = create_optimizer(OptimizerConfig::default()).unwrap();
/// let mut weights = vec![1.0];
/// optimizer.apply_gradients(&mut weights, &[1.0]);
/// assert!((weights[0] - 0.99).abs() < 1e-6);
/// ```
pub fn create_optimizer(config: OptimizerConfig) -> Result<Box<dyn OptimizerDyn>, OptimizerError> {
    config.validate()?;
    Ok(match &config {
        OptimizerConfig::Sgd { .. } => Box::new(Sgd::new(config)?),
        OptimizerConfig::Momentum { .. } => Box::new(Momentum::new(config)?),
    })
}

/// Dynamic dispatch version of the Optimizer trait.
pub trait OptimizerDyn: Send {
    /// Applies gradients to update the parameters.
    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]);

    /// Returns a reference to the optimizer's configuration.
    fn config(&self) -> &OptimizerConfig;
}

impl<T: Optimizer + Send> OptimizerDyn for T {
    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]) {
        Optimizer::apply_gradients(self, params, gradients)
    }

    fn config(&self) -> &OptimizerConfig {
        Optimizer::config(self)
    }
}
