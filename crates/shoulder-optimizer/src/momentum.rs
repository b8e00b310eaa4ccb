//! Momentum optimizer.
//!
//! Accumulates a velocity so that directions with a consistent gradient sign
//! take progressively larger steps.

use crate::{Optimizer, OptimizerConfig, OptimizerError};
use serde::{Deserialize, Serialize};

/// Momentum optimizer with optional Nesterov look-ahead.
///
/// ```text
/// velocity = momentum * velocity + gradient
/// param   -= learning_rate * velocity                         (standard)
/// param   -= learning_rate * (momentum * velocity + gradient) (Nesterov)
/// ```
///
/// The velocity buffer is sized lazily on the first update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Momentum {
    learning_rate: f32,
    momentum: f32,
    use_nesterov: bool,
    velocity: Vec<f32>,
    config: OptimizerConfig,
}

impl Momentum {
    /// Returns the current velocity state.
    pub fn velocity(&self) -> &[f32] {
        &self.velocity
    }

    /// Resets the optimizer state.
    pub fn reset_state(&mut self) {
        self.velocity.clear();
    }
}

impl Optimizer for Momentum {
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        match config {
            OptimizerConfig::Momentum {
                learning_rate,
                momentum,
                use_nesterov,
            } => Ok(Self {
                learning_rate,
                momentum,
                use_nesterov,
                velocity: Vec::new(),
                config,
            }),
            _ => Err(OptimizerError::ConfigMismatch {
                expected: "Momentum".to_string(),
                got: config.name().to_string(),
            }),
        }
    }

    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]) {
        if self.velocity.len() != params.len() {
            self.velocity = vec![0.0; params.len()];
        }
        for ((p, g), v) in params
            .iter_mut()
            .zip(gradients)
            .zip(self.velocity.iter_mut())
        {
            *v = self.momentum * *v + g;
            let step = if self.use_nesterov {
                self.momentum * *v + g
            } else {
                *v
            };
            *p -= self.learning_rate * step;
        }
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}
