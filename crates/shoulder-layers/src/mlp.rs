//! Multi-layer perceptron (MLP) implementation.
//!
//! This module provides the [`MLP`] struct, a stack of dense layers with a
//! ReLU between consecutive layers and a linear output layer.

use crate::activation::ReLU;
use crate::dense::Dense;
use crate::error::LayerError;
use crate::initializer::split_seed;
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Multi-layer perceptron.
///
/// `layer_sizes = [in, h1, ..., out]` builds `len - 1` dense layers. Every
/// layer but the last is followed by a ReLU.
///
/// # Example
///
/// ```
/// use shoulder_layers::layer::Layer;
/// use shoulder_layers::mlp::MLP;
/// use shoulder_layers::tensor::Tensor;
///
/// let mlp = MLP::new(6, &[2, 5, 5, 1]).unwrap();
/// let out = mlp.forward(&Tensor::ones(&[10, 2])).unwrap();
/// assert_eq!(out.shape(), &[10, 1]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLP {
    layers: Vec<Dense>,
    #[serde(skip)]
    activations: Vec<ReLU>,
}

impl MLP {
    /// Builds an MLP whose dense layer `i` is seeded with
    /// `split_seed(seed, i)`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] when fewer than two sizes are given
    /// or any size is zero.
    pub fn new(seed: u64, layer_sizes: &[usize]) -> Result<Self, LayerError> {
        if layer_sizes.len() < 2 {
            return Err(LayerError::ConfigError {
                message: format!(
                    "MLP needs at least an input and an output size, got {:?}",
                    layer_sizes
                ),
            });
        }
        if let Some(i) = layer_sizes.iter().position(|&d| d == 0) {
            return Err(LayerError::ConfigError {
                message: format!("Layer size {} is zero", i),
            });
        }
        let layers: Vec<Dense> = layer_sizes
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Dense::new(pair[0], pair[1], split_seed(seed, i as u64)))
            .collect();
        Ok(Self::from_layers(layers))
    }

    fn from_layers(layers: Vec<Dense>) -> Self {
        let activations = (1..layers.len()).map(|_| ReLU::new()).collect();
        Self {
            layers,
            activations,
        }
    }

    /// Dense layers in order.
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Input width.
    pub fn input_dim(&self) -> usize {
        self.layers.first().map(Dense::in_features).unwrap_or(0)
    }

    /// Output width.
    pub fn output_dim(&self) -> usize {
        self.layers.last().map(Dense::out_features).unwrap_or(0)
    }

    fn ensure_activations(&mut self) {
        // Deserialized models come back without activation slots.
        if self.activations.len() + 1 != self.layers.len() {
            self.activations = (1..self.layers.len()).map(|_| ReLU::new()).collect();
        }
    }

    /// Performs forward pass, caching every intermediate for backward.
    pub fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.ensure_activations();
        let last = self.layers.len().saturating_sub(1);
        let mut x = input.clone();
        for i in 0..self.layers.len() {
            x = self.layers[i].forward_train(&x)?;
            if i < last {
                x = self.activations[i].forward_train(&x)?;
            }
        }
        Ok(x)
    }
}

impl Layer for MLP {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        let last = self.layers.len().saturating_sub(1);
        let relu = ReLU::new();
        let mut x = input.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x)?;
            if i < last {
                x = relu.forward(&x)?;
            }
        }
        Ok(x)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let last = self.layers.len().saturating_sub(1);
        if self.activations.len() < last {
            return Err(LayerError::NotInitialized);
        }
        let mut g = grad.clone();
        for i in (0..self.layers.len()).rev() {
            if i < last {
                g = self.activations[i].backward(&g)?;
            }
            g = self.layers[i].backward(&g)?;
        }
        Ok(g)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.parameters_mut())
            .collect()
    }

    fn take_gradients(&mut self) -> Result<Vec<Tensor>, LayerError> {
        for relu in &mut self.activations {
            relu.take_gradients()?;
        }
        let mut grads = Vec::with_capacity(self.layers.len() * 2);
        for layer in &mut self.layers {
            grads.extend(layer.take_gradients()?);
        }
        Ok(grads)
    }

    fn name(&self) -> &str {
        "MLP"
    }
}
