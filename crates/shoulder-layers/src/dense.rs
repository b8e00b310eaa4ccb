//! Dense (fully connected) layer implementation.
//!
//! This module provides the [`Dense`] layer, which performs a linear transformation
//! `y = xW + b` where W is the weight matrix and b is the bias vector.

use crate::error::LayerError;
use crate::initializer::Initializer;
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// A dense (fully connected) layer.
///
/// Performs the transformation `y = xW + b` where:
/// - `x` is the input tensor of shape `[batch_size, in_features]`
/// - `W` is the weight matrix of shape `[in_features, out_features]`
/// - `b` is the bias vector of shape `[out_features]`
///
/// Serializes as `{weights, biases}`; gradient caches are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    /// Weight matrix of shape [in_features, out_features]
    weights: Tensor,
    /// Bias vector of shape [out_features]
    biases: Tensor,
    #[serde(skip)]
    weights_grad: Option<Tensor>,
    #[serde(skip)]
    biases_grad: Option<Tensor>,
    #[serde(skip)]
    cached_input: Option<Tensor>,
}

impl Dense {
    /// Creates a dense layer with Glorot-uniform weights drawn from `seed` and
    /// zero biases.
    pub fn new(in_features: usize, out_features: usize, seed: u64) -> Self {
        let weights = Initializer::GlorotUniform { seed }.initialize(&[in_features, out_features]);
        let biases = Initializer::Zeros.initialize(&[out_features]);
        Self {
            weights,
            biases,
            weights_grad: None,
            biases_grad: None,
            cached_input: None,
        }
    }

    /// Creates a dense layer with custom weights and biases.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes are incompatible
    pub fn from_weights(weights: Tensor, biases: Tensor) -> Result<Self, LayerError> {
        if weights.ndim() != 2 {
            return Err(LayerError::ConfigError {
                message: format!("Weights must be 2D, got {}D", weights.ndim()),
            });
        }
        if biases.ndim() != 1 {
            return Err(LayerError::ConfigError {
                message: format!("Biases must be 1D, got {}D", biases.ndim()),
            });
        }
        if weights.shape()[1] != biases.shape()[0] {
            return Err(LayerError::ShapeMismatch {
                expected: vec![weights.shape()[1]],
                actual: vec![biases.shape()[0]],
            });
        }
        Ok(Self {
            weights,
            biases,
            weights_grad: None,
            biases_grad: None,
            cached_input: None,
        })
    }

    /// Returns the input feature dimension.
    pub fn in_features(&self) -> usize {
        self.weights.shape()[0]
    }

    /// Returns the output feature dimension.
    pub fn out_features(&self) -> usize {
        self.weights.shape()[1]
    }

    /// Returns a reference to the weights tensor.
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// Returns a reference to the bias tensor.
    pub fn biases(&self) -> &Tensor {
        &self.biases
    }

    /// Performs forward pass and caches input for backward pass.
    pub fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        let output = self.forward(input)?;
        self.cached_input = Some(input.clone());
        Ok(output)
    }
}

impl Layer for Dense {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.ndim() != 2 {
            return Err(LayerError::ForwardError {
                message: format!("Expected 2D input, got {}D", input.ndim()),
            });
        }
        if input.cols() != self.in_features() {
            return Err(LayerError::InvalidInputDimension {
                expected: self.in_features(),
                actual: input.cols(),
            });
        }
        Ok(input.matmul(&self.weights).add(&self.biases))
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let input = self
            .cached_input
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;

        if grad.ndim() != 2 || grad.cols() != self.out_features() {
            return Err(LayerError::InvalidOutputDimension {
                expected: self.out_features(),
                actual: grad.shape().last().copied().unwrap_or(0),
            });
        }

        // dL/dW = x^T @ dL/dy, dL/db = sum over batch
        self.weights_grad = Some(input.transpose().matmul(grad));
        self.biases_grad = Some(grad.sum_axis(0));

        // dL/dx = dL/dy @ W^T
        Ok(grad.matmul(&self.weights.transpose()))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weights, &self.biases]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weights, &mut self.biases]
    }

    fn take_gradients(&mut self) -> Result<Vec<Tensor>, LayerError> {
        let weights_grad = self.weights_grad.take().ok_or(LayerError::NotInitialized)?;
        let biases_grad = self.biases_grad.take().ok_or(LayerError::NotInitialized)?;
        self.cached_input = None;
        Ok(vec![weights_grad, biases_grad])
    }

    fn name(&self) -> &str {
        "Dense"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_creation() {
        let layer = Dense::new(64, 32, 1);
        assert_eq!(layer.in_features(), 64);
        assert_eq!(layer.out_features(), 32);
        assert_eq!(layer.weights().shape(), &[64, 32]);
        assert!(layer.biases().data().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_dense_forward_invalid_input() {
        let layer = Dense::new(10, 5, 1);
        assert!(matches!(
            layer.forward(&Tensor::ones(&[3, 20])),
            Err(LayerError::InvalidInputDimension { expected: 10, actual: 20 })
        ));
    }

    #[test]
    fn test_dense_known_values() {
        let layer = Dense::from_weights(
            Tensor::from_data(&[2, 1], vec![2.0, -1.0]),
            Tensor::from_data(&[1], vec![0.5]),
        )
        .unwrap();
        let out = layer
            .forward(&Tensor::from_data(&[2, 2], vec![1.0, 1.0, 3.0, 2.0]))
            .unwrap();
        assert_eq!(out.data(), &[1.5, 4.5]);
    }

    #[test]
    fn test_dense_backward() {
        let mut layer = Dense::from_weights(
            Tensor::from_data(&[2, 1], vec![2.0, -1.0]),
            Tensor::zeros(&[1]),
        )
        .unwrap();
        let input = Tensor::from_data(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        layer.forward_train(&input).unwrap();

        let input_grad = layer.backward(&Tensor::ones(&[2, 1])).unwrap();
        assert_eq!(input_grad.data(), &[2.0, -1.0, 2.0, -1.0]);

        let grads = layer.take_gradients().unwrap();
        assert_eq!(grads[0].data(), &[4.0, 6.0]);
        assert_eq!(grads[1].data(), &[2.0]);
    }

    #[test]
    fn test_dense_from_weights_invalid() {
        let result = Dense::from_weights(Tensor::ones(&[10, 5]), Tensor::zeros(&[10]));
        assert!(result.is_err());
    }

    #[test]
    fn test_dense_serializes_without_caches() {
        let mut layer = Dense::new(3, 2, 4);
        layer.forward_train(&Tensor::ones(&[1, 3])).unwrap();
        let json = serde_json::to_value(&layer).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["biases".to_string(), "weights".to_string()]);
    }
}
