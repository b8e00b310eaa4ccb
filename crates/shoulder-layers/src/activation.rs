//! Activation functions.
//!
//! [`ReLU`] is the hidden-layer nonlinearity of the deep network. [`Sigmoid`]
//! squashes the DeepFM logit into an attendance probability.

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;

/// Smallest distance a probability keeps from 0 and 1.
///
/// `f32` sigmoid saturates to exactly `1.0` for logits above ~17, which would
/// make the cross-entropy infinite.
pub const PROBABILITY_EPSILON: f32 = 1e-7;

/// Rectified Linear Unit activation.
///
/// Computes `f(x) = max(0, x)` element-wise.
///
/// # Example
///
/// ```
/// use shoulder_layers::activation::ReLU;
/// use shoulder_layers::layer::Layer;
/// use shoulder_layers::tensor::Tensor;
///
/// let relu = ReLU::new();
/// let input = Tensor::from_data(&[1, 3], vec![-1.0, 0.0, 2.0]);
/// assert_eq!(relu.forward(&input).unwrap().data(), &[0.0, 0.0, 2.0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReLU {
    /// Cached input for backward pass
    cached_input: Option<Tensor>,
}

impl ReLU {
    /// Creates a new ReLU activation layer.
    pub fn new() -> Self {
        Self { cached_input: None }
    }

    /// Performs forward pass and caches input for backward pass.
    pub fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.cached_input = Some(input.clone());
        self.forward(input)
    }
}

impl Layer for ReLU {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        Ok(input.map(|x| x.max(0.0)))
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let input = self
            .cached_input
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;

        let mask = input.map(|x| if x > 0.0 { 1.0 } else { 0.0 });
        Ok(grad.mul(&mask))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn take_gradients(&mut self) -> Result<Vec<Tensor>, LayerError> {
        self.cached_input = None;
        Ok(vec![])
    }

    fn name(&self) -> &str {
        "ReLU"
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Sigmoid activation producing probabilities strictly inside `(0, 1)`.
///
/// Non-finite inputs propagate unchanged in kind: a NaN logit stays NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl Sigmoid {
    /// Creates a new Sigmoid activation.
    pub fn new() -> Self {
        Self
    }

    /// Applies the squash element-wise.
    pub fn apply(&self, logits: &Tensor) -> Tensor {
        logits.map(|x| sigmoid(x).clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_backward_masks() {
        let mut relu = ReLU::new();
        let input = Tensor::from_data(&[1, 4], vec![-2.0, -0.5, 0.5, 3.0]);
        relu.forward_train(&input).unwrap();
        let grad = relu.backward(&Tensor::ones(&[1, 4])).unwrap();
        assert_eq!(grad.data(), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_relu_backward_without_forward() {
        let mut relu = ReLU::new();
        assert!(relu.backward(&Tensor::ones(&[1, 1])).is_err());
    }

    #[test]
    fn test_sigmoid_values() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-7);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sigmoid_strictly_bounded() {
        let out = Sigmoid::new().apply(&Tensor::from_data(&[3], vec![-500.0, 0.0, 500.0]));
        assert!(out.data().iter().all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_sigmoid_keeps_nan() {
        let out = Sigmoid::new().apply(&Tensor::from_data(&[1], vec![f32::NAN]));
        assert!(out.data()[0].is_nan());
    }
}
