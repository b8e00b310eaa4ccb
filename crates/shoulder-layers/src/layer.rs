//! Layer trait definition.
//!
//! This module defines the [`Layer`] trait shared by every trainable
//! component of the DeepFM model, providing a unified interface for forward
//! and backward passes and for handing parameters to an optimizer.

use crate::error::LayerError;
use crate::tensor::Tensor;

/// A layer that supports forward and backward propagation.
///
/// `forward` is pure and never touches cached state, so a shared reference to
/// a trained layer is enough for inference. Training goes through the
/// layer-specific `forward_train`, which caches what `backward` needs.
///
/// # Example
///
/// ```
/// use shoulder_layers::dense::Dense;
/// use shoulder_layers::layer::Layer;
/// use shoulder_layers::tensor::Tensor;
///
/// let layer = Dense::new(128, 64, 3);
/// let input = Tensor::zeros(&[32, 128]);
/// let output = layer.forward(&input).unwrap();
/// assert_eq!(output.shape(), &[32, 64]);
/// ```
pub trait Layer: Send + Sync {
    /// Performs a forward pass through the layer.
    ///
    /// # Errors
    ///
    /// Returns a [`LayerError`] if the input shape is incompatible with the layer
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError>;

    /// Performs a backward pass through the layer.
    ///
    /// Takes the gradient of the loss with respect to the layer's output,
    /// stores the gradients of the layer's parameters, and returns the
    /// gradient with respect to the layer's input.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::NotInitialized`] if no training forward pass
    /// preceded this call.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError>;

    /// Returns references to the layer's learnable parameters.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Returns mutable references to the layer's learnable parameters.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Removes and returns the gradients computed by the last `backward`,
    /// in the same order as [`Layer::parameters_mut`].
    ///
    /// Also drops any cached forward state.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::NotInitialized`] if `backward` has not run.
    fn take_gradients(&mut self) -> Result<Vec<Tensor>, LayerError>;

    /// Returns the name of the layer for debugging and logging purposes.
    fn name(&self) -> &str {
        "Layer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockLayer {
        weight: Tensor,
        grad: Option<Tensor>,
    }

    impl Layer for MockLayer {
        fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
            Ok(input.clone())
        }

        fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
            self.grad = Some(Tensor::ones(self.weight.shape()));
            Ok(grad.clone())
        }

        fn parameters(&self) -> Vec<&Tensor> {
            vec![&self.weight]
        }

        fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
            vec![&mut self.weight]
        }

        fn take_gradients(&mut self) -> Result<Vec<Tensor>, LayerError> {
            let grad = self.grad.take().ok_or(LayerError::NotInitialized)?;
            Ok(vec![grad])
        }

        fn name(&self) -> &str {
            "MockLayer"
        }
    }

    #[test]
    fn test_layer_trait() {
        let mut layer = MockLayer {
            weight: Tensor::zeros(&[2, 2]),
            grad: None,
        };
        assert!(matches!(
            layer.take_gradients(),
            Err(LayerError::NotInitialized)
        ));

        let out = layer.forward(&Tensor::ones(&[3, 2])).unwrap();
        assert_eq!(out.shape(), &[3, 2]);
        layer.backward(&out).unwrap();

        let grads = layer.take_gradients().unwrap();
        assert_eq!(grads.len(), layer.parameters().len());
        assert_eq!(layer.name(), "MockLayer");
    }
}
