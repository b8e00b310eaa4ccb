//! Dense embedding table shared by every token column.
//!
//! Unlike a hash-based lookup, the table is a plain `[vocab_size + 1, dim]`
//! matrix indexed directly by token value. Every column of the token matrix
//! (field tokens and the trailing user token) reads from the same table.

use crate::error::LayerError;
use crate::initializer::Initializer;
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Token → dense vector lookup.
///
/// # Example
///
/// ```
/// use shoulder_layers::embedding::EmbeddingTable;
/// use shoulder_layers::layer::Layer;
/// use shoulder_layers::tensor::Tensor;
///
/// let table = EmbeddingTable::new(17, 10, 3);
/// assert_eq!(table.weights().shape(), &[11, 3]);
///
/// let tokens = Tensor::from_data(&[2, 2], vec![0.0, 3.0, 1.0, 10.0]);
/// let embedded = table.forward(&tokens).unwrap();
/// assert_eq!(embedded.shape(), &[2, 6]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingTable {
    /// Table of shape [vocab_size + 1, dim]
    embedding_weights: Tensor,
    #[serde(skip)]
    cached_tokens: Option<Vec<usize>>,
    #[serde(skip)]
    cached_shape: Option<Vec<usize>>,
    #[serde(skip)]
    weights_grad: Option<Tensor>,
}

impl EmbeddingTable {
    /// Creates a table with `vocab_size + 1` rows so that every token in
    /// `0..=vocab_size` is addressable.
    ///
    /// Entries are Glorot-uniform scaled by `(vocab_size, dim)`.
    pub fn new(seed: u64, vocab_size: usize, dim: usize) -> Self {
        let embedding_weights = Initializer::GlorotUniform { seed }.initialize_with_fans(
            &[vocab_size + 1, dim],
            vocab_size,
            dim,
        );
        Self {
            embedding_weights,
            cached_tokens: None,
            cached_shape: None,
            weights_grad: None,
        }
    }

    /// Returns the embedding matrix.
    pub fn weights(&self) -> &Tensor {
        &self.embedding_weights
    }

    /// Number of addressable tokens.
    pub fn vocab_rows(&self) -> usize {
        self.embedding_weights.shape()[0]
    }

    /// Embedding dimension.
    pub fn dim(&self) -> usize {
        self.embedding_weights.shape()[1]
    }

    /// Validates a token matrix and converts it to row indices.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::OutOfVocabulary`] for negative, fractional,
    /// non-finite or too large tokens.
    pub fn token_indices(&self, tokens: &Tensor) -> Result<Vec<usize>, LayerError> {
        if tokens.ndim() != 2 {
            return Err(LayerError::ForwardError {
                message: format!("Expected 2D token matrix, got {}D", tokens.ndim()),
            });
        }
        let rows = self.vocab_rows();
        tokens
            .data()
            .iter()
            .map(|&t| {
                if t.is_finite() && t >= 0.0 && t.fract() == 0.0 && (t as usize) < rows {
                    Ok(t as usize)
                } else {
                    Err(LayerError::OutOfVocabulary {
                        token: t,
                        vocab_rows: rows,
                    })
                }
            })
            .collect()
    }

    fn gather(&self, indices: &[usize], tokens_shape: &[usize]) -> Tensor {
        let dim = self.dim();
        let mut data = Vec::with_capacity(indices.len() * dim);
        for &idx in indices {
            data.extend_from_slice(self.embedding_weights.row(idx));
        }
        Tensor::from_data(&[tokens_shape[0], tokens_shape[1] * dim], data)
    }

    /// Performs forward pass and caches token indices for backward pass.
    pub fn forward_train(&mut self, tokens: &Tensor) -> Result<Tensor, LayerError> {
        let indices = self.token_indices(tokens)?;
        let output = self.gather(&indices, tokens.shape());
        self.cached_tokens = Some(indices);
        self.cached_shape = Some(tokens.shape().to_vec());
        Ok(output)
    }
}

impl Layer for EmbeddingTable {
    /// Concatenates the embeddings of each row's tokens along the feature
    /// axis: `[batch, num_tokens] -> [batch, num_tokens * dim]`.
    fn forward(&self, tokens: &Tensor) -> Result<Tensor, LayerError> {
        let indices = self.token_indices(tokens)?;
        Ok(self.gather(&indices, tokens.shape()))
    }

    /// Scatter-adds output gradients into the rows that were looked up.
    ///
    /// Tokens are not differentiable, so the returned input gradient is zero.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let indices = self
            .cached_tokens
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        let dim = self.dim();
        if grad.numel() != indices.len() * dim {
            return Err(LayerError::ShapeMismatch {
                expected: vec![indices.len() * dim],
                actual: grad.shape().to_vec(),
            });
        }

        let mut table_grad = Tensor::zeros(self.embedding_weights.shape());
        let out = table_grad.data_mut();
        for (slot, &idx) in indices.iter().enumerate() {
            let src = &grad.data()[slot * dim..(slot + 1) * dim];
            for (o, g) in out[idx * dim..(idx + 1) * dim].iter_mut().zip(src) {
                *o += g;
            }
        }
        self.weights_grad = Some(table_grad);

        let shape = self
            .cached_shape
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        Ok(Tensor::zeros(shape))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.embedding_weights]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.embedding_weights]
    }

    fn take_gradients(&mut self) -> Result<Vec<Tensor>, LayerError> {
        let grad = self.weights_grad.take().ok_or(LayerError::NotInitialized)?;
        self.cached_tokens = None;
        self.cached_shape = None;
        Ok(vec![grad])
    }

    fn name(&self) -> &str {
        "EmbeddingTable"
    }
}
