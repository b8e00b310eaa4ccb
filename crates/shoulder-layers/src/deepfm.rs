//! DeepFM: a factorization machine and an MLP over one shared embedding.
//!
//! Both heads read the flattened embedded token matrix; their scalar outputs
//! are summed into a logit and squashed by a sigmoid.
//!
//! ```text
//! tokens [B, T] ──► EmbeddingTable ──► [B, T*k] ──┬──► FM  ──► [B, 1] ──┐
//!                                                 └──► MLP ──► [B, 1] ──┴──► + ──► sigmoid
//! ```

use crate::activation::Sigmoid;
use crate::embedding::EmbeddingTable;
use crate::error::LayerError;
use crate::fm::FactorizationMachine;
use crate::layer::Layer;
use crate::mlp::MLP;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Default hidden layer widths of the deep head.
pub const DEFAULT_HIDDEN_SIZES: [usize; 6] = [128, 128, 64, 64, 32, 32];

/// Initialization seeds for the three sub-networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitSeeds {
    pub embedding: u64,
    pub fm: u64,
    pub mlp: u64,
}

impl Default for InitSeeds {
    fn default() -> Self {
        Self {
            embedding: 8,
            fm: 6,
            mlp: 7,
        }
    }
}

impl From<(u64, u64, u64)> for InitSeeds {
    fn from((embedding, fm, mlp): (u64, u64, u64)) -> Self {
        Self { embedding, fm, mlp }
    }
}

/// Shape and seed configuration of a [`DeepFm`].
///
/// # Example
///
/// ```
/// use shoulder_layers::deepfm::DeepFmConfig;
///
/// let model = DeepFmConfig::new(500, 10, 5)
///     .with_hidden_sizes(vec![16, 8])
///     .build()
///     .unwrap();
/// assert_eq!(model.embedding().weights().shape(), &[501, 5]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepFmConfig {
    /// Largest token value the embedding table must address.
    pub vocab_size: usize,
    /// Token columns per example, user token included.
    pub num_fields: usize,
    /// Embedding and FM factor dimension.
    pub factor_dim: usize,
    /// Hidden widths of the MLP; a 1-unit output layer is appended.
    pub hidden_sizes: Vec<usize>,
    pub seeds: InitSeeds,
}

impl DeepFmConfig {
    pub fn new(vocab_size: usize, num_fields: usize, factor_dim: usize) -> Self {
        Self {
            vocab_size,
            num_fields,
            factor_dim,
            hidden_sizes: DEFAULT_HIDDEN_SIZES.to_vec(),
            seeds: InitSeeds::default(),
        }
    }

    pub fn with_hidden_sizes(mut self, hidden_sizes: Vec<usize>) -> Self {
        self.hidden_sizes = hidden_sizes;
        self
    }

    pub fn with_seeds(mut self, seeds: impl Into<InitSeeds>) -> Self {
        self.seeds = seeds.into();
        self
    }

    /// Width of the flattened embedded representation.
    pub fn embedded_width(&self) -> usize {
        self.num_fields * self.factor_dim
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), LayerError> {
        if self.num_fields == 0 {
            return Err(LayerError::ConfigError {
                message: "num_fields must be positive".to_string(),
            });
        }
        if self.factor_dim == 0 {
            return Err(LayerError::ConfigError {
                message: "factor_dim must be positive".to_string(),
            });
        }
        if let Some(i) = self.hidden_sizes.iter().position(|&h| h == 0) {
            return Err(LayerError::ConfigError {
                message: format!("Hidden layer {} has zero width", i),
            });
        }
        // tokens travel as f32, which is exact only up to 2^24
        if self.vocab_size > 1 << f32::MANTISSA_DIGITS {
            return Err(LayerError::ConfigError {
                message: format!(
                    "vocab_size {} exceeds the largest exact f32 token {}",
                    self.vocab_size,
                    1u32 << f32::MANTISSA_DIGITS
                ),
            });
        }
        let too_large = |what: &str| LayerError::ConfigError {
            message: format!("{} element count overflows usize", what),
        };
        self.vocab_size
            .checked_add(1)
            .and_then(|rows| rows.checked_mul(self.factor_dim))
            .ok_or_else(|| too_large("Embedding table"))?;
        self.num_fields
            .checked_mul(self.factor_dim)
            .and_then(|width| width.checked_mul(self.factor_dim))
            .ok_or_else(|| too_large("FM factor matrix"))?;
        Ok(())
    }

    /// Builds a freshly initialized model.
    pub fn build(&self) -> Result<DeepFm, LayerError> {
        DeepFm::new(self)
    }
}

/// The DeepFM parameter tree.
///
/// Serializes as `{embedding, fm, mlp}`; only parameters are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepFm {
    embedding: EmbeddingTable,
    fm: FactorizationMachine,
    mlp: MLP,
    #[serde(skip)]
    cached_batch: Option<usize>,
}

impl DeepFm {
    /// Composes the three sub-initializations from `config`.
    pub fn new(config: &DeepFmConfig) -> Result<Self, LayerError> {
        config.validate()?;
        let width = config.embedded_width();
        let mut sizes = Vec::with_capacity(config.hidden_sizes.len() + 2);
        sizes.push(width);
        sizes.extend_from_slice(&config.hidden_sizes);
        sizes.push(1);

        Ok(Self {
            embedding: EmbeddingTable::new(
                config.seeds.embedding,
                config.vocab_size,
                config.factor_dim,
            ),
            fm: FactorizationMachine::new(config.seeds.fm, width, config.factor_dim),
            mlp: MLP::new(config.seeds.mlp, &sizes)?,
            cached_batch: None,
        })
    }

    pub fn embedding(&self) -> &EmbeddingTable {
        &self.embedding
    }

    pub fn fm(&self) -> &FactorizationMachine {
        &self.fm
    }

    pub fn mlp(&self) -> &MLP {
        &self.mlp
    }

    /// Number of token columns the model expects.
    pub fn num_fields(&self) -> usize {
        self.fm.input_width() / self.embedding.dim().max(1)
    }

    /// Number of rows in the embedding table (largest valid token + 1).
    pub fn vocab_rows(&self) -> usize {
        self.embedding.vocab_rows()
    }

    fn check_tokens(&self, tokens: &Tensor) -> Result<(), LayerError> {
        if tokens.ndim() != 2 {
            return Err(LayerError::ForwardError {
                message: format!("Expected 2D token matrix, got {}D", tokens.ndim()),
            });
        }
        if tokens.cols() != self.num_fields() {
            return Err(LayerError::InvalidInputDimension {
                expected: self.num_fields(),
                actual: tokens.cols(),
            });
        }
        Ok(())
    }

    /// Raw logits `fm(e) + mlp(e)`, shape [batch, 1].
    pub fn logits(&self, tokens: &Tensor) -> Result<Tensor, LayerError> {
        self.check_tokens(tokens)?;
        let embedded = self.embedding.forward(tokens)?;
        let fm_out = self.fm.forward(&embedded)?;
        let mlp_out = self.mlp.forward(&embedded)?;
        Ok(fm_out.add(&mlp_out))
    }

    /// Attendance probabilities in `(0, 1)`, shape [batch, 1].
    pub fn predict(&self, tokens: &Tensor) -> Result<Tensor, LayerError> {
        Ok(Sigmoid::new().apply(&self.logits(tokens)?))
    }

    /// Training forward pass; caches every sub-layer's intermediates.
    pub fn forward_train(&mut self, tokens: &Tensor) -> Result<Tensor, LayerError> {
        self.check_tokens(tokens)?;
        let embedded = self.embedding.forward_train(tokens)?;
        let fm_out = self.fm.forward_train(&embedded)?;
        let mlp_out = self.mlp.forward_train(&embedded)?;
        self.cached_batch = Some(tokens.rows());
        Ok(Sigmoid::new().apply(&fm_out.add(&mlp_out)))
    }

    /// Back-propagates mean binary cross-entropy given the probabilities
    /// returned by [`DeepFm::forward_train`] and the 0/1 labels.
    pub fn backward_bce(&mut self, probs: &Tensor, labels: &Tensor) -> Result<(), LayerError> {
        let batch = self.cached_batch.ok_or(LayerError::NotInitialized)?;
        if probs.shape() != [batch, 1] || labels.numel() != batch {
            return Err(LayerError::ShapeMismatch {
                expected: vec![batch, 1],
                actual: labels.shape().to_vec(),
            });
        }
        let labels = labels.reshape(&[batch, 1]);
        let dlogit = probs.sub(&labels).scale(1.0 / batch.max(1) as f32);
        self.backward(&dlogit)?;
        Ok(())
    }
}

impl Layer for DeepFm {
    /// Probability forward pass.
    fn forward(&self, tokens: &Tensor) -> Result<Tensor, LayerError> {
        self.predict(tokens)
    }

    /// Takes the gradient with respect to the logit.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let d_fm = self.fm.backward(grad)?;
        let d_mlp = self.mlp.backward(grad)?;
        self.embedding.backward(&d_fm.add(&d_mlp))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.embedding.parameters();
        params.extend(self.fm.parameters());
        params.extend(self.mlp.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.embedding.parameters_mut();
        params.extend(self.fm.parameters_mut());
        params.extend(self.mlp.parameters_mut());
        params
    }

    fn take_gradients(&mut self) -> Result<Vec<Tensor>, LayerError> {
        let mut grads = self.embedding.take_gradients()?;
        grads.extend(self.fm.take_gradients()?);
        grads.extend(self.mlp.take_gradients()?);
        self.cached_batch = None;
        Ok(grads)
    }

    fn name(&self) -> &str {
        "DeepFm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_model() -> DeepFm {
        DeepFmConfig::new(20, 3, 4)
            .with_hidden_sizes(vec![8, 4])
            .build()
            .unwrap()
    }

    fn tokens() -> Tensor {
        Tensor::from_data(&[2, 3], vec![0.0, 3.0, 7.0, 1.0, 2.0, 20.0])
    }

    #[test]
    fn test_init_shapes() {
        let model = DeepFmConfig::new(500, 10, 5).build().unwrap();
        assert_eq!(model.embedding().weights().shape(), &[501, 5]);
        assert_eq!(model.fm().w().shape(), &[50, 1]);
        assert_eq!(model.fm().v().shape(), &[50, 5]);
        assert_eq!(model.fm().bias(), 0.0);

        let sizes: Vec<_> = model
            .mlp()
            .layers()
            .iter()
            .map(|l| l.weights().shape().to_vec())
            .collect();
        assert_eq!(sizes.first().unwrap(), &vec![50, 128]);
        assert_eq!(sizes.last().unwrap(), &vec![32, 1]);
        assert_eq!(sizes.len(), 7);
        assert_eq!(model.num_fields(), 10);
    }

    #[test]
    fn test_same_seeds_same_model() {
        let a = small_model();
        let b = small_model();
        assert_eq!(a.parameters(), b.parameters());

        let c = DeepFmConfig::new(20, 3, 4)
            .with_hidden_sizes(vec![8, 4])
            .with_seeds((1, 2, 3))
            .build()
            .unwrap();
        assert_ne!(a.embedding().weights(), c.embedding().weights());
    }

    #[test]
    fn test_probabilities_bounded() {
        let probs = small_model().predict(&tokens()).unwrap();
        assert_eq!(probs.shape(), &[2, 1]);
        assert!(probs.data().iter().all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_oversized_tables_rejected() {
        let exact = 1usize << f32::MANTISSA_DIGITS;
        assert!(DeepFmConfig::new(exact, 3, 1).validate().is_ok());

        for config in [
            DeepFmConfig::new(exact + 1, 3, 1),
            DeepFmConfig::new(usize::MAX, 3, 5),
            DeepFmConfig::new(10, 3, usize::MAX),
            DeepFmConfig::new(10, usize::MAX, 2),
        ] {
            assert!(matches!(
                config.build(),
                Err(LayerError::ConfigError { .. })
            ));
        }
    }

    #[test]
    fn test_wrong_column_count() {
        let model = small_model();
        let bad = Tensor::from_data(&[1, 2], vec![0.0, 1.0]);
        assert!(matches!(
            model.predict(&bad),
            Err(LayerError::InvalidInputDimension { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_gradients_cover_every_parameter() {
        let mut model = small_model();
        let probs = model.forward_train(&tokens()).unwrap();
        model
            .backward_bce(&probs, &Tensor::from_data(&[2], vec![1.0, 0.0]))
            .unwrap();
        let grads = model.take_gradients().unwrap();
        let params = model.parameters();
        assert_eq!(grads.len(), params.len());
        for (g, p) in grads.iter().zip(params) {
            assert_eq!(g.shape(), p.shape());
        }
    }

    #[test]
    fn test_gradient_step_reduces_loss() {
        let mut model = small_model();
        let t = tokens();
        let labels = Tensor::from_data(&[2], vec![1.0, 0.0]);
        let bce = |p: &Tensor| -> f32 {
            let y = [1.0f32, 0.0];
            -p.data()
                .iter()
                .zip(y)
                .map(|(&p, y)| y * p.ln() + (1.0 - y) * (1.0 - p).ln())
                .sum::<f32>()
                / 2.0
        };

        let before = bce(&model.predict(&t).unwrap());
        let probs = model.forward_train(&t).unwrap();
        model.backward_bce(&probs, &labels).unwrap();
        let grads = model.take_gradients().unwrap();
        for (p, g) in model.parameters_mut().into_iter().zip(grads) {
            for (w, d) in p.data_mut().iter_mut().zip(g.data()) {
                *w -= 0.05 * d;
            }
        }
        let after = bce(&model.predict(&t).unwrap());
        assert!(after < before, "loss {} did not drop below {}", after, before);
    }

    #[test]
    fn test_serialized_tree_shape() {
        let json = serde_json::to_value(small_model()).unwrap();
        assert!(json["embedding"]["embedding_weights"].is_object());
        assert!(json["fm"]["V"].is_object());
        assert!(json["fm"]["bias"].is_object());
        assert_eq!(json["mlp"]["layers"].as_array().unwrap().len(), 3);
    }
}
