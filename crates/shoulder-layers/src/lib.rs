//! Neural network layers for the Shoulder event recommender.
//!
//! This crate provides the building blocks of the DeepFM attendance model:
//!
//! - **Tensor**: a small row-major `f32` tensor backed by `ndarray` for matmul
//! - **Embeddings**: one dense table shared by every token column
//! - **FM**: factorization machine over the embedded representation
//! - **MLP**: dense layers with ReLU between them
//! - **DeepFM**: the sum of both heads squashed by a sigmoid
//!
//! # Quick Start
//!
//! ```
//! use shoulder_layers::prelude::*;
//!
//! let model = DeepFmConfig::new(40, 4, 5)
//!     .with_hidden_sizes(vec![16, 8])
//!     .build()
//!     .unwrap();
//!
//! let tokens = Tensor::from_data(&[1, 4], vec![0.0, 3.0, 4.0, 12.0]);
//! let probs = model.predict(&tokens).unwrap();
//! assert_eq!(probs.shape(), &[1, 1]);
//! ```
//!
//! # Layer Trait
//!
//! All trainable components implement the [`Layer`] trait, which provides a
//! unified interface for forward and backward passes:
//!
//! ```
//! use shoulder_layers::prelude::*;
//!
//! fn process_layer<L: Layer>(layer: &L, input: &Tensor) -> Tensor {
//!     layer.forward(input).unwrap()
//! }
//! ```

pub mod activation;
pub mod deepfm;
pub mod dense;
pub mod embedding;
pub mod error;
pub mod fm;
pub mod initializer;
pub mod layer;
pub mod mlp;
pub mod tensor;

pub use deepfm::{DeepFm, DeepFmConfig, InitSeeds};
pub use error::{LayerError, LayerResult};
pub use layer::Layer;
pub use tensor::Tensor;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::activation::{sigmoid, ReLU, Sigmoid, PROBABILITY_EPSILON};
    pub use crate::deepfm::{DeepFm, DeepFmConfig, InitSeeds, DEFAULT_HIDDEN_SIZES};
    pub use crate::dense::Dense;
    pub use crate::embedding::EmbeddingTable;
    pub use crate::error::LayerError;
    pub use crate::fm::FactorizationMachine;
    pub use crate::initializer::Initializer;
    pub use crate::layer::Layer;
    pub use crate::mlp::MLP;
    pub use crate::tensor::Tensor;
}
