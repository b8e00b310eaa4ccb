//! Seeded weight initialization.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// Strategy for filling a freshly created parameter tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    /// Glorot/Xavier uniform initialization, reproducible from `seed`.
    GlorotUniform {
        /// Seed for the random stream.
        seed: u64,
    },
    /// All zeros.
    Zeros,
}

impl Initializer {
    /// Initializes a tensor, taking fans from the first two dimensions.
    pub fn initialize(&self, shape: &[usize]) -> Tensor {
        let (fan_in, fan_out) = fan_in_out(shape);
        self.initialize_with_fans(shape, fan_in, fan_out)
    }

    /// Initializes a tensor with explicit fan-in and fan-out.
    ///
    /// The embedding table scales by its vocabulary size rather than its row
    /// count, so it passes fans directly.
    pub fn initialize_with_fans(&self, shape: &[usize], fan_in: usize, fan_out: usize) -> Tensor {
        match self {
            Initializer::Zeros => Tensor::zeros(shape),
            Initializer::GlorotUniform { seed } => {
                let limit = (6.0 / (fan_in.max(1) + fan_out.max(1)) as f32).sqrt();
                let numel: usize = shape.iter().product();
                let mut rng = StdRng::seed_from_u64(*seed);
                let dist = Uniform::new_inclusive(-limit, limit);
                let data = (0..numel).map(|_| dist.sample(&mut rng)).collect();
                Tensor::from_data(shape, data)
            }
        }
    }
}

fn fan_in_out(shape: &[usize]) -> (usize, usize) {
    if shape.len() >= 2 {
        (shape[0].max(1), shape[1].max(1))
    } else if shape.len() == 1 {
        let dim = shape[0].max(1);
        (dim, dim)
    } else {
        (1, 1)
    }
}

/// Derives the `index`-th child seed from a parent seed.
///
/// Layers that own several parameter tensors draw each from its own stream so
/// that adding a tensor never reshuffles the values of the others.
pub fn split_seed(seed: u64, index: u64) -> u64 {
    // splitmix64 finalizer
    let mut z = seed
        .wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glorot_shape_and_bounds() {
        let t = Initializer::GlorotUniform { seed: 22 }.initialize(&[5, 5]);
        assert_eq!(t.shape(), &[5, 5]);
        let limit = (6.0f32 / 10.0).sqrt();
        assert!(t.data().iter().all(|x| x.abs() <= limit));
    }

    #[test]
    fn test_glorot_is_reproducible() {
        let a = Initializer::GlorotUniform { seed: 7 }.initialize(&[4, 3]);
        let b = Initializer::GlorotUniform { seed: 7 }.initialize(&[4, 3]);
        let c = Initializer::GlorotUniform { seed: 8 }.initialize(&[4, 3]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_explicit_fans() {
        let t = Initializer::GlorotUniform { seed: 1 }.initialize_with_fans(&[11, 5], 10, 5);
        let limit = (6.0f32 / 15.0).sqrt();
        assert!(t.data().iter().all(|x| x.abs() <= limit));
    }

    #[test]
    fn test_zeros() {
        let t = Initializer::Zeros.initialize(&[3]);
        assert_eq!(t.data(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_split_seed_distinct() {
        assert_ne!(split_seed(8, 0), split_seed(8, 1));
        assert_eq!(split_seed(8, 0), split_seed(8, 0));
    }
}
