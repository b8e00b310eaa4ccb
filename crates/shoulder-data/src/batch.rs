//! Seeded mini-batching over an encoded dataset.
//!
//! [`BatchSource`] permutes row order once per epoch from `seed` and the
//! epoch index, then hands out contiguous slices of that permutation.
//!
//! # Example
//!
//! ```
//! use shoulder_data::batch::BatchSource;
//! use shoulder_layers::Tensor;
//!
//! let features = Tensor::from_data(&[5, 1], vec![0.0, 1.0, 2.0, 3.0, 4.0]);
//! let labels = Tensor::from_data(&[5, 1], vec![0.0, 1.0, 0.0, 1.0, 0.0]);
//! let source = BatchSource::new(features, labels, 2, 1994).unwrap();
//!
//! assert_eq!(source.num_batches(), 3);
//! let sizes: Vec<_> = source.batches(0).map(|b| b.len()).collect();
//! assert_eq!(sizes, vec![2, 2, 1]);
//! ```

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shoulder_layers::Tensor;

use crate::encoder::EncodedDataset;
use crate::error::{DataError, Result};

/// A batch of examples.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Token rows of shape [len, columns].
    pub features: Tensor,
    /// Labels of shape [len, 1].
    pub labels: Tensor,
}

impl Batch {
    /// Returns the number of examples in this batch.
    pub fn len(&self) -> usize {
        self.features.rows()
    }

    /// Returns `true` if this batch contains no examples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns the feature and label matrices and produces shuffled batches.
///
/// The source never mutates its data; each call to [`BatchSource::batches`]
/// re-derives the same order for the same epoch.
#[derive(Debug, Clone)]
pub struct BatchSource {
    features: Tensor,
    labels: Tensor,
    batch_size: usize,
    seed: u64,
}

impl BatchSource {
    /// Creates a batch source.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidBatchConfig`] for a zero batch size or
    /// when features and labels disagree on row count.
    pub fn new(features: Tensor, labels: Tensor, batch_size: usize, seed: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(DataError::InvalidBatchConfig(
                "batch_size must be positive".to_string(),
            ));
        }
        if features.ndim() != 2 || labels.numel() != features.shape()[0] {
            return Err(DataError::InvalidBatchConfig(format!(
                "features {:?} and labels {:?} disagree on row count",
                features.shape(),
                labels.shape()
            )));
        }
        let rows = features.shape()[0];
        Ok(Self {
            features,
            labels: labels.reshape(&[rows, 1]),
            batch_size,
            seed,
        })
    }

    /// Builds a source from a training-mode encoding.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingLabels`] for an inference-mode dataset.
    pub fn from_dataset(dataset: &EncodedDataset, batch_size: usize, seed: u64) -> Result<Self> {
        let labels = dataset.labels.clone().ok_or(DataError::MissingLabels)?;
        Self::new(dataset.features.clone(), labels, batch_size, seed)
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.features.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// `ceil(len / batch_size)`.
    pub fn num_batches(&self) -> usize {
        (self.len() + self.batch_size - 1) / self.batch_size
    }

    /// Row permutation used for `epoch`.
    pub fn permutation(&self, epoch: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        let mut rng = StdRng::seed_from_u64(epoch_seed(self.seed, epoch));
        order.shuffle(&mut rng);
        order
    }

    /// Lazily yields the batches of `epoch`.
    pub fn batches(&self, epoch: usize) -> Batches<'_> {
        Batches {
            source: self,
            order: self.permutation(epoch),
            cursor: 0,
        }
    }
}

fn epoch_seed(seed: u64, epoch: usize) -> u64 {
    // Avalanche the epoch so consecutive epochs land far apart.
    let mut z = (epoch as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    seed ^ (z ^ (z >> 31))
}

/// Iterator over one epoch's batches.
#[derive(Debug)]
pub struct Batches<'a> {
    source: &'a BatchSource,
    order: Vec<usize>,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.source.batch_size).min(self.order.len());
        let rows = &self.order[self.cursor..end];
        self.cursor = end;
        Some(Batch {
            features: self.source.features.select_rows(rows),
            labels: self.source.labels.select_rows(rows),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.order.len() - self.cursor;
        let n = (remaining + self.source.batch_size - 1) / self.source.batch_size;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Batches<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(n: usize, batch_size: usize, seed: u64) -> BatchSource {
        let features = Tensor::from_data(&[n, 1], (0..n).map(|i| i as f32).collect());
        let labels = Tensor::from_data(&[n], (0..n).map(|i| (i % 2) as f32).collect());
        BatchSource::new(features, labels, batch_size, seed).unwrap()
    }

    fn rows_seen(source: &BatchSource, epoch: usize) -> Vec<usize> {
        source
            .batches(epoch)
            .flat_map(|b| b.features.into_data())
            .map(|v| v as usize)
            .collect()
    }

    #[test]
    fn test_every_row_exactly_once() {
        let source = source(10, 3, 7);
        assert_eq!(source.num_batches(), 4);
        let sizes: Vec<_> = source.batches(0).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);

        let mut seen = rows_seen(&source, 0);
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_labels_follow_rows() {
        let source = source(9, 4, 3);
        for batch in source.batches(2) {
            for (f, l) in batch.features.data().iter().zip(batch.labels.data()) {
                assert_eq!((*f as usize % 2) as f32, *l);
            }
        }
    }

    #[test]
    fn test_deterministic_per_epoch() {
        let a = source(20, 6, 1994);
        let b = source(20, 6, 1994);
        assert_eq!(rows_seen(&a, 3), rows_seen(&b, 3));
        assert_eq!(rows_seen(&a, 3), rows_seen(&a, 3));
        assert_ne!(rows_seen(&a, 0), rows_seen(&a, 1));
    }

    #[test]
    fn test_exact_size() {
        let source = source(7, 2, 0);
        let mut it = source.batches(0);
        assert_eq!(it.len(), 4);
        it.next();
        assert_eq!(it.len(), 3);
    }

    #[test]
    fn test_invalid_config() {
        let f = Tensor::zeros(&[3, 2]);
        assert!(BatchSource::new(f.clone(), Tensor::zeros(&[3]), 0, 1).is_err());
        assert!(BatchSource::new(f, Tensor::zeros(&[2]), 2, 1).is_err());
    }

    #[test]
    fn test_empty_source_yields_nothing() {
        let source = BatchSource::new(Tensor::zeros(&[0, 1]), Tensor::zeros(&[0, 1]), 4, 1).unwrap();
        assert_eq!(source.num_batches(), 0);
        assert_eq!(source.batches(0).count(), 0);
    }
}
