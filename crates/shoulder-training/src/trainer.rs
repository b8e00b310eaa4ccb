//! The epoch/batch training loop.
//!
//! For every batch the trainer runs a caching forward pass, computes the
//! binary cross-entropy, back-propagates, and lets one optimizer per
//! parameter tensor update that tensor in place. Once all epochs are done the
//! full [`ModelState`] is written to the persist path.

use serde::{Deserialize, Serialize};
use shoulder_checkpoint::{checkpointer_for_path, Checkpointer, ModelState};
use shoulder_data::BatchSource;
use shoulder_layers::{DeepFm, Layer};
use shoulder_optimizer::{create_optimizer, OptimizerConfig, OptimizerDyn};
use std::path::Path;

use crate::error::{Result, TrainingError};
use crate::loss::{accuracy, binary_cross_entropy};
use crate::metrics::{Metrics, MetricsRecorder};

/// Per-epoch results of a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Epoch indices, `0..num_epochs`.
    pub epochs: Vec<usize>,
    /// Mean batch loss of each epoch.
    pub losses: Vec<f32>,
    /// Mean batch accuracy of each epoch.
    pub accuracies: Vec<f32>,
}

impl TrainingReport {
    fn push(&mut self, epoch: usize, metrics: Metrics) {
        self.epochs.push(epoch);
        self.losses.push(metrics.loss);
        self.accuracies.push(metrics.accuracy);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Loss of the last epoch.
    pub fn final_loss(&self) -> Option<f32> {
        self.losses.last().copied()
    }

    /// Fails on the first NaN or infinite epoch loss.
    ///
    /// The trainer never checks this itself; callers that cannot act on a
    /// diverged model opt in here.
    pub fn ensure_finite(&self) -> Result<()> {
        match self
            .epochs
            .iter()
            .zip(&self.losses)
            .find(|(_, loss)| !loss.is_finite())
        {
            Some((&epoch, &loss)) => Err(TrainingError::NonFiniteLoss { epoch, loss }),
            None => Ok(()),
        }
    }
}

/// Runs the training loop.
///
/// # Example
///
/// ```
/// use shoulder_data::BatchSource;
/// use shoulder_layers::{DeepFmConfig, Tensor};
/// use shoulder_optimizer::OptimizerConfig;
/// use shoulder_training::Trainer;
///
/// let features = Tensor::from_data(&[2, 2], vec![0.0, 3.0, 1.0, 2.0]);
/// let labels = Tensor::from_data(&[2, 1], vec![0.0, 1.0]);
/// let source = BatchSource::new(features, labels, 2, 1994).unwrap();
///
/// let mut model = DeepFmConfig::new(3, 2, 2).with_hidden_sizes(vec![4]).build().unwrap();
/// let trainer = Trainer::new(OptimizerConfig::default(), 3).unwrap();
/// let report = trainer.fit(&mut model, &source).unwrap();
/// assert_eq!(report.epochs, vec![0, 1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct Trainer {
    optimizer: OptimizerConfig,
    num_epochs: usize,
}

impl Trainer {
    /// Creates a trainer.
    ///
    /// # Errors
    ///
    /// Returns an optimizer error for invalid hyperparameters.
    pub fn new(optimizer: OptimizerConfig, num_epochs: usize) -> Result<Self> {
        optimizer.validate()?;
        Ok(Self {
            optimizer,
            num_epochs,
        })
    }

    pub fn num_epochs(&self) -> usize {
        self.num_epochs
    }

    /// Trains `state.model` on `source`, then overwrites `persist_path` with
    /// the updated state.
    ///
    /// Returns the report and the final state.
    ///
    /// # Errors
    ///
    /// - [`TrainingError::EmptyDataset`] if `source` yields no batches
    /// - a layer error for tokens outside the embedding table
    /// - a checkpoint error if the weights cannot be written
    pub fn train(
        &self,
        mut state: ModelState,
        source: &BatchSource,
        persist_path: &Path,
    ) -> Result<(TrainingReport, ModelState)> {
        let report = self.fit(&mut state.model, source)?;

        let trained = state
            .get_metadata("epochs_trained")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        state.set_metadata("epochs_trained", (trained + report.len()).to_string());
        if let Some(loss) = report.final_loss() {
            state.set_metadata("final_loss", loss.to_string());
        }

        checkpointer_for_path(persist_path).save(persist_path, &state)?;
        tracing::info!(path = %persist_path.display(), "Persisted trained parameters");
        Ok((report, state))
    }

    /// Trains `model` in place without persisting anything.
    pub fn fit(&self, model: &mut DeepFm, source: &BatchSource) -> Result<TrainingReport> {
        if source.num_batches() == 0 {
            return Err(TrainingError::EmptyDataset);
        }

        let mut optimizers = self.create_optimizers(model)?;
        let mut report = TrainingReport::default();

        tracing::info!(
            epochs = self.num_epochs,
            examples = source.len(),
            batches = source.num_batches(),
            optimizer = self.optimizer.name(),
            "Starting training"
        );

        for epoch in 0..self.num_epochs {
            let mut recorder = MetricsRecorder::new();
            for (step, batch) in source.batches(epoch).enumerate() {
                let metrics = train_step(model, &mut optimizers, &batch.features, &batch.labels)?;
                tracing::debug!(epoch, step, loss = metrics.loss, "Batch complete");
                recorder.record(&metrics);
            }
            let epoch_metrics = recorder.aggregate();
            tracing::info!(
                epoch,
                loss = epoch_metrics.loss,
                accuracy = epoch_metrics.accuracy,
                "Epoch complete"
            );
            report.push(epoch, epoch_metrics);
        }

        Ok(report)
    }

    fn create_optimizers(&self, model: &DeepFm) -> Result<Vec<Box<dyn OptimizerDyn>>> {
        model
            .parameters()
            .iter()
            .map(|_| create_optimizer(self.optimizer.clone()).map_err(TrainingError::from))
            .collect()
    }
}

fn train_step(
    model: &mut DeepFm,
    optimizers: &mut [Box<dyn OptimizerDyn>],
    features: &shoulder_layers::Tensor,
    labels: &shoulder_layers::Tensor,
) -> Result<Metrics> {
    let probs = model.forward_train(features)?;
    let metrics = Metrics::new(
        binary_cross_entropy(&probs, labels),
        accuracy(&probs, labels),
    );

    model.backward_bce(&probs, labels)?;
    let grads = model.take_gradients()?;
    for ((param, grad), optimizer) in model
        .parameters_mut()
        .into_iter()
        .zip(&grads)
        .zip(optimizers.iter_mut())
    {
        optimizer.apply_gradients(param.data_mut(), grad.data());
    }
    Ok(metrics)
}
