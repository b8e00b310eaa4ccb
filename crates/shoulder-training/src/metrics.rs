//! Training metrics collection and recording.
//!
//! [`Metrics`] describes one batch or one epoch; [`MetricsRecorder`] averages
//! batch metrics into the per-epoch figures the trainer reports.

use serde::{Deserialize, Serialize};

/// Loss and accuracy for a batch or an epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean binary cross-entropy.
    pub loss: f32,
    /// Classification accuracy at the 0.5 threshold (0.0 to 1.0).
    pub accuracy: f32,
}

impl Metrics {
    /// Creates a new `Metrics` instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use shoulder_training::metrics::Metrics;
    ///
    /// let metrics = Metrics::new(0.5, 0.75);
    /// assert_eq!(metrics.loss, 0.5);
    /// ```
    pub fn new(loss: f32, accuracy: f32) -> Self {
        Self { loss, accuracy }
    }
}

/// Accumulates batch metrics over an epoch.
///
/// Averages are unweighted across batches, so a short final batch counts as
/// much as a full one.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    loss_sum: f64,
    accuracy_sum: f64,
    count: u64,
}

impl MetricsRecorder {
    /// Creates a new empty `MetricsRecorder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one batch.
    ///
    /// # Examples
    ///
    /// ```
    /// use shoulder_training::metrics::{Metrics, MetricsRecorder};
    ///
    /// let mut recorder = MetricsRecorder::new();
    /// recorder.record(&Metrics::new(0.5, 0.8));
    /// recorder.record(&Metrics::new(0.3, 0.9));
    ///
    /// let avg = recorder.aggregate();
    /// assert!((avg.loss - 0.4).abs() < 1e-6);
    /// assert!((avg.accuracy - 0.85).abs() < 1e-6);
    /// ```
    pub fn record(&mut self, metrics: &Metrics) {
        self.loss_sum += f64::from(metrics.loss);
        self.accuracy_sum += f64::from(metrics.accuracy);
        self.count += 1;
    }

    /// Returns the number of batches recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of everything recorded; zeros if nothing was.
    pub fn aggregate(&self) -> Metrics {
        if self.count == 0 {
            return Metrics::default();
        }
        let n = self.count as f64;
        Metrics::new((self.loss_sum / n) as f32, (self.accuracy_sum / n) as f32)
    }

    /// Resets the recorder to its initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_recorder() {
        let recorder = MetricsRecorder::new();
        assert_eq!(recorder.count(), 0);
        assert_eq!(recorder.aggregate(), Metrics::default());
    }

    #[test]
    fn test_nan_loss_propagates() {
        let mut recorder = MetricsRecorder::new();
        recorder.record(&Metrics::new(0.2, 1.0));
        recorder.record(&Metrics::new(f32::NAN, 0.0));
        assert!(recorder.aggregate().loss.is_nan());
    }

    #[test]
    fn test_reset() {
        let mut recorder = MetricsRecorder::new();
        recorder.record(&Metrics::new(1.0, 1.0));
        recorder.reset();
        assert_eq!(recorder.count(), 0);
    }
}
