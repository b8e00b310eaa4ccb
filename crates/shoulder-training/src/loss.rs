//! Binary cross-entropy and thresholded accuracy.

use shoulder_layers::activation::PROBABILITY_EPSILON;
use shoulder_layers::Tensor;

/// Decision threshold for counting a prediction as "attends".
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Mean binary cross-entropy of `probs` against 0/1 `labels`.
///
/// Probabilities are clamped to `[eps, 1 - eps]` so a saturated prediction
/// yields a large finite loss. NaN probabilities propagate into the loss.
/// An empty batch has loss `0.0`. Only the overlapping prefix is scored if
/// the lengths differ.
pub fn binary_cross_entropy(probs: &Tensor, labels: &Tensor) -> f32 {
    debug_assert_eq!(probs.numel(), labels.numel(), "probs and labels differ in length");
    let n = probs.numel().min(labels.numel());
    if n == 0 {
        return 0.0;
    }
    let total: f32 = probs
        .data()
        .iter()
        .zip(labels.data())
        .map(|(&p, &y)| {
            let p = p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / n as f32
}

/// Fraction of rows whose thresholded prediction equals the label.
pub fn accuracy(probs: &Tensor, labels: &Tensor) -> f32 {
    debug_assert_eq!(probs.numel(), labels.numel(), "probs and labels differ in length");
    let n = probs.numel().min(labels.numel());
    if n == 0 {
        return 0.0;
    }
    let correct = probs
        .data()
        .iter()
        .zip(labels.data())
        .filter(|(&p, &y)| (p >= DECISION_THRESHOLD) == (y >= DECISION_THRESHOLD))
        .count();
    correct as f32 / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(values: &[f32]) -> Tensor {
        Tensor::from_data(&[values.len(), 1], values.to_vec())
    }

    #[test]
    fn test_bce_known_value() {
        let loss = binary_cross_entropy(&t(&[0.5, 0.5]), &t(&[1.0, 0.0]));
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn test_bce_saturated_is_finite() {
        let loss = binary_cross_entropy(&t(&[0.0, 1.0]), &t(&[1.0, 0.0]));
        assert!(loss.is_finite());
        assert!(loss > 10.0);
    }

    #[test]
    fn test_bce_nan_propagates() {
        assert!(binary_cross_entropy(&t(&[f32::NAN]), &t(&[1.0])).is_nan());
    }

    #[test]
    fn test_accuracy() {
        let acc = accuracy(&t(&[0.9, 0.2, 0.6, 0.4]), &t(&[1.0, 0.0, 0.0, 0.0]));
        assert!((acc - 0.75).abs() < 1e-6);
        assert_eq!(accuracy(&t(&[]), &t(&[])), 0.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "differ in length")]
    fn test_length_mismatch_checked_in_debug() {
        binary_cross_entropy(&t(&[0.5, 0.5]), &t(&[1.0]));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_length_mismatch_scores_overlap() {
        assert_eq!(accuracy(&t(&[0.9, 0.1]), &t(&[1.0])), 1.0);
    }
}
