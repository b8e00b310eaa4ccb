//! The three entry points callers drive: train from scratch, retrain from
//! persisted weights, and score records for recommendation.
//!
//! Plus a couple of caller-side helpers for turning raw probabilities into a
//! ranked list.

use shoulder_checkpoint::{checkpointer_for_path, Checkpointer, ModelState};
use shoulder_data::{encode, BatchSource, EncodeMode, RawRecord};
use shoulder_layers::DeepFmConfig;
use std::cmp::Ordering;
use std::path::Path;

use crate::config::{ModelPaths, TrainingConfig};
use crate::error::{Result, TrainingError};
use crate::predictor::Predictor;
use crate::trainer::{Trainer, TrainingReport};

/// Trains a freshly initialized model on labeled records and persists it to
/// `persist_path`, replacing whatever was there.
///
/// The embedding table is sized from the largest token in `records`, so a
/// later finetune or recommend call can only reference users seen here.
///
/// # Errors
///
/// Schema errors for malformed records, [`TrainingError::EmptyDataset`] for
/// an empty list, configuration errors for bad hyperparameters, and storage
/// errors when the weights cannot be written.
pub fn pretrain(
    records: &[RawRecord],
    config: &TrainingConfig,
    persist_path: impl AsRef<Path>,
) -> Result<TrainingReport> {
    config.validate()?;
    let dataset = encode(records, EncodeMode::Training)?;
    if dataset.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    let source = BatchSource::from_dataset(&dataset, config.batch_size, config.shuffle_seed)?;

    let model = DeepFmConfig::new(
        dataset.max_token(),
        dataset.schema.num_columns(),
        config.num_factors,
    )
    .with_hidden_sizes(config.hidden_sizes.clone())
    .with_seeds(config.init_seeds)
    .build()?;

    tracing::info!(
        rows = dataset.len(),
        fields = dataset.schema.num_fields(),
        vocab_rows = model.vocab_rows(),
        "Pretraining from scratch"
    );

    let trainer = Trainer::new(config.optimizer.clone(), config.num_epochs)?;
    let state = ModelState::new(dataset.schema, model);
    let (report, _) = trainer.train(state, &source, persist_path.as_ref())?;
    Ok(report)
}

/// Continues training persisted weights on new labeled records.
///
/// Reads from `paths.load_path` and writes to `paths.persist_path`. The
/// records must carry exactly the fields the weights were trained on, and
/// every token must fit the loaded embedding table; the table never grows.
///
/// # Errors
///
/// Storage errors if no weights exist at the load path, `SchemaMismatch` for
/// a different field list, `OutOfVocabulary` for unseen users, plus
/// everything [`pretrain`] can return.
pub fn finetune(
    records: &[RawRecord],
    config: &TrainingConfig,
    paths: &ModelPaths,
) -> Result<TrainingReport> {
    config.validate()?;
    let state = checkpointer_for_path(&paths.load_path).restore(&paths.load_path)?;

    let dataset = encode(records, EncodeMode::Training)?;
    if dataset.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    state.schema.ensure_matches(&dataset.schema)?;
    state.model.embedding().token_indices(&dataset.features)?;

    let source = BatchSource::from_dataset(&dataset, config.batch_size, config.shuffle_seed)?;
    tracing::info!(
        rows = dataset.len(),
        load = %paths.load_path.display(),
        "Finetuning persisted weights"
    );

    let trainer = Trainer::new(config.optimizer.clone(), config.num_epochs)?;
    let (report, _) = trainer.train(state, &source, &paths.persist_path)?;
    Ok(report)
}

/// Attendance probabilities for unlabeled records, one per row in input
/// order.
///
/// Values are reported as computed; see [`ensure_finite_probabilities`] and
/// [`sanitize_probabilities`] for callers that need clean numbers.
pub fn recommend(records: &[RawRecord], predictor: &Predictor) -> Result<Vec<f32>> {
    let probs = predictor.predict_records(records)?;
    tracing::debug!(rows = probs.len(), "Scored records");
    Ok(probs)
}

/// Fails on the first NaN or infinite probability.
pub fn ensure_finite_probabilities(probs: &[f32]) -> Result<()> {
    match probs.iter().enumerate().find(|(_, p)| !p.is_finite()) {
        Some((row, &value)) => Err(TrainingError::NonFiniteProbability { row, value }),
        None => Ok(()),
    }
}

/// Replaces NaN and infinite probabilities with `neutral`.
pub fn sanitize_probabilities(probs: &[f32], neutral: f32) -> Vec<f32> {
    probs
        .iter()
        .map(|&p| if p.is_finite() { p } else { neutral })
        .collect()
}

/// Row indices of the `k` highest probabilities, best first.
///
/// Ties keep input order and NaN ranks below every number.
///
/// ```
/// use shoulder_training::top_k;
///
/// assert_eq!(top_k(&[0.2, 0.9, f32::NAN, 0.5], 3), vec![1, 3, 0]);
/// ```
pub fn top_k(probs: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| descending(probs[a], probs[b]));
    order.truncate(k);
    order
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;
    use shoulder_optimizer::OptimizerConfig;
    use tempfile::tempdir;

    fn record(user: i64, a: bool, attended: Option<bool>) -> RawRecord {
        let record = RawRecord::new()
            .with("id", user)
            .with("user_id", user)
            .with("fieldA", a)
            .with("fieldB", !a);
        match attended {
            Some(label) => record.with("attended_event", label),
            None => record,
        }
    }

    fn labeled() -> Vec<RawRecord> {
        (0..6).map(|i| record(i, i % 2 == 0, Some(i % 2 == 0))).collect()
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig::pretrain()
            .with_batch_size(4)
            .with_num_epochs(2)
            .with_hidden_sizes(vec![8])
            .with_optimizer(OptimizerConfig::Sgd { learning_rate: 0.05 })
    }

    #[test]
    fn test_pretrain_persists_weights() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.json");
        let report = pretrain(&labeled(), &small_config(), &path).unwrap();
        assert_eq!(report.epochs, vec![0, 1]);

        let predictor = Predictor::from_checkpoint(&path).unwrap();
        assert_eq!(predictor.schema().fields(), ["fieldA", "fieldB"]);
        // tokens 0..=3 for the fields, 4 + 5 for the largest user
        assert_eq!(predictor.model().vocab_rows(), 10);
        assert_eq!(
            predictor.state().get_metadata("epochs_trained"),
            Some("2")
        );
    }

    #[test]
    fn test_pretrain_rejects_empty_and_bad_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.json");
        assert!(matches!(
            pretrain(&[], &small_config(), &path),
            Err(TrainingError::EmptyDataset)
        ));
        let err = pretrain(&labeled(), &small_config().with_batch_size(0), &path).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!path.exists());
    }

    #[test]
    fn test_pretrain_rejects_huge_user_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.json");
        for user in [i64::MAX, 100_000_000_000, 1 << 24] {
            let err = pretrain(&[record(user, true, Some(true))], &small_config(), &path)
                .unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Schema);
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_finetune_accumulates_epochs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.json");
        pretrain(&labeled(), &small_config(), &path).unwrap();

        let report = finetune(
            &labeled()[..4],
            &small_config().with_num_epochs(3),
            &ModelPaths::in_place(&path),
        )
        .unwrap();
        assert_eq!(report.len(), 3);
        let predictor = Predictor::from_checkpoint(&path).unwrap();
        assert_eq!(
            predictor.state().get_metadata("epochs_trained"),
            Some("5")
        );
    }

    #[test]
    fn test_finetune_rejects_unseen_user() {
        let dir = tempdir().unwrap();
        let load = dir.path().join("weights.json");
        let persist = dir.path().join("retrained.json");
        pretrain(&labeled(), &small_config(), &load).unwrap();

        let err = finetune(
            &[record(40, true, Some(true))],
            &small_config(),
            &ModelPaths::new(&load, &persist),
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Vocabulary);
        assert!(!persist.exists());
    }

    #[test]
    fn test_finetune_without_weights() {
        let dir = tempdir().unwrap();
        let err = finetune(
            &labeled(),
            &small_config(),
            &ModelPaths::in_place(dir.path().join("missing.json")),
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_recommend_one_probability_per_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.json");
        pretrain(&labeled(), &small_config(), &path).unwrap();
        let predictor = Predictor::from_checkpoint(&path).unwrap();

        let rows: Vec<_> = (0..3).map(|i| record(i, i == 1, None)).collect();
        let probs = recommend(&rows, &predictor).unwrap();
        assert_eq!(probs.len(), 3);
        assert!(ensure_finite_probabilities(&probs).is_ok());
    }

    #[test]
    fn test_probability_helpers() {
        let probs = [0.3, f32::NAN, 0.8, f32::INFINITY];
        assert_eq!(sanitize_probabilities(&probs, 0.5), vec![0.3, 0.5, 0.8, 0.5]);
        assert!(matches!(
            ensure_finite_probabilities(&probs),
            Err(TrainingError::NonFiniteProbability { row: 1, .. })
        ));
        assert_eq!(top_k(&[0.4, 0.7, 0.4], 2), vec![1, 0]);
        assert_eq!(top_k(&[0.1], 5), vec![0]);
        assert!(top_k(&[], 3).is_empty());
    }
}
