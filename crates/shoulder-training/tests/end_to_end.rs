use shoulder_data::{encode, parse_records, EncodeMode};
use shoulder_training::{
    finetune, pretrain, recommend, sanitize_probabilities, top_k, ErrorCategory, ModelPaths,
    Predictor, TrainingConfig,
};

const LABELED: &str = r#"[
    {"id": 1, "user_id": 0, "fieldB": true,  "fieldA": false, "attended_event": true},
    {"id": 2, "user_id": 1, "fieldA": true,  "fieldB": false, "attended_event": 0},
    {"id": 3, "user_id": 2, "fieldA": true,  "fieldB": true,  "attended_event": 1},
    {"id": 4, "user_id": 3, "fieldA": false, "fieldB": null,  "attended_event": false}
]"#;

const CANDIDATES: &str = r#"[
    {"id": 10, "user_id": 0, "event_id": 5, "fieldA": true,  "fieldB": true},
    {"id": 11, "user_id": 3, "event_id": 6, "fieldA": false, "fieldB": false},
    {"id": 12, "user_id": 1, "event_id": 7, "fieldA": true,  "fieldB": false}
]"#;

fn config() -> TrainingConfig {
    TrainingConfig::pretrain()
        .with_batch_size(2)
        .with_num_epochs(3)
        .with_hidden_sizes(vec![8])
}

#[test]
fn test_example_records_encode_to_expected_tokens() {
    let records = parse_records(LABELED).unwrap();
    let encoded = encode(&records, EncodeMode::Training).unwrap();

    assert_eq!(encoded.schema.fields(), ["fieldA", "fieldB"]);
    assert_eq!(encoded.features.shape(), &[4, 3]);
    assert_eq!(encoded.features.row(0), &[0.0, 3.0, 4.0]);
    assert_eq!(encoded.features.row(1), &[1.0, 2.0, 5.0]);
    assert_eq!(encoded.features.row(2), &[1.0, 3.0, 6.0]);
    assert_eq!(encoded.features.row(3), &[0.0, 2.0, 7.0]);
    assert_eq!(
        encoded.labels.unwrap().data(),
        &[1.0, 0.0, 1.0, 0.0]
    );
}

#[test]
fn test_pretrain_finetune_recommend() {
    let tmp = tempfile::tempdir().unwrap();
    let weights = tmp.path().join("weights.json");
    let labeled = parse_records(LABELED).unwrap();

    let report = pretrain(&labeled, &config(), &weights).unwrap();
    assert_eq!(report.epochs, vec![0, 1, 2]);
    assert_eq!(report.losses.len(), 3);
    assert_eq!(report.accuracies.len(), 3);

    let retrained = finetune(&labeled, &config(), &ModelPaths::in_place(&weights)).unwrap();
    assert_eq!(retrained.len(), 3);

    let predictor = Predictor::from_checkpoint(&weights).unwrap();
    let candidates = parse_records(CANDIDATES).unwrap();
    let probs = recommend(&candidates, &predictor).unwrap();
    assert_eq!(probs.len(), 3);
    assert!(probs.iter().all(|&p| p > 0.0 && p < 1.0));

    let ranked = top_k(&sanitize_probabilities(&probs, 0.5), 2);
    assert_eq!(ranked.len(), 2);
    assert!(probs[ranked[0]] >= probs[ranked[1]]);
}

#[test]
fn test_failures_are_categorized() {
    let tmp = tempfile::tempdir().unwrap();
    let weights = tmp.path().join("weights.json");

    let missing = Predictor::from_checkpoint(&weights).unwrap_err();
    assert_eq!(missing.category(), ErrorCategory::Storage);

    let no_label = parse_records(CANDIDATES).unwrap();
    let err = pretrain(&no_label, &config(), &weights).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Schema);

    let labeled = parse_records(LABELED).unwrap();
    pretrain(&labeled, &config(), &weights).unwrap();
    let predictor = Predictor::from_checkpoint(&weights).unwrap();

    let wider = parse_records(
        r#"[{"id": 1, "user_id": 0, "fieldA": true, "fieldB": true, "fieldC": false}]"#,
    )
    .unwrap();
    let err = recommend(&wider, &predictor).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Schema);

    let unseen_user = parse_records(
        r#"[{"id": 1, "user_id": 99, "fieldA": true, "fieldB": true}]"#,
    )
    .unwrap();
    let err = recommend(&unseen_user, &predictor).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Vocabulary);

    let mixed = parse_records(
        r#"[
            {"id": 1, "user_id": 0, "fieldA": true, "fieldB": true, "attended_event": true},
            {"id": 2, "user_id": 1, "fieldA": true, "attended_event": false}
        ]"#,
    )
    .unwrap();
    let err = finetune(&mixed, &config(), &ModelPaths::in_place(&weights)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Schema);
}
