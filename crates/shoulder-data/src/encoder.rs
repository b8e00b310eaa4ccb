//! Raw record → token matrix encoding.
//!
//! Feature fields are sorted alphabetically. The field at position `i` owns
//! the token pair `[2i, 2i + 1]`: false, `null` or `0` encode as `2i`, true
//! or `1` as `2i + 1`. The integer `1` and the boolean `true` therefore
//! produce the same token, as do `0`, `null` and `false`. Each row ends with
//! the user token `2F + user_id`, where `F` is the number of fields.
//!
//! Tokens are stored as `f32` so the matrix feeds straight into the embedding
//! lookup. Every token must stay at or below [`MAX_TOKEN`], the largest range
//! in which `f32` represents each integer exactly.

use serde::{Deserialize, Serialize};
use shoulder_layers::Tensor;
use tracing::debug;

use crate::error::{DataError, Result};
use crate::record::{FieldValue, RawRecord, ID_FIELD, LABEL_FIELD, USER_ID_FIELD};

/// Largest token the encoder emits: `2^24`. Above it neighbouring integers
/// round to the same `f32` and distinct users would share an embedding row.
pub const MAX_TOKEN: u64 = 1 << f32::MANTISSA_DIGITS;

/// Whether labels are required and extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    Training,
    Inference,
}

/// Sorted list of feature fields a token matrix was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    fields: Vec<String>,
}

impl FeatureSchema {
    /// Builds a schema, sorting the field names.
    pub fn new(mut fields: Vec<String>) -> Self {
        fields.sort();
        fields.dedup();
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of feature fields (`F`), excluding the user token.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Token columns per row: every field plus the user token.
    pub fn num_columns(&self) -> usize {
        self.fields.len() + 1
    }

    /// Token of field `position` holding `value`.
    pub fn field_token(&self, position: usize, value: bool) -> u64 {
        2 * position as u64 + u64::from(value)
    }

    /// First token past every field token; user tokens start here.
    pub fn user_offset(&self) -> u64 {
        2 * self.fields.len() as u64
    }

    /// Token for a user identity: `2F + user_id`.
    pub fn user_token(&self, user_id: u64) -> u64 {
        self.user_offset() + user_id
    }

    /// Fails with [`DataError::SchemaMismatch`] unless `other` has exactly
    /// the same fields.
    pub fn ensure_matches(&self, other: &FeatureSchema) -> Result<()> {
        if self.fields != other.fields {
            return Err(DataError::SchemaMismatch {
                expected: self.fields.clone(),
                actual: other.fields.clone(),
            });
        }
        Ok(())
    }
}

/// Output of [`encode`].
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    pub schema: FeatureSchema,
    /// Token matrix of shape [rows, F + 1].
    pub features: Tensor,
    /// Labels of shape [rows, 1] in training mode.
    pub labels: Option<Tensor>,
    pub user_ids: Vec<u64>,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.features.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest token in the matrix; the embedding table needs `max + 1` rows.
    pub fn max_token(&self) -> usize {
        self.features
            .data()
            .iter()
            .fold(0.0f32, |acc, &t| acc.max(t)) as usize
    }
}

/// Encodes `records` into a token matrix, leaving the input untouched.
///
/// # Errors
///
/// - [`DataError::MissingField`] when `id`, `user_id` or, in training mode,
///   `attended_event` is absent
/// - [`DataError::InconsistentSchema`] when records disagree on their fields
/// - [`DataError::InvalidFieldValue`] for indicators other than booleans,
///   `null`, `0` or `1`, for negative or non-integer user ids, and for user
///   ids whose token would exceed [`MAX_TOKEN`]
pub fn encode(records: &[RawRecord], mode: EncodeMode) -> Result<EncodedDataset> {
    let schema = FeatureSchema::new(
        records
            .first()
            .map(RawRecord::feature_names)
            .unwrap_or_default(),
    );
    let columns = schema.num_columns();

    let mut tokens = Vec::with_capacity(records.len() * columns);
    let mut labels = Vec::new();
    let mut user_ids = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        if !record.contains(ID_FIELD) {
            return Err(DataError::MissingField {
                record: index,
                field: ID_FIELD.to_string(),
            });
        }
        let user_id = record.user_id(index)?;
        if mode == EncodeMode::Training {
            labels.push(if record.label(index)? { 1.0 } else { 0.0 });
        }

        let names = record.feature_names();
        if names != schema.fields() {
            return Err(DataError::InconsistentSchema {
                record: index,
                expected: schema.fields().to_vec(),
                actual: names,
            });
        }

        for (position, name) in schema.fields().iter().enumerate() {
            let value = record.get(name).copied().unwrap_or(FieldValue::Null);
            let flag = value
                .as_indicator()
                .ok_or_else(|| DataError::InvalidFieldValue {
                    record: index,
                    field: name.clone(),
                    value: value.to_string(),
                })?;
            tokens.push(schema.field_token(position, flag) as f32);
        }
        let user_token = schema
            .user_offset()
            .checked_add(user_id)
            .filter(|&token| token <= MAX_TOKEN)
            .ok_or_else(|| DataError::InvalidFieldValue {
                record: index,
                field: USER_ID_FIELD.to_string(),
                value: user_id.to_string(),
            })?;
        tokens.push(user_token as f32);
        user_ids.push(user_id);
    }

    let features = Tensor::from_data(&[records.len(), columns], tokens);
    let labels = match mode {
        EncodeMode::Training => Some(Tensor::from_data(&[records.len(), 1], labels)),
        EncodeMode::Inference => None,
    };

    let dataset = EncodedDataset {
        schema,
        features,
        labels,
        user_ids,
    };
    debug!(
        rows = dataset.len(),
        fields = dataset.schema.num_fields(),
        max_token = dataset.max_token(),
        "Encoded records"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_records;

    fn record(id: i64, user: i64, a: bool, b: bool) -> RawRecord {
        RawRecord::new()
            .with(ID_FIELD, id)
            .with(USER_ID_FIELD, user)
            .with("a", a)
            .with("b", b)
    }

    #[test]
    fn test_single_false_field_example() {
        let records = vec![RawRecord::new()
            .with(ID_FIELD, 9i64)
            .with(USER_ID_FIELD, 2i64)
            .with("f", false)
            .with(LABEL_FIELD, true)];
        let encoded = encode(&records, EncodeMode::Training).unwrap();
        assert_eq!(encoded.features.shape(), &[1, 2]);
        // F = 1: field token 0, user token 2 * 1 + 2
        assert_eq!(encoded.features.data(), &[0.0, 4.0]);
        assert_eq!(encoded.labels.unwrap().data(), &[1.0]);
    }

    #[test]
    fn test_field_order_is_alphabetical() {
        let records = vec![RawRecord::new()
            .with(ID_FIELD, 1i64)
            .with(USER_ID_FIELD, 0i64)
            .with("zeta", true)
            .with("alpha", false)
            .with("event_id", 44i64)
            .with("scenario_id", 3i64)];
        let encoded = encode(&records, EncodeMode::Inference).unwrap();
        assert_eq!(encoded.schema.fields(), &["alpha", "zeta"]);
        assert_eq!(encoded.features.data(), &[0.0, 3.0, 4.0]);
        assert!(encoded.labels.is_none());
    }

    #[test]
    fn test_field_tokens_are_disjoint() {
        let records = vec![record(1, 0, true, true), record(2, 0, false, false)];
        let encoded = encode(&records, EncodeMode::Inference).unwrap();
        let f = &encoded.features;
        assert_eq!(f.row(0), &[1.0, 3.0, 4.0]);
        assert_eq!(f.row(1), &[0.0, 2.0, 4.0]);
        assert_eq!(encoded.user_ids, vec![0, 0]);
        assert_eq!(encoded.max_token(), 4);
    }

    #[test]
    fn test_integer_indicators() {
        let records = vec![RawRecord::new()
            .with(ID_FIELD, 1i64)
            .with(USER_ID_FIELD, 3i64)
            .with("x", 1i64)
            .with("y", 0i64)];
        let encoded = encode(&records, EncodeMode::Inference).unwrap();
        assert_eq!(encoded.features.data(), &[1.0, 2.0, 7.0]);

        let flags = vec![RawRecord::new()
            .with(ID_FIELD, 1i64)
            .with(USER_ID_FIELD, 3i64)
            .with("x", true)
            .with("y", false)];
        let same = encode(&flags, EncodeMode::Inference).unwrap();
        assert_eq!(same.features, encoded.features);

        let bad = vec![RawRecord::new()
            .with(ID_FIELD, 1i64)
            .with(USER_ID_FIELD, 3i64)
            .with("x", 2i64)];
        assert!(matches!(
            encode(&bad, EncodeMode::Inference),
            Err(DataError::InvalidFieldValue { field, .. }) if field == "x"
        ));
    }

    #[test]
    fn test_missing_required_fields() {
        let no_id = vec![RawRecord::new().with(USER_ID_FIELD, 1i64)];
        assert!(matches!(
            encode(&no_id, EncodeMode::Inference),
            Err(DataError::MissingField { field, .. }) if field == ID_FIELD
        ));

        let no_label = vec![record(1, 1, true, false)];
        assert!(matches!(
            encode(&no_label, EncodeMode::Training),
            Err(DataError::MissingField { field, .. }) if field == LABEL_FIELD
        ));
    }

    #[test]
    fn test_inconsistent_schema_rejected() {
        let records = vec![
            record(1, 0, true, false),
            RawRecord::new()
                .with(ID_FIELD, 2i64)
                .with(USER_ID_FIELD, 0i64)
                .with("a", true),
        ];
        assert!(matches!(
            encode(&records, EncodeMode::Inference),
            Err(DataError::InconsistentSchema { record: 1, .. })
        ));
    }

    #[test]
    fn test_input_not_mutated() {
        let records = vec![record(1, 5, true, false).with(LABEL_FIELD, false)];
        let before = records.clone();
        encode(&records, EncodeMode::Training).unwrap();
        assert_eq!(records, before);
    }

    #[test]
    fn test_empty_input() {
        let encoded = encode(&[], EncodeMode::Training).unwrap();
        assert_eq!(encoded.features.shape(), &[0, 1]);
        assert!(encoded.is_empty());
        assert_eq!(encoded.labels.unwrap().shape(), &[0, 1]);
    }

    #[test]
    fn test_schema_mismatch() {
        let trained = FeatureSchema::new(vec!["b".into(), "a".into()]);
        assert_eq!(trained.fields(), &["a", "b"]);
        assert_eq!(trained.user_token(3), 7);
        assert!(trained
            .ensure_matches(&FeatureSchema::new(vec!["a".into()]))
            .is_err());
    }

    #[test]
    fn test_user_token_bound() {
        // two fields: user offset 4
        let limit = (MAX_TOKEN - 4) as i64;
        let encoded = encode(&[record(1, limit, false, false)], EncodeMode::Inference).unwrap();
        assert_eq!(encoded.features.row(0)[2], MAX_TOKEN as f32);
        assert_eq!(encoded.max_token() as u64, MAX_TOKEN);

        for user in [limit + 1, limit + 2, i64::MAX] {
            let rows = [record(1, 0, true, false), record(2, user, true, false)];
            assert!(matches!(
                encode(&rows, EncodeMode::Inference),
                Err(DataError::InvalidFieldValue { record: 1, field, .. }) if field == USER_ID_FIELD
            ));
        }
    }

    #[test]
    fn test_user_token_tracks_user_id() {
        let rows = [record(1, 3, true, false), record(2, 41, true, false)];
        let encoded = encode(&rows, EncodeMode::Inference).unwrap();
        let (a, b) = (encoded.features.row(0), encoded.features.row(1));
        assert_eq!(a[..2], b[..2]);
        assert_eq!(b[2] - a[2], 38.0);
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let records = parse_records(
            r#"[
                {"id": 1, "user_id": 2, "music": true, "art": false, "outdoors": null},
                {"outdoors": null, "art": false, "user_id": 2, "music": true, "id": 1}
            ]"#,
        )
        .unwrap();
        let encoded = encode(&records, EncodeMode::Inference).unwrap();
        assert_eq!(encoded.schema.fields(), &["art", "music", "outdoors"]);
        assert_eq!(encoded.features.row(0), encoded.features.row(1));
        assert_eq!(encoded.features.row(0), &[0.0, 3.0, 4.0, 8.0]);
    }
}
