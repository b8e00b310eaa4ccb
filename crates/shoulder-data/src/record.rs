//! Raw attribute records as handed over by the application layer.
//!
//! A record is a flat JSON object: boolean onboarding/event/scenario
//! indicators plus identifiers and, for training, the `attended_event` label.
//!
//! ```
//! use shoulder_data::record::{FieldValue, RawRecord};
//!
//! let record: RawRecord = serde_json::from_str(
//!     r#"{"id": 1, "user_id": 4, "likes_music": true, "attended_event": 0}"#,
//! ).unwrap();
//! assert_eq!(record.get("likes_music"), Some(&FieldValue::Bool(true)));
//! assert_eq!(record.user_id(0).unwrap(), 4);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Record identifier, required but never encoded.
pub const ID_FIELD: &str = "id";
/// User identity, encoded as the trailing token.
pub const USER_ID_FIELD: &str = "user_id";
/// Training label.
pub const LABEL_FIELD: &str = "attended_event";
/// Keys stripped before encoding besides the label.
pub const IDENTIFIER_FIELDS: [&str; 4] = [ID_FIELD, USER_ID_FIELD, "scenario_id", "event_id"];

/// A single attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Null,
}

impl FieldValue {
    /// Interprets the value as an indicator.
    ///
    /// Booleans map directly, `0`/`1` integers are accepted as booleans and
    /// `null` counts as false. Returns `None` for any other integer.
    pub fn as_indicator(&self) -> Option<bool> {
        match *self {
            FieldValue::Bool(b) => Some(b),
            FieldValue::Int(0) | FieldValue::Null => Some(false),
            FieldValue::Int(1) => Some(true),
            FieldValue::Int(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

/// Field name → value map with sorted iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Alphabetically sorted names of the encodable feature fields.
    pub fn feature_names(&self) -> Vec<String> {
        self.fields
            .keys()
            .filter(|k| !is_reserved(k))
            .cloned()
            .collect()
    }

    /// Reads the required non-negative `user_id`.
    ///
    /// `index` is only used to label errors.
    pub fn user_id(&self, index: usize) -> Result<u64> {
        match self.get(USER_ID_FIELD) {
            None => Err(DataError::MissingField {
                record: index,
                field: USER_ID_FIELD.to_string(),
            }),
            Some(FieldValue::Int(id)) if *id >= 0 => Ok(*id as u64),
            Some(other) => Err(DataError::InvalidFieldValue {
                record: index,
                field: USER_ID_FIELD.to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// Reads the `attended_event` label: positive only for `true` or `1`.
    pub fn label(&self, index: usize) -> Result<bool> {
        match self.get(LABEL_FIELD) {
            None => Err(DataError::MissingField {
                record: index,
                field: LABEL_FIELD.to_string(),
            }),
            Some(value) => Ok(matches!(value, FieldValue::Bool(true) | FieldValue::Int(1))),
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// True for identifiers and the label, which never become feature fields.
pub fn is_reserved(name: &str) -> bool {
    name == LABEL_FIELD || IDENTIFIER_FIELDS.contains(&name)
}

/// Parses a JSON array of records.
pub fn parse_records(json: &str) -> Result<Vec<RawRecord>> {
    Ok(serde_json::from_str(json)?)
}
