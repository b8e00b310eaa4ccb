//! Record encoding and mini-batching for the Shoulder recommender.
//!
//! Raw attribute records arrive from the application as JSON objects. The
//! [`encoder`] turns them into a token matrix whose vocabulary is shared by
//! every field, and [`batch::BatchSource`] replays that matrix as seeded,
//! shuffled mini-batches.
//!
//! ```
//! use shoulder_data::{encode, BatchSource, EncodeMode, RawRecord};
//!
//! let records: Vec<RawRecord> = serde_json::from_str(r#"[
//!     {"id": 1, "user_id": 0, "music": true,  "sports": false, "attended_event": true},
//!     {"id": 2, "user_id": 1, "music": false, "sports": true,  "attended_event": false}
//! ]"#).unwrap();
//!
//! let encoded = encode(&records, EncodeMode::Training).unwrap();
//! assert_eq!(encoded.features.shape(), &[2, 3]);
//!
//! let source = BatchSource::from_dataset(&encoded, 32, 1994).unwrap();
//! assert_eq!(source.num_batches(), 1);
//! ```
//!
//! # Modules
//!
//! - [`record`] - Raw records and field values
//! - [`encoder`] - Token encoding and the feature schema
//! - [`batch`] - Seeded batching

pub mod batch;
pub mod encoder;
pub mod error;
pub mod record;

pub use batch::{Batch, BatchSource, Batches};
pub use encoder::{encode, EncodeMode, EncodedDataset, FeatureSchema, MAX_TOKEN};
pub use error::{DataError, Result};
pub use record::{parse_records, FieldValue, RawRecord};
