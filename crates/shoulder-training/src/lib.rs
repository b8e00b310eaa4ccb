//! Training, retraining and scoring for the DeepFM event recommender.
//!
//! Callers hand in raw attribute records and get back either a per-epoch
//! [`TrainingReport`] (with the weights persisted to disk) or one attendance
//! probability per record.
//!
//! ```text
//!  records ──encode──▶ tokens ──BatchSource──▶ Trainer ──▶ ModelState on disk
//!                                                               │
//!  records ──encode──▶ tokens ─────────────▶ Predictor ◀────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use shoulder_data::parse_records;
//! use shoulder_training::{pretrain, recommend, Predictor, TrainingConfig};
//!
//! # fn main() -> shoulder_training::Result<()> {
//! let labeled = parse_records(&std::fs::read_to_string("labeled.json").unwrap())?;
//! let report = pretrain(&labeled, &TrainingConfig::pretrain(), "weights/parameters.json")?;
//! println!("final loss {:?}", report.final_loss());
//!
//! let predictor = Predictor::from_checkpoint("weights/parameters.json")?;
//! let candidates = parse_records(&std::fs::read_to_string("candidates.json").unwrap())?;
//! let probs = recommend(&candidates, &predictor)?;
//! # let _ = probs;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod loss;
pub mod metrics;
pub mod predictor;
pub mod recommendation;
pub mod trainer;

pub use config::{ModelPaths, TrainingConfig};
pub use error::{ErrorCategory, Result, TrainingError};
pub use loss::{accuracy, binary_cross_entropy, DECISION_THRESHOLD};
pub use metrics::{Metrics, MetricsRecorder};
pub use predictor::Predictor;
pub use recommendation::{
    ensure_finite_probabilities, finetune, pretrain, recommend, sanitize_probabilities, top_k,
};
pub use trainer::{Trainer, TrainingReport};

/// Common imports for driving training and inference.
pub mod prelude {
    pub use crate::{
        finetune, pretrain, recommend, ErrorCategory, ModelPaths, Predictor, Trainer,
        TrainingConfig, TrainingError, TrainingReport,
    };
}
