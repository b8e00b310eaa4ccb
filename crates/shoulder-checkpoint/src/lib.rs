//! Checkpoint persistence for the Shoulder recommender.
//!
//! A checkpoint is a single file holding a [`ModelState`]: the DeepFM
//! parameter tree plus the feature schema it was trained with. Only the
//! current weights exist; every save replaces the previous file.
//!
//! # Core Components
//!
//! - [`Checkpointer`]: Trait for checkpoint serialization implementations
//! - [`JsonCheckpointer`] / [`BinaryCheckpointer`]: JSON and `bincode` formats
//! - [`checkpointer_for_path`]: picks a format from the file extension
//! - [`ModelState`]: Complete model state representation

pub mod checkpointer;
pub mod state;

pub use checkpointer::{checkpointer_for_path, BinaryCheckpointer, Checkpointer, JsonCheckpointer};
pub use state::{ModelState, FORMAT_VERSION};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during checkpoint operations.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// I/O error during checkpoint operations.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Checkpoint file not found.
    #[error("Checkpoint not found: {0}")]
    NotFound(PathBuf),

    /// Error during JSON serialization.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Error during JSON deserialization.
    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Error in the binary encoding.
    #[error("Binary checkpoint error: {0}")]
    Binary(#[source] bincode::Error),

    /// Checkpoint version mismatch.
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version.
        expected: u32,
        /// Found version.
        found: u32,
    },

    /// Checkpoint parsed but its parts are inconsistent.
    #[error("Corrupted checkpoint: {0}")]
    Corrupted(String),
}

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;
