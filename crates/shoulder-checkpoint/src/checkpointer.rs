//! Checkpointer trait for save/restore operations.
//!
//! Both implementations write through a temporary file in the target's
//! directory and rename it into place, so readers only ever see a complete
//! previous or complete new checkpoint.

use crate::state::ModelState;
use crate::{CheckpointError, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Trait for checkpoint serialization and deserialization.
///
/// # Examples
///
/// ```no_run
/// use shoulder_checkpoint::{Checkpointer, JsonCheckpointer};
/// use std::path::Path;
///
/// fn main() -> shoulder_checkpoint::Result<()> {
///     let checkpointer = JsonCheckpointer::new();
///     let state = checkpointer.restore(Path::new("weights/parameters.json"))?;
///     checkpointer.save(Path::new("weights/backup.json"), &state)?;
///     Ok(())
/// }
/// ```
pub trait Checkpointer: Send + Sync {
    /// Save model state to the specified path, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or I/O fails.
    fn save(&self, path: &Path, state: &ModelState) -> Result<()>;

    /// Restore model state from the specified path.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::NotFound`] if the file doesn't exist, and
    /// a deserialization or validation error if it is unreadable.
    fn restore(&self, path: &Path) -> Result<ModelState>;
}

/// JSON-based checkpoint implementation.
///
/// Human-readable and diffable; the default format.
#[derive(Debug, Clone, Default)]
pub struct JsonCheckpointer {
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

impl JsonCheckpointer {
    /// Create a new JSON checkpointer.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a new JSON checkpointer with pretty printing.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Checkpointer for JsonCheckpointer {
    fn save(&self, path: &Path, state: &ModelState) -> Result<()> {
        tracing::info!(path = %path.display(), "Saving checkpoint");

        let json = if self.pretty {
            serde_json::to_vec_pretty(state)
        } else {
            serde_json::to_vec(state)
        }
        .map_err(CheckpointError::Serialization)?;

        write_atomically(path, &json)?;

        tracing::debug!(path = %path.display(), size = json.len(), "Checkpoint saved");
        Ok(())
    }

    fn restore(&self, path: &Path) -> Result<ModelState> {
        tracing::info!(path = %path.display(), "Restoring checkpoint");

        let data = read_existing(path)?;
        let state: ModelState =
            serde_json::from_slice(&data).map_err(CheckpointError::Deserialization)?;
        state.validate()?;

        tracing::info!(
            path = %path.display(),
            fields = state.schema.num_fields(),
            vocab_rows = state.model.vocab_rows(),
            "Checkpoint restored"
        );
        Ok(state)
    }
}

/// Binary checkpoint implementation using `bincode`.
///
/// More compact than JSON and faster to read for large embedding tables.
#[derive(Debug, Clone, Default)]
pub struct BinaryCheckpointer;

impl BinaryCheckpointer {
    /// Create a new binary checkpointer.
    pub fn new() -> Self {
        Self
    }
}

impl Checkpointer for BinaryCheckpointer {
    fn save(&self, path: &Path, state: &ModelState) -> Result<()> {
        tracing::info!(path = %path.display(), "Saving binary checkpoint");

        let data = bincode::serialize(state).map_err(CheckpointError::Binary)?;
        write_atomically(path, &data)?;

        tracing::debug!(path = %path.display(), size = data.len(), "Checkpoint saved");
        Ok(())
    }

    fn restore(&self, path: &Path) -> Result<ModelState> {
        tracing::info!(path = %path.display(), "Restoring binary checkpoint");

        let data = read_existing(path)?;
        let state: ModelState = bincode::deserialize(&data).map_err(CheckpointError::Binary)?;
        state.validate()?;

        tracing::info!(
            path = %path.display(),
            fields = state.schema.num_fields(),
            vocab_rows = state.model.vocab_rows(),
            "Checkpoint restored"
        );
        Ok(state)
    }
}

/// Picks a checkpointer from the file extension: `.bin` is binary, anything
/// else JSON.
pub fn checkpointer_for_path(path: &Path) -> Box<dyn Checkpointer> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => Box::new(BinaryCheckpointer::new()),
        _ => Box::new(JsonCheckpointer::new()),
    }
}

fn read_existing(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(CheckpointError::NotFound(path.to_path_buf()));
    }
    std::fs::read(path).map_err(|e| CheckpointError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| CheckpointError::Io {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let io_err = |e| CheckpointError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
