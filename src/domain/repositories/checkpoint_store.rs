//! Checkpoint store trait
//!
//! Persists `CarveState` between runs so a session over a large input can
//! resume after interruption.

use crate::domain::entities::CarveState;
use thiserror::Error;

/// Errors that can occur when loading or saving checkpoints.
/// All of them are recoverable: the session starts fresh or keeps going.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt checkpoint {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for a single session checkpoint
pub trait CheckpointStore: Send {
    /// Loads the stored state. `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<CarveState>, CheckpointError>;

    /// Replaces the stored state
    fn save(&self, state: &CarveState) -> Result<(), CheckpointError>;

    /// Where the checkpoint lives, for logging
    fn location(&self) -> String;
}
