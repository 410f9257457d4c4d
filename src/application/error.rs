//! Session errors
//!
//! Only fatal conditions surface here. Per-candidate problems are counted
//! in the summary and checkpoint problems are logged and recovered from.

use crate::domain::repositories::{SinkError, SourceError};
use crate::domain::services::RegistryError;
use thiserror::Error;

/// A fatal carving error
#[derive(Error, Debug)]
pub enum CarveError {
    /// The input is missing, unreadable or not a regular file
    #[error("Cannot open input: {0}")]
    Input(#[source] SourceError),

    /// Reading the input failed mid-session
    #[error("Read failed after {bytes_processed} bytes processed: {source}")]
    Read {
        bytes_processed: u64,
        #[source]
        source: SourceError,
    },

    /// The sink refused an artifact
    #[error("Output failed after {emitted} artifacts emitted: {source}")]
    Sink {
        emitted: u64,
        #[source]
        source: SinkError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    Registry(#[from] RegistryError),

    #[error("Failed to start worker pool: {0}")]
    Pool(String),
}

impl CarveError {
    /// Bytes processed before the failure, when known
    pub fn bytes_processed(&self) -> Option<u64> {
        match self {
            CarveError::Read { bytes_processed, .. } => Some(*bytes_processed),
            _ => None,
        }
    }

    /// Artifacts emitted before the failure, when known
    pub fn emitted(&self) -> Option<u64> {
        match self {
            CarveError::Sink { emitted, .. } => Some(*emitted),
            _ => None,
        }
    }
}
