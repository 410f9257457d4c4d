//! Artifact sink trait
//!
//! Defines the interface for consuming carved artifacts: writing them to
//! storage, collecting them in memory or forwarding them to another
//! pipeline stage.

use crate::domain::entities::CarvedArtifact;
use thiserror::Error;

/// Errors that can occur when delivering artifacts
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Cannot create output location {path}: {source}")]
    CreateOutput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifact {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Downstream consumer disconnected")]
    Disconnected,

    #[error("Sink error: {0}")]
    Other(String),
}

/// Consumer of validated artifacts
///
/// A session delivers artifacts from a single thread, in increasing
/// origin-offset order. Any error aborts the session.
///
/// # Example
///
/// ```
/// use artefact::domain::entities::CarvedArtifact;
/// use artefact::domain::repositories::{ArtifactSink, SinkError};
///
/// let mut seen = Vec::new();
/// let mut sink = |artifact: CarvedArtifact| -> Result<(), SinkError> {
///     seen.push(artifact.origin_offset());
///     Ok(())
/// };
/// # let _ = &mut sink;
/// ```
pub trait ArtifactSink {
    /// Takes ownership of one artifact
    fn deliver(&mut self, artifact: CarvedArtifact) -> Result<(), SinkError>;

    /// Called once after the last artifact of a session
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<F> ArtifactSink for F
where
    F: FnMut(CarvedArtifact) -> Result<(), SinkError>,
{
    fn deliver(&mut self, artifact: CarvedArtifact) -> Result<(), SinkError> {
        self(artifact)
    }
}
