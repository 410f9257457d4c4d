//! In-memory artifact collection

use crate::domain::entities::CarvedArtifact;
use crate::domain::repositories::{ArtifactSink, SinkError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects artifacts in memory. Clones share the same storage, so a clone
/// kept by the caller sees everything delivered to the session's copy.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    artifacts: Arc<Mutex<Vec<CarvedArtifact>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected artifacts in delivery order
    pub fn artifacts(&self) -> Vec<CarvedArtifact> {
        self.artifacts.lock().clone()
    }

    /// Removes and returns the collected artifacts
    pub fn take(&self) -> Vec<CarvedArtifact> {
        std::mem::take(&mut *self.artifacts.lock())
    }

    pub fn len(&self) -> usize {
        self.artifacts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.lock().is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&mut self, artifact: CarvedArtifact) -> Result<(), SinkError> {
        self.artifacts.lock().push(artifact);
        Ok(())
    }
}
