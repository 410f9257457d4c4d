//! Repository traits (interfaces)
//!
//! These traits define the contracts for external collaborators: where
//! bytes come from, where artifacts go and where checkpoints are kept.

mod artifact_sink;
mod byte_source;
mod checkpoint_store;

pub use artifact_sink::{ArtifactSink, SinkError};
pub use byte_source::{ByteSource, SourceError};
pub use checkpoint_store::{CheckpointError, CheckpointStore};
