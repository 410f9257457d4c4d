//! Persistence implementations
//!
//! Artifact sinks and checkpoint storage.

mod channel_sink;
mod directory_sink;
mod json_checkpoint_store;
mod memory_sink;

pub use channel_sink::ChannelSink;
pub use directory_sink::{DirectorySink, MANIFEST_FILE, ManifestEntry};
pub use json_checkpoint_store::JsonCheckpointStore;
pub use memory_sink::MemorySink;
