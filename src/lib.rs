//! Signature-based file carving
//!
//! Recovers files embedded in raw binary data (disk images, memory dumps)
//! by locating format signatures, resolving where each candidate ends and
//! validating its structure. Inputs of any size are streamed in bounded,
//! overlapping windows and carved in parallel.
//!
//! # Example
//!
//! ```no_run
//! use artefact::application::dto::CarveOptions;
//! use artefact::infrastructure::persistence::DirectorySink;
//!
//! let mut sink = DirectorySink::new("./carved")?;
//! let options = CarveOptions::new().with_formats(["jpg", "png"]);
//! let summary = artefact::carve_file("disk.img", options, &mut sink)?;
//! println!("{}", summary.render());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod utils;

pub use application::dto::{CarveOptions, OverlapPolicy};
pub use application::{CancelToken, CarveError, CarveSession};
pub use domain::entities::{CarveSummary, CarvedArtifact, FormatSignature};
pub use domain::repositories::{ArtifactSink, ByteSource, CheckpointStore};
pub use domain::services::SignatureRegistry;

use infrastructure::persistence::JsonCheckpointStore;
use infrastructure::sources::FileSource;
use std::path::Path;
use std::sync::Arc;

/// Carves a regular file with the built-in registry. When
/// `options.resume_path` is set the session resumes from, and keeps
/// updating, that JSON checkpoint.
pub fn carve_file(
    path: impl AsRef<Path>,
    options: CarveOptions,
    sink: &mut dyn ArtifactSink,
) -> Result<CarveSummary, CarveError> {
    let source = FileSource::open(path).map_err(CarveError::Input)?;
    let resume_path = options.resume_path.clone();
    let mut session = CarveSession::new(Arc::new(source), options);
    if let Some(path) = resume_path {
        session = session.with_checkpoint_store(JsonCheckpointStore::new(path));
    }
    session.run(sink)
}
