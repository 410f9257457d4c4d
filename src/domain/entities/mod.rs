//! Domain entities
//!
//! Core business objects that represent the fundamental concepts
//! in the file carving domain.

mod candidate;
mod carve_state;
mod carve_summary;
mod carved_artifact;
mod format_signature;
mod scan_window;

pub use candidate::{CandidateHit, CandidateState, RejectReason};
pub use carve_state::{CarveState, FINGERPRINT_BYTES, InputIdentity};
pub use carve_summary::{CarveSummary, FormatStats};
pub use carved_artifact::{ArtifactKey, CarvedArtifact};
pub use format_signature::{BoundaryStrategy, FormatSignature};
pub use scan_window::ScanWindow;
