//! Data Transfer Objects

mod carve_options;
mod carve_progress;

pub use carve_options::{CarveOptions, OverlapPolicy};
pub use carve_progress::{CarveProgress, CarveProgressCallback};
