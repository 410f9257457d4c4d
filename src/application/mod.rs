//! Application layer
//!
//! Use cases and application services that orchestrate domain logic.

mod carve_session;
pub mod dto;
mod error;
mod window_carver;

pub use carve_session::{CancelToken, CarveSession};
pub use error::CarveError;
pub use window_carver::{CarvedRange, WindowCarver, WindowOutcome};
