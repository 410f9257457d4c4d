//! Infrastructure layer
//!
//! Concrete implementations of the domain repositories: input sources,
//! artifact sinks and checkpoint storage.

pub mod persistence;
pub mod sources;
