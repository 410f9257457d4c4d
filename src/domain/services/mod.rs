//! Domain services
//!
//! Core carving logic: signature lookup, boundary resolution, validation
//! and chunked scanning.

mod boundary_resolver;
mod chunk_scanner;
mod end_predictor;
mod signature_registry;
mod validator;

pub use boundary_resolver::{BoundaryResolver, Resolution};
pub use chunk_scanner::{ChunkScanner, ScannerState};
pub use end_predictor::{EndPredictor, EntropyEndPredictor, shannon_entropy};
pub use signature_registry::{HeaderMatcher, RegistryError, SignatureRegistry};
pub use validator::{Rejection, Validator};
