//! Carve state entity
//!
//! The persisted checkpoint of a carving session. It is an explicit value:
//! loaded before a session starts, updated by the session thread after each
//! committed window, and handed to a `CheckpointStore` for persistence.

use super::carved_artifact::ArtifactKey;
use crate::domain::repositories::{ByteSource, SourceError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Number of leading bytes hashed into the input fingerprint
pub const FINGERPRINT_BYTES: usize = 64 * 1024;

/// Identity of an input, used to reject checkpoints taken on other data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputIdentity {
    pub path: String,
    pub size: u64,
    /// SHA-256 of the first `FINGERPRINT_BYTES` bytes, hex encoded
    pub fingerprint: String,
}

impl InputIdentity {
    /// Computes the identity of a source
    pub fn compute(source: &dyn ByteSource) -> Result<Self, SourceError> {
        let size = source.len();
        let mut head = vec![0u8; FINGERPRINT_BYTES.min(size as usize)];
        let read = source.read_full_at(0, &mut head)?;
        head.truncate(read);

        let mut hasher = Sha256::new();
        hasher.update(&head);

        Ok(Self {
            path: source.describe().to_string(),
            size,
            fingerprint: hex::encode(hasher.finalize()),
        })
    }
}

/// Resumable progress of a carving session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarveState {
    pub input: InputIdentity,
    /// Owned bytes committed so far
    pub bytes_processed: u64,
    /// Global offset scanning resumes from
    pub last_offset: u64,
    /// Artifacts emitted so far; the next sequence number
    pub artifact_count: u64,
    /// Identities (`format@offset`) of every emitted artifact
    pub emitted: BTreeSet<String>,
    /// End of the furthest emitted artifact per format
    #[serde(default)]
    pub covered: BTreeMap<String, u64>,
    /// Whether the whole input has been processed
    #[serde(default)]
    pub completed: bool,
}

impl CarveState {
    /// Creates an empty state for a fresh session
    pub fn fresh(input: InputIdentity) -> Self {
        Self {
            input,
            bytes_processed: 0,
            last_offset: 0,
            artifact_count: 0,
            emitted: BTreeSet::new(),
            covered: BTreeMap::new(),
            completed: false,
        }
    }

    /// Whether this checkpoint was taken on the same input
    pub fn matches(&self, input: &InputIdentity) -> bool {
        &self.input == input && self.last_offset <= input.size
    }

    pub fn has_emitted(&self, key: &ArtifactKey) -> bool {
        self.emitted.contains(&key.to_string())
    }

    /// Records an emitted artifact
    pub fn record(&mut self, key: &ArtifactKey) {
        if self.emitted.insert(key.to_string()) {
            self.artifact_count += 1;
        }
    }

    /// Offset up to which earlier artifacts of `format_id` extend
    pub fn covered_until(&self, format_id: &str) -> u64 {
        self.covered.get(format_id).copied().unwrap_or(0)
    }

    /// Extends the coverage of `format_id` to `end`
    pub fn cover(&mut self, format_id: &str, end: u64) {
        let covered = self.covered.entry(format_id.to_string()).or_insert(0);
        *covered = (*covered).max(end);
    }

    /// Records a committed window
    pub fn advance(&mut self, owned_bytes: u64, owned_end: u64) {
        self.bytes_processed += owned_bytes;
        self.last_offset = owned_end;
    }
}
