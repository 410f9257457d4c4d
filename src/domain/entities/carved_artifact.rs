//! Carved artifact entity
//!
//! Represents a validated file recovered from the input. Artifacts are
//! immutable; once yielded by a session they belong to the caller.

use bytes::Bytes;
use std::fmt;

/// Stable identity of an artifact across runs: format and origin offset.
/// Used by checkpoints to avoid emitting the same file twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub format_id: String,
    pub origin_offset: u64,
}

impl ArtifactKey {
    pub fn new(format_id: &str, origin_offset: u64) -> Self {
        Self {
            format_id: format_id.to_string(),
            origin_offset,
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.format_id, self.origin_offset)
    }
}

/// A recovered file with its metadata and content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarvedArtifact {
    /// Monotonically increasing sequence number within the session
    sequence: u64,
    /// Format identifier (e.g. `png`)
    format_id: &'static str,
    /// Extension used when persisted
    extension: &'static str,
    /// Global byte offset of the header in the input
    origin_offset: u64,
    /// The carved bytes
    content: Bytes,
}

impl CarvedArtifact {
    pub fn new(
        sequence: u64,
        format_id: &'static str,
        extension: &'static str,
        origin_offset: u64,
        content: Bytes,
    ) -> Self {
        Self {
            sequence,
            format_id,
            extension,
            origin_offset,
            content,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn format_id(&self) -> &'static str {
        self.format_id
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn origin_offset(&self) -> u64 {
        self.origin_offset
    }

    /// Global offset one past the last carved byte
    pub fn end_offset(&self) -> u64 {
        self.origin_offset + self.content.len() as u64
    }

    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consumes self and returns the shared content buffer
    pub fn into_content(self) -> Bytes {
        self.content
    }

    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(self.format_id, self.origin_offset)
    }

    /// Deterministic file name derived from sequence, offset and format
    pub fn suggested_filename(&self) -> String {
        format!(
            "carved_{:04}_{}_{}.{}",
            self.sequence, self.origin_offset, self.format_id, self.extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_deterministic() {
        let artifact = CarvedArtifact::new(7, "jpg", "jpg", 4096, Bytes::from_static(b"abc"));
        assert_eq!(artifact.suggested_filename(), "carved_0007_4096_jpg.jpg");
        assert_eq!(artifact.end_offset(), 4099);
        assert_eq!(artifact.key().to_string(), "jpg@4096");
    }
}
