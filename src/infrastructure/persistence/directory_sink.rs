//! Directory artifact sink
//!
//! Writes each artifact to its own file in an output directory and, once
//! the session finishes, a JSON manifest describing all of them. A manifest
//! left by an earlier run into the same directory is merged, so a resumed
//! session keeps the entries of the files carved before its checkpoint.

use crate::domain::entities::CarvedArtifact;
use crate::domain::repositories::{ArtifactSink, SinkError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

/// One line of the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub sequence: u64,
    pub format: String,
    pub offset: u64,
    pub length: u64,
    pub file: String,
}

/// Local directory sink
pub struct DirectorySink {
    output_dir: PathBuf,
    /// Entries found in the directory when the sink was created
    earlier: Vec<ManifestEntry>,
    entries: Vec<ManifestEntry>,
    bytes_written: u64,
}

impl DirectorySink {
    /// Creates the output directory if needed and picks up its manifest
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir).map_err(|source| SinkError::CreateOutput {
            path: output_dir.display().to_string(),
            source,
        })?;
        let earlier = read_manifest(&output_dir.join(MANIFEST_FILE));
        Ok(Self {
            output_dir,
            earlier,
            entries: Vec::new(),
            bytes_written: 0,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn files_written(&self) -> usize {
        self.entries.len()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Entries written by this sink
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Earlier entries plus this sink's, by sequence. A file written again
    /// keeps only its new entry.
    fn manifest(&self) -> Vec<ManifestEntry> {
        let mut manifest: Vec<ManifestEntry> = self
            .earlier
            .iter()
            .filter(|old| !self.entries.iter().any(|new| new.file == old.file))
            .chain(&self.entries)
            .cloned()
            .collect();
        manifest.sort_by(|a, b| (a.sequence, &a.file).cmp(&(b.sequence, &b.file)));
        manifest
    }
}

fn read_manifest(path: &Path) -> Vec<ManifestEntry> {
    let Ok(raw) = fs::read(path) else {
        return Vec::new();
    };
    match serde_json::from_slice(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&mut self, artifact: CarvedArtifact) -> Result<(), SinkError> {
        let name = artifact.suggested_filename();
        fs::write(self.output_dir.join(&name), artifact.content()).map_err(|source| {
            SinkError::Write {
                name: name.clone(),
                source,
            }
        })?;

        self.bytes_written += artifact.len();
        self.entries.push(ManifestEntry {
            sequence: artifact.sequence(),
            format: artifact.format_id().to_string(),
            offset: artifact.origin_offset(),
            length: artifact.len(),
            file: name,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let manifest = self.manifest();
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| SinkError::Other(format!("cannot encode manifest: {}", e)))?;
        fs::write(self.output_dir.join(MANIFEST_FILE), json).map_err(|source| SinkError::Write {
            name: MANIFEST_FILE.to_string(),
            source,
        })?;
        tracing::info!(
            "Wrote {} files ({} bytes) to {}; manifest lists {}",
            self.entries.len(),
            self.bytes_written,
            self.output_dir.display(),
            manifest.len()
        );
        Ok(())
    }
}
