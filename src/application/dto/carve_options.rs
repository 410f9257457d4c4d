//! Carve options DTO

use crate::application::error::CarveError;
use crate::domain::services::SignatureRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MIB: u64 = 1024 * 1024;

/// What to do with a candidate whose range overlaps an earlier artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Keep every validated candidate
    #[default]
    Independent,
    /// Drop a candidate whose header lies inside an earlier artifact of the
    /// same format
    SkipContained,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Independent => write!(f, "independent"),
            OverlapPolicy::SkipContained => write!(f, "skip-contained"),
        }
    }
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "independent" => Ok(OverlapPolicy::Independent),
            "skip-contained" => Ok(OverlapPolicy::SkipContained),
            other => Err(format!(
                "unknown overlap policy '{}' (expected independent or skip-contained)",
                other
            )),
        }
    }
}

/// Options for a carving session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarveOptions {
    /// Format ids to carve (empty = all registered)
    pub formats: Vec<String>,
    /// Fresh bytes read per window
    pub chunk_size: usize,
    /// Bytes carried from one window into the next
    pub overlap_size: usize,
    /// Per-format `max_size` overrides in bytes
    pub max_artifact_size: BTreeMap<String, u64>,
    /// Stop after this many artifacts in total
    pub max_total: Option<u64>,
    /// Keep at most this many artifacts of each format
    pub max_per_format: Option<u64>,
    /// Whether windows are carved on a worker pool
    pub parallel: bool,
    /// Worker threads for parallel carving
    pub workers: usize,
    /// Checkpoint file used to resume and record progress
    pub resume_path: Option<PathBuf>,
    /// Bytes committed between two checkpoints
    pub checkpoint_interval: u64,
    pub overlap_policy: OverlapPolicy,
}

impl Default for CarveOptions {
    fn default() -> Self {
        Self {
            formats: Vec::new(),
            chunk_size: MIB as usize,
            overlap_size: MIB as usize,
            max_artifact_size: BTreeMap::new(),
            max_total: None,
            max_per_format: None,
            parallel: true,
            workers: num_cpus::get().max(1),
            resume_path: None,
            checkpoint_interval: 100 * MIB,
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

impl CarveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, CarveError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CarveError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| CarveError::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Sets the formats to carve
    pub fn with_formats<S: Into<String>>(mut self, formats: impl IntoIterator<Item = S>) -> Self {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_overlap_size(mut self, size: usize) -> Self {
        self.overlap_size = size;
        self
    }

    /// Overrides the maximum artifact size of one format
    pub fn with_max_size(mut self, format_id: &str, max_size: u64) -> Self {
        self.max_artifact_size.insert(format_id.to_string(), max_size);
        self
    }

    pub fn with_max_total(mut self, limit: u64) -> Self {
        self.max_total = Some(limit);
        self
    }

    pub fn with_max_per_format(mut self, limit: u64) -> Self {
        self.max_per_format = Some(limit);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Disables parallel carving
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_resume_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resume_path = Some(path.into());
        self
    }

    pub fn with_checkpoint_interval(mut self, bytes: u64) -> Self {
        self.checkpoint_interval = bytes;
        self
    }

    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    /// Checks the options against a registry before any byte is scanned
    pub fn validate(&self, registry: &SignatureRegistry) -> Result<(), CarveError> {
        if self.chunk_size == 0 {
            return Err(CarveError::Config("chunk size must be positive".to_string()));
        }
        if self.workers == 0 {
            return Err(CarveError::Config("worker count must be positive".to_string()));
        }
        if self.checkpoint_interval == 0 {
            return Err(CarveError::Config(
                "checkpoint interval must be positive".to_string(),
            ));
        }
        registry.select(&self.formats)?;
        for (id, &max_size) in &self.max_artifact_size {
            registry.lookup(id)?;
            if max_size == 0 {
                return Err(CarveError::Config(format!("max size of '{}' must be positive", id)));
            }
        }

        let longest = registry.largest_header_len();
        if self.overlap_size + 1 < longest {
            return Err(CarveError::Config(format!(
                "overlap of {} bytes is shorter than the longest header ({} bytes) minus one",
                self.overlap_size, longest
            )));
        }
        Ok(())
    }
}
