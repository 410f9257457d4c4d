//! Carve progress DTO

use std::time::Duration;

/// Snapshot of a running session, reported after each committed window
#[derive(Debug, Clone, Default)]
pub struct CarveProgress {
    /// Total bytes of the input
    pub total_bytes: u64,
    /// Bytes already covered, including any resumed range
    pub scanned_bytes: u64,
    /// Artifacts delivered so far, including resumed ones
    pub artifacts: u64,
    /// Time since the session started
    pub elapsed: Duration,
}

impl CarveProgress {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            ..Default::default()
        }
    }

    /// Returns the progress percentage (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.scanned_bytes as f64 / self.total_bytes as f64) * 100.0
    }

    /// Scan speed in bytes per second
    pub fn speed_bps(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (self.scanned_bytes as f64 / secs) as u64
    }
}

/// Progress callback for carving
pub type CarveProgressCallback = Box<dyn Fn(&CarveProgress) + Send + Sync>;
