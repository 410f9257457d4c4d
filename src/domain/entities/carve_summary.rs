//! Carve summary entity
//!
//! Statistics reported at the end of a session. Per-candidate problems end
//! up here as counters instead of being raised as errors.

use crate::utils::format_bytes;
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters for a single format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatStats {
    /// Header occurrences owned by a window
    pub candidates: u64,
    /// Artifacts delivered to the sink
    pub carved: u64,
    /// Candidates whose bytes failed validation
    pub rejected: u64,
    /// Candidates with no end within `max_size` or the available data
    pub unresolved: u64,
    /// Validated candidates dropped by the overlap policy
    pub overlapped: u64,
    /// Validated candidates already emitted by a resumed session
    pub duplicates: u64,
    /// Validated candidates dropped by artifact limits
    pub limited: u64,
    /// Total bytes carved
    pub bytes_carved: u64,
}

impl FormatStats {
    pub fn merge(&mut self, other: &FormatStats) {
        self.candidates += other.candidates;
        self.carved += other.carved;
        self.rejected += other.rejected;
        self.unresolved += other.unresolved;
        self.overlapped += other.overlapped;
        self.duplicates += other.duplicates;
        self.limited += other.limited;
        self.bytes_carved += other.bytes_carved;
    }
}

/// Result of a complete carving session
#[derive(Debug, Clone, Default)]
pub struct CarveSummary {
    /// Input that was carved
    pub source: String,
    /// Input size in bytes
    pub total_bytes: u64,
    /// Bytes committed by this session (excluding resumed range)
    pub bytes_scanned: u64,
    /// Windows committed by this session
    pub windows: u64,
    /// Statistics by format id
    pub formats: BTreeMap<&'static str, FormatStats>,
    /// Offset the session resumed from, if a checkpoint was applied
    pub resumed_from: Option<u64>,
    /// Whether the caller cancelled the session
    pub cancelled: bool,
    /// Whether `max_total` stopped the session early
    pub limit_reached: bool,
    pub duration: Duration,
}

impl CarveSummary {
    pub fn new(source: &str, total_bytes: u64) -> Self {
        Self {
            source: source.to_string(),
            total_bytes,
            ..Default::default()
        }
    }

    /// Mutable statistics for a format, created on first use
    pub fn format_mut(&mut self, format_id: &'static str) -> &mut FormatStats {
        self.formats.entry(format_id).or_default()
    }

    /// Statistics for a format (zeroes if never seen)
    pub fn format(&self, format_id: &str) -> FormatStats {
        self.formats.get(format_id).copied().unwrap_or_default()
    }

    pub fn total_candidates(&self) -> u64 {
        self.formats.values().map(|s| s.candidates).sum()
    }

    pub fn total_carved(&self) -> u64 {
        self.formats.values().map(|s| s.carved).sum()
    }

    pub fn total_rejected(&self) -> u64 {
        self.formats.values().map(|s| s.rejected + s.unresolved).sum()
    }

    pub fn bytes_carved(&self) -> u64 {
        self.formats.values().map(|s| s.bytes_carved).sum()
    }

    /// Whether the session covered the whole input
    pub fn is_complete(&self) -> bool {
        !self.cancelled && !self.limit_reached
    }

    /// Returns a summary string
    pub fn render(&self) -> String {
        let mut summary = format!(
            "Scanned {} of {} ({}) in {:.2}s\n",
            format_bytes(self.bytes_scanned),
            self.source,
            format_bytes(self.total_bytes),
            self.duration.as_secs_f64()
        );
        if let Some(offset) = self.resumed_from {
            summary.push_str(&format!("Resumed from offset {}\n", offset));
        }
        summary.push_str(&format!(
            "Carved {} files ({}) from {} candidates\n",
            self.total_carved(),
            format_bytes(self.bytes_carved()),
            self.total_candidates()
        ));

        for (format_id, stats) in &self.formats {
            if stats.candidates == 0 {
                continue;
            }
            summary.push_str(&format!(
                "  - {:<4} carved {:>6}  rejected {:>6}  unresolved {:>6}",
                format_id, stats.carved, stats.rejected, stats.unresolved
            ));
            let skipped = stats.overlapped + stats.duplicates + stats.limited;
            if skipped > 0 {
                summary.push_str(&format!("  skipped {:>6}", skipped));
            }
            summary.push('\n');
        }

        if self.cancelled {
            summary.push_str("Session cancelled before the end of input\n");
        }
        if self.limit_reached {
            summary.push_str("Artifact limit reached before the end of input\n");
        }

        summary
    }
}
