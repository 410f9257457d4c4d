//! Candidate hit entity
//!
//! A located header occurrence that has not yet been confirmed as a real
//! file. It moves through `Located -> Resolved -> Validated | Rejected`.

use std::fmt;

/// Why a candidate was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// No end could be determined within `max_size` or the available data
    Unresolved,
    /// The carved bytes failed format validation
    Invalid,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Unresolved => write!(f, "unresolved boundary"),
            RejectReason::Invalid => write!(f, "failed validation"),
        }
    }
}

/// Lifecycle state of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    Located,
    Resolved,
    Validated,
    Rejected(RejectReason),
}

/// A header match and what is known about its extent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateHit {
    format_id: &'static str,
    header_offset: u64,
    end_offset: Option<u64>,
    state: CandidateState,
}

impl CandidateHit {
    /// Creates a freshly located candidate
    pub fn located(format_id: &'static str, header_offset: u64) -> Self {
        Self {
            format_id,
            header_offset,
            end_offset: None,
            state: CandidateState::Located,
        }
    }

    pub fn format_id(&self) -> &'static str {
        self.format_id
    }

    pub fn header_offset(&self) -> u64 {
        self.header_offset
    }

    pub fn end_offset(&self) -> Option<u64> {
        self.end_offset
    }

    pub fn state(&self) -> CandidateState {
        self.state
    }

    /// Length in bytes once resolved
    pub fn len(&self) -> Option<u64> {
        self.end_offset.map(|end| end - self.header_offset)
    }

    /// Records the resolved end offset. An end at or before the header is
    /// treated as unresolved.
    pub fn resolve(&mut self, end_offset: u64) {
        if self.state != CandidateState::Located {
            return;
        }
        if end_offset <= self.header_offset {
            self.state = CandidateState::Rejected(RejectReason::Unresolved);
            return;
        }
        self.end_offset = Some(end_offset);
        self.state = CandidateState::Resolved;
    }

    /// Records the validator verdict for a resolved candidate
    pub fn validate(&mut self, valid: bool) {
        if self.state != CandidateState::Resolved {
            return;
        }
        self.state = if valid {
            CandidateState::Validated
        } else {
            CandidateState::Rejected(RejectReason::Invalid)
        };
    }

    /// Rejects the candidate on its header fields, before or after
    /// resolution
    pub fn reject_invalid(&mut self) {
        if matches!(self.state, CandidateState::Located | CandidateState::Resolved) {
            self.state = CandidateState::Rejected(RejectReason::Invalid);
        }
    }

    /// Marks the candidate as unresolvable
    pub fn reject_unresolved(&mut self) {
        if matches!(self.state, CandidateState::Located | CandidateState::Resolved) {
            self.state = CandidateState::Rejected(RejectReason::Unresolved);
        }
    }

    pub fn is_validated(&self) -> bool {
        self.state == CandidateState::Validated
    }
}
