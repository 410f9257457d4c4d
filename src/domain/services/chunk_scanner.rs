//! Chunk scanner service
//!
//! Streams an input in bounded windows. Each window is the carry retained
//! from the previous one followed by up to `chunk_size` fresh bytes; the
//! carry is owned by the next window, so owned ranges partition the input.

use crate::domain::entities::ScanWindow;
use crate::domain::repositories::{ByteSource, SourceError};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;

/// Scanner lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    /// No window produced yet
    Reading,
    /// A carry from the previous window is pending
    Overlapping,
    /// The last window has been produced
    Exhausted,
}

/// Sequential window producer over a `ByteSource`
pub struct ChunkScanner {
    source: Arc<dyn ByteSource>,
    chunk_size: usize,
    overlap_size: usize,
    /// Global offset of the next fresh byte
    position: u64,
    /// Tail of the previous window, ending at `position`
    carry: Bytes,
    next_index: usize,
    state: ScannerState,
}

impl ChunkScanner {
    pub fn new(source: Arc<dyn ByteSource>, chunk_size: usize, overlap_size: usize) -> Self {
        Self::starting_at(source, 0, chunk_size, overlap_size)
    }

    /// Creates a scanner whose first window starts at `offset`
    pub fn starting_at(
        source: Arc<dyn ByteSource>,
        offset: u64,
        chunk_size: usize,
        overlap_size: usize,
    ) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
            overlap_size,
            position: offset,
            carry: Bytes::new(),
            next_index: 0,
            state: ScannerState::Reading,
        }
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    /// Global offset of the next fresh byte to read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Produces the next window, or `None` at end of input
    pub fn next_window(&mut self) -> Result<Option<ScanWindow>, SourceError> {
        if self.state == ScannerState::Exhausted {
            return Ok(None);
        }

        let remaining = self.source.len().saturating_sub(self.position);
        let wanted = (self.chunk_size as u64).min(remaining) as usize;
        let fresh = self.source.read_vec_at(self.position, wanted)?;
        // a short read means the input ended early
        let at_eof = fresh.len() < wanted || remaining == wanted as u64;

        if fresh.is_empty() && self.carry.is_empty() {
            self.state = ScannerState::Exhausted;
            return Ok(None);
        }

        let start = self.position - self.carry.len() as u64;
        let data = if self.carry.is_empty() {
            Bytes::from(fresh)
        } else {
            let mut joined = BytesMut::with_capacity(self.carry.len() + fresh.len());
            joined.extend_from_slice(&self.carry);
            joined.extend_from_slice(&fresh);
            joined.freeze()
        };
        self.position = start + data.len() as u64;

        let owned_len = if at_eof {
            self.state = ScannerState::Exhausted;
            self.carry = Bytes::new();
            data.len()
        } else {
            self.state = ScannerState::Overlapping;
            let owned = data.len() - self.overlap_size.min(data.len());
            self.carry = data.slice(owned..);
            owned
        };

        let window = ScanWindow::new(self.next_index, start, data, owned_len, at_eof);
        self.next_index += 1;
        Ok(Some(window))
    }
}

impl Iterator for ChunkScanner {
    type Item = Result<ScanWindow, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_window().transpose()
    }
}
