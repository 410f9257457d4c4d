//! Scan window entity
//!
//! A contiguous byte range read from the input plus its global start
//! offset. Consecutive windows overlap; each window *owns* the header
//! offsets in `[start, start + owned_len)` so every offset is processed by
//! exactly one window.

use bytes::Bytes;
use std::ops::Range;

/// Ranges shorter than `len / COPY_RATIO` are copied out of the window
const COPY_RATIO: usize = 4;

/// An immutable view of one chunk of the input
#[derive(Debug, Clone)]
pub struct ScanWindow {
    index: usize,
    start: u64,
    data: Bytes,
    owned_len: usize,
    at_eof: bool,
}

impl ScanWindow {
    /// Creates a window. `owned_len` is clamped to the data length.
    pub fn new(index: usize, start: u64, data: Bytes, owned_len: usize, at_eof: bool) -> Self {
        let owned_len = owned_len.min(data.len());
        Self {
            index,
            start,
            data,
            owned_len,
            at_eof,
        }
    }

    /// Creates a standalone window covering `data` entirely, used when a
    /// candidate is re-read from the source at its header offset
    pub fn detached(start: u64, data: Vec<u8>, at_eof: bool) -> Self {
        let len = data.len();
        Self::new(usize::MAX, start, Bytes::from(data), len, at_eof)
    }

    /// Sequential index of this window within the session
    pub fn index(&self) -> usize {
        self.index
    }

    /// Global offset of the first byte
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Global offset one past the last byte
    pub fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }

    /// Global offset one past the last owned byte
    pub fn owned_end(&self) -> u64 {
        self.start + self.owned_len as u64
    }

    /// Number of bytes this window is accountable for in progress metrics
    pub fn owned_len(&self) -> usize {
        self.owned_len
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the window's data reaches the end of the input
    pub fn at_eof(&self) -> bool {
        self.at_eof
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether a header at `global` offset belongs to this window
    pub fn owns(&self, global: u64) -> bool {
        global >= self.start && global < self.owned_end()
    }

    /// Local offset of a global offset, if it lies inside the window
    pub fn local(&self, global: u64) -> Option<usize> {
        if global >= self.start && global <= self.end() {
            Some((global - self.start) as usize)
        } else {
            None
        }
    }

    /// Bytes from `global` to the end of the window
    pub fn tail_from(&self, global: u64) -> &[u8] {
        match self.local(global) {
            Some(local) => &self.data[local..],
            None => &[],
        }
    }

    /// Zero-copy slice of a global range. Returns `None` when the range is
    /// not fully contained in the window.
    pub fn slice(&self, range: Range<u64>) -> Option<Bytes> {
        if range.start > range.end || range.start < self.start || range.end > self.end() {
            return None;
        }
        let local_start = (range.start - self.start) as usize;
        let local_end = (range.end - self.start) as usize;
        Some(self.data.slice(local_start..local_end))
    }

    /// Like `slice`, but small ranges get their own buffer so a kept
    /// artifact does not hold the whole window alive
    pub fn extract(&self, range: Range<u64>) -> Option<Bytes> {
        let slice = self.slice(range)?;
        if slice.len() < self.data.len() / COPY_RATIO {
            Some(Bytes::copy_from_slice(&slice))
        } else {
            Some(slice)
        }
    }
}
