//! Byte source trait
//!
//! Defines the interface for reading raw data from the carving input.
//! This abstraction lets the domain work with plain files, memory maps or
//! in-memory buffers alike.

use std::io;
use thiserror::Error;

/// Errors that can occur when opening or reading an input
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Input not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not a regular file: {0}")]
    NotAFile(String),

    #[error("Read error at offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A read-only, randomly addressable input
///
/// Reads are positional so several workers can read concurrently without
/// sharing a cursor. The input is never mutated.
pub trait ByteSource: Send + Sync {
    /// Reads up to `buf.len()` bytes at `offset`, returning the count read.
    /// Returns 0 at or past the end of input.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, SourceError>;

    /// Total size of the input in bytes
    fn len(&self) -> u64;

    /// Human-readable name of the input (usually its path)
    fn describe(&self) -> &str;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills as much of `buf` as the input allows, retrying short reads.
    /// Returns the number of bytes read, which is less than `buf.len()` only
    /// at the end of input.
    fn read_full_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, SourceError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read_at(offset + filled as u64, &mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(SourceError::Io(e) | SourceError::Read { source: e, .. })
                    if e.kind() == io::ErrorKind::Interrupted =>
                {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Reads up to `len` bytes at `offset` into a new buffer
    fn read_vec_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, SourceError> {
        let available = self.len().saturating_sub(offset).min(len as u64) as usize;
        let mut buf = vec![0u8; available];
        let read = self.read_full_at(offset, &mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }
}

/// In-memory inputs, mostly useful for tests and embedding
impl ByteSource for Vec<u8> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, SourceError> {
        if offset >= self.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }

    fn len(&self) -> u64 {
        Vec::len(self) as u64
    }

    fn describe(&self) -> &str {
        "<memory>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns at most 3 bytes per call to exercise short-read handling
    struct Trickle(Vec<u8>);

    impl ByteSource for Trickle {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, SourceError> {
            let n = buf.len().min(3);
            self.0.read_at(offset, &mut buf[..n])
        }

        fn len(&self) -> u64 {
            self.0.len() as u64
        }

        fn describe(&self) -> &str {
            "trickle"
        }
    }

    #[test]
    fn read_full_at_retries_short_reads() {
        let source = Trickle((0u8..20).collect());
        let mut buf = [0u8; 10];
        assert_eq!(source.read_full_at(5, &mut buf).unwrap(), 10);
        assert_eq!(buf[0], 5);
        assert_eq!(buf[9], 14);
    }

    #[test]
    fn read_vec_at_stops_at_end() {
        let source: Vec<u8> = (0u8..20).collect();
        assert_eq!(source.read_vec_at(15, 100).unwrap(), vec![15, 16, 17, 18, 19]);
        assert!(source.read_vec_at(50, 10).unwrap().is_empty());
    }
}
