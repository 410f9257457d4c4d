//! Memory-mapped file source
//!
//! Zero-copy access through the page cache; reads never take a lock.

use super::open_regular;
use crate::domain::repositories::{ByteSource, SourceError};
use memmap2::Mmap;
use std::path::Path;

/// A regular file mapped read-only into memory
pub struct MmapSource {
    /// `None` for empty files, which cannot be mapped
    map: Option<Mmap>,
    path: String,
}

impl MmapSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let (file, size) = open_regular(path)?;
        let map = if size == 0 {
            None
        } else {
            // SAFETY: the file is opened read-only and never written through
            // this mapping
            Some(unsafe { Mmap::map(&file) }?)
        };
        Ok(Self {
            map,
            path: path.display().to_string(),
        })
    }

    /// The whole mapped input
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl ByteSource for MmapSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, SourceError> {
        let data = self.as_slice();
        if offset >= data.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn describe(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_regular_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"mapped bytes").unwrap();
        let source = MmapSource::open(file.path()).unwrap();
        assert_eq!(source.len(), 12);
        assert_eq!(source.read_vec_at(7, 100).unwrap(), b"bytes");
    }

    #[test]
    fn empty_files_have_no_mapping() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = MmapSource::open(file.path()).unwrap();
        assert!(source.is_empty());
        assert_eq!(source.read_vec_at(0, 4).unwrap(), Vec::<u8>::new());
    }
}
