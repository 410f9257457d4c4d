//! Positional-read file source
//!
//! Reads with `pread`-style calls so workers never share a file cursor.

use super::open_regular;
use crate::domain::repositories::{ByteSource, SourceError};
use std::fs::File;
use std::path::Path;

/// A regular file read through positional reads
pub struct FileSource {
    file: File,
    path: String,
    size: u64,
    #[cfg(not(any(unix, windows)))]
    cursor: parking_lot::Mutex<()>,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let (file, size) = open_regular(path)?;
        Ok(Self {
            file,
            path: path.display().to_string(),
            size,
            #[cfg(not(any(unix, windows)))]
            cursor: parking_lot::Mutex::new(()),
        })
    }

    #[cfg(unix)]
    fn read_raw(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.read_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_raw(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file.seek_read(buf, offset)
    }

    #[cfg(not(any(unix, windows)))]
    fn read_raw(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        use std::io::{Read, Seek, SeekFrom};
        let _guard = self.cursor.lock();
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.read(buf)
    }
}

impl ByteSource for FileSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, SourceError> {
        if offset >= self.size {
            return Ok(0);
        }
        let available = (self.size - offset).min(buf.len() as u64) as usize;
        self.read_raw(offset, &mut buf[..available])
            .map_err(|source| SourceError::Read { offset, source })
    }

    fn len(&self) -> u64 {
        self.size
    }

    fn describe(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_at_offsets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        let source = FileSource::open(file.path()).unwrap();
        assert_eq!(source.len(), 10);
        assert_eq!(source.read_vec_at(4, 3).unwrap(), b"456");
        assert_eq!(source.read_vec_at(8, 10).unwrap(), b"89");
    }

    #[test]
    fn rejects_missing_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileSource::open(dir.path().join("absent.img")),
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(FileSource::open(dir.path()), Err(SourceError::NotAFile(_))));
    }
}
