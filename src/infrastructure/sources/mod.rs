//! Input sources
//!
//! `ByteSource` implementations over regular files.

mod file_source;
mod mmap_source;

pub use file_source::FileSource;
pub use mmap_source::MmapSource;

use crate::domain::repositories::SourceError;
use std::fs::{self, File};
use std::io;
use std::path::Path;

fn classify(path: &Path, e: io::Error) -> SourceError {
    match e.kind() {
        io::ErrorKind::NotFound => SourceError::NotFound(path.display().to_string()),
        io::ErrorKind::PermissionDenied => SourceError::PermissionDenied(path.display().to_string()),
        _ => SourceError::Io(e),
    }
}

/// Opens `path` read-only, refusing anything but a regular file
fn open_regular(path: &Path) -> Result<(File, u64), SourceError> {
    let metadata = fs::metadata(path).map_err(|e| classify(path, e))?;
    if !metadata.is_file() {
        return Err(SourceError::NotAFile(path.display().to_string()));
    }
    let file = File::open(path).map_err(|e| classify(path, e))?;
    Ok((file, metadata.len()))
}
