//! JSON checkpoint file

use crate::domain::entities::CarveState;
use crate::domain::repositories::{CheckpointError, CheckpointStore};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Stores the checkpoint as pretty-printed JSON. Saves go through a
/// temporary file and a rename so a crash never leaves a torn checkpoint.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_error(&self, source: io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.location(),
            source,
        }
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self) -> Result<Option<CarveState>, CheckpointError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| CheckpointError::Corrupt {
                path: self.location(),
                source,
            })
    }

    fn save(&self, state: &CarveState) -> Result<(), CheckpointError> {
        let json = serde_json::to_vec_pretty(state).map_err(|source| CheckpointError::Corrupt {
            path: self.location(),
            source,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let temp = self.temp_path();
        fs::write(&temp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::InputIdentity;

    fn state() -> CarveState {
        CarveState::fresh(InputIdentity {
            path: "disk.img".to_string(),
            size: 10,
            fingerprint: "00".to_string(),
        })
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("nested/state.json"));
        store.save(&state()).unwrap();
        assert_eq!(store.load().unwrap(), Some(state()));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonCheckpointStore::new(&path);
        assert!(matches!(store.load(), Err(CheckpointError::Corrupt { .. })));
    }
}
