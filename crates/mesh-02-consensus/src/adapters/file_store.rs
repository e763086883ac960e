//! File-backed state store.
//!
//! One JSON document per node at `<dir>/<node_id>_state.json`. Every save
//! writes a sibling temp file, fsyncs it, renames it over the record and
//! fsyncs the directory, so a crash leaves either the old or the new record.

use crate::domain::{PersistentState, StoreError};
use crate::ports::StateStore;
use shared_types::NodeId;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl AsRef<Path>, node_id: &NodeId) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}_state.json", node_id)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<PersistentState>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, state: &PersistentState) -> Result<(), StoreError> {
        let io = |e: std::io::Error| StoreError::Io(e.to_string());

        let dir = self
            .path
            .parent()
            .ok_or_else(|| StoreError::Io("state path has no parent directory".into()))?;
        fs::create_dir_all(dir).map_err(io)?;

        let bytes = serde_json::to_vec(state).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.tmp_path();
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)
                .map_err(io)?;
            file.write_all(&bytes).map_err(io)?;
            file.sync_all().map_err(io)?;
        }
        fs::rename(&tmp, &self.path).map_err(io)?;

        #[cfg(unix)]
        File::open(dir).and_then(|d| d.sync_all()).map_err(io)?;

        Ok(())
    }
}
