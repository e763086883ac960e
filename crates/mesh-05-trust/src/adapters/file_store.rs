//! JSON file trust store.
//!
//! The registry lives in one pretty-printed JSON document. Saves go through
//! a sibling temp file that is fsynced and renamed over the record, so a
//! crash leaves either the old registry or the new one.

use crate::domain::{StoreError, TrustSnapshot};
use crate::ports::TrustStore;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct JsonFileTrustStore {
    path: PathBuf,
}

impl JsonFileTrustStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/trust_registry.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join("trust_registry.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl TrustStore for JsonFileTrustStore {
    fn load(&self) -> Result<Option<TrustSnapshot>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, snapshot: &TrustSnapshot) -> Result<(), StoreError> {
        let io = |e: std::io::Error| StoreError::Io(e.to_string());

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io)?;

        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
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
        File::open(&dir).and_then(|d| d.sync_all()).map_err(io)?;

        debug!(path = %self.path.display(), "Trust registry saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BanProof, BanReason, TrustLevel, DEFAULT_FEDERATION_ID};
    use shared_types::{ContentHash, NodeId, PublicKey, Timestamp};

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileTrustStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileTrustStore::in_dir(dir.path().join("nested"));

        let ban = BanProof::draft(
            NodeId::from("bad"),
            BanReason::DoubleSign,
            ContentHash([1; 32]),
            NodeId::from("admin"),
            TrustLevel::Admin,
            0,
            Timestamp::from_secs(5),
            None,
            DEFAULT_FEDERATION_ID,
        )
        .unwrap();
        let mut snapshot = TrustSnapshot {
            version: 1,
            saved_at: Timestamp::from_secs(6),
            ..TrustSnapshot::default()
        };
        snapshot.trust_levels.insert(NodeId::from("admin"), TrustLevel::Admin);
        snapshot
            .identities
            .insert(NodeId::from("admin"), PublicKey(vec![7; 32]));
        snapshot.processed_evidence.insert(ban.evidence_hash);
        snapshot.bans.insert(NodeId::from("bad"), ban);

        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot));
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileTrustStore::in_dir(dir.path());
        fs::write(store.path(), b"[1, 2").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }
}
