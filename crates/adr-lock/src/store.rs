// store.rs — LockStore: keyed lock records in a single JSON file.
//
// File: <project>/.adr/locks.json
//
//   {
//     "version": 1,
//     "locks": {
//       "ADR-0001": { "decision_id": "ADR-0001", "digest": "…", ... }
//     }
//   }
//
// Records are inserted or overwritten, never deleted. Every write goes to
// `locks.json.tmp` first and is renamed into place. An unparseable store is
// an error: it is never reset to empty.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LockError;

const STORE_VERSION: u32 = 1;

/// The recorded fingerprint of an approved decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockRecord {
    pub decision_id: String,
    /// SHA-256 of the canonical form at approval time.
    pub digest: String,
    pub locked_at: DateTime<Utc>,
    /// Whether the file was successfully marked read-only.
    pub is_readonly: bool,
    /// Decision file at approval time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LockFile {
    version: u32,
    #[serde(default)]
    locks: BTreeMap<String, LockRecord>,
}

pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, keyed by decision id. A missing file is empty.
    pub fn load(&self) -> Result<BTreeMap<String, LockRecord>, LockError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read_to_string(&self.path).map_err(|source| LockError::IoError {
            path: self.path.clone(),
            source,
        })?;
        let file: LockFile =
            serde_json::from_str(&data).map_err(|e| LockError::CorruptStore {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        if file.version != STORE_VERSION {
            return Err(LockError::CorruptStore {
                path: self.path.clone(),
                reason: format!("unsupported version {}", file.version),
            });
        }
        Ok(file.locks)
    }

    pub fn get(&self, decision_id: &str) -> Result<Option<LockRecord>, LockError> {
        Ok(self.load()?.remove(decision_id))
    }

    /// Insert or overwrite the record for `record.decision_id`.
    pub fn put(&self, record: LockRecord) -> Result<(), LockError> {
        let mut locks = self.load()?;
        locks.insert(record.decision_id.clone(), record);
        self.write(LockFile {
            version: STORE_VERSION,
            locks,
        })
    }

    fn write(&self, file: LockFile) -> Result<(), LockError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| LockError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut json = serde_json::to_string_pretty(&file)?;
        json.push('\n');

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|source| LockError::IoError {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| LockError::IoError {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str, digest: &str) -> LockRecord {
        LockRecord {
            decision_id: id.to_string(),
            digest: digest.to_string(),
            locked_at: Utc::now(),
            is_readonly: false,
            file: None,
        }
    }

    #[test]
    fn missing_store_is_empty() {
        let dir = tempdir().unwrap();
        let store = LockStore::new(dir.path().join(".adr/locks.json"));
        assert!(store.load().unwrap().is_empty());
        assert!(store.get("ADR-0001").unwrap().is_none());
    }

    #[test]
    fn put_inserts_and_overwrites() {
        let dir = tempdir().unwrap();
        let store = LockStore::new(dir.path().join(".adr/locks.json"));
        store.put(record("ADR-0001", "aaa")).unwrap();
        store.put(record("ADR-0002", "bbb")).unwrap();
        store.put(record("ADR-0001", "ccc")).unwrap();

        let all = store.load().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["ADR-0001"].digest, "ccc");
        assert!(!dir.path().join(".adr/locks.json.tmp").exists());
    }

    #[test]
    fn corrupt_store_is_an_error_and_left_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locks.json");
        fs::write(&path, "{ broken").unwrap();
        let store = LockStore::new(&path);

        assert!(matches!(store.load(), Err(LockError::CorruptStore { .. })));
        assert!(store.put(record("ADR-0001", "aaa")).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ broken");
    }
}
