//! Durable record of which models were loaded in a prior process lifetime.
//!
//! Consulted once at startup and updated on every load/unload. Last write
//! wins; the startup reload pass tolerates stale entries and prunes them.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

const STATE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt state file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One persisted "this model was loaded" entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedModelRecord {
    pub model_id: String,
    pub model_type: String,
    pub loaded_at: DateTime<Utc>,
}

impl PersistedModelRecord {
    pub fn now(model_id: impl Into<String>, model_type: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            model_type: model_type.into(),
            loaded_at: Utc::now(),
        }
    }
}

/// Key-value substrate for persisted records, keyed by `model_id`.
pub trait ModelStore: Send + Sync {
    /// All records, oldest first.
    fn list_records(&self) -> Result<Vec<PersistedModelRecord>, StoreError>;

    /// Insert, replacing any record with the same `model_id`.
    fn add_record(&self, record: PersistedModelRecord) -> Result<(), StoreError>;

    /// Returns whether a record was removed.
    fn remove_record(&self, model_id: &str) -> Result<bool, StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

fn sort_oldest_first(records: &mut [PersistedModelRecord]) {
    records.sort_by(|a, b| {
        a.loaded_at
            .cmp(&b.loaded_at)
            .then_with(|| a.model_id.cmp(&b.model_id))
    });
}

/// Process-local store. State does not survive restarts.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, PersistedModelRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelStore for MemoryStore {
    fn list_records(&self) -> Result<Vec<PersistedModelRecord>, StoreError> {
        let mut records: Vec<_> = self.records.iter().map(|e| e.value().clone()).collect();
        sort_oldest_first(&mut records);
        Ok(records)
    }

    fn add_record(&self, record: PersistedModelRecord) -> Result<(), StoreError> {
        self.records.insert(record.model_id.clone(), record);
        Ok(())
    }

    fn remove_record(&self, model_id: &str) -> Result<bool, StoreError> {
        Ok(self.records.remove(model_id).is_some())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.records.clear();
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    models: Vec<PersistedModelRecord>,
}

/// JSON file store. Every mutation rewrites the file through a temp file
/// and an atomic rename, so readers never see a partial write.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<PersistedModelRecord>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let state: StateFile =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        if state.version != STATE_VERSION {
            return Err(StoreError::Corrupt {
                path: self.path.clone(),
                reason: format!("unsupported state version {}", state.version),
            });
        }
        Ok(state.models)
    }

    /// Records to start a mutation from. A corrupt file is moved aside to
    /// `<path>.corrupt` and replaced, so one bad write does not disable
    /// persistence for every later process.
    fn read_for_update(&self) -> Result<Vec<PersistedModelRecord>, StoreError> {
        match self.read() {
            Err(StoreError::Corrupt { path, reason }) => {
                let backup = self.backup_path();
                match std::fs::rename(&path, &backup) {
                    Ok(()) => warn!(
                        path = %path.display(),
                        backup = %backup.display(),
                        reason = %reason,
                        "corrupt model state file moved aside; starting empty"
                    ),
                    Err(e) => warn!(
                        path = %path.display(),
                        reason = %reason,
                        error = %e,
                        "corrupt model state file could not be moved aside; overwriting"
                    ),
                }
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn write(&self, mut models: Vec<PersistedModelRecord>) -> Result<(), StoreError> {
        sort_oldest_first(&mut models);
        let state = StateFile {
            version: STATE_VERSION,
            models,
        };
        let json = serde_json::to_vec_pretty(&state)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl ModelStore for JsonFileStore {
    fn list_records(&self) -> Result<Vec<PersistedModelRecord>, StoreError> {
        let mut records = self.read()?;
        sort_oldest_first(&mut records);
        Ok(records)
    }

    fn add_record(&self, record: PersistedModelRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut records = self.read_for_update()?;
        records.retain(|r| r.model_id != record.model_id);
        records.push(record);
        self.write(records)
    }

    fn remove_record(&self, model_id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();
        let readable = self.read().is_ok();
        let mut records = self.read_for_update()?;
        let before = records.len();
        records.retain(|r| r.model_id != model_id);
        if records.len() == before {
            if !readable {
                self.write(records)?;
            }
            return Ok(false);
        }
        self.write(records)?;
        Ok(true)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        self.write(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_replaces_same_id() {
        let store = MemoryStore::new();
        store.add_record(PersistedModelRecord::now("org/a", "basic")).unwrap();
        store.add_record(PersistedModelRecord::now("org/a", "basic")).unwrap();
        store.add_record(PersistedModelRecord::now("org/b", "premium")).unwrap();
        assert_eq!(store.list_records().unwrap().len(), 2);

        assert!(store.remove_record("org/a").unwrap());
        assert!(!store.remove_record("org/a").unwrap());
        store.clear().unwrap();
        assert!(store.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("models.json");

        let store = JsonFileStore::new(&path);
        assert!(store.list_records().unwrap().is_empty());
        store.add_record(PersistedModelRecord::now("org/a", "basic")).unwrap();
        store.add_record(PersistedModelRecord::now("org/b", "premium")).unwrap();
        drop(store);

        let reopened = JsonFileStore::new(&path);
        let records = reopened.list_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].model_id, "org/a");

        assert!(reopened.remove_record("org/a").unwrap());
        assert_eq!(reopened.list_records().unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.list_records(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_corrupt_file_is_replaced_on_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, "{trunc").unwrap();
        let store = JsonFileStore::new(&path);

        store.add_record(PersistedModelRecord::now("org/a", "basic")).unwrap();
        let records = store.list_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model_id, "org/a");

        let backup = dir.path().join("models.json.corrupt");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{trunc");
    }

    #[test]
    fn test_remove_on_corrupt_file_rewrites_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, r#"{"version": 7, "models": []}"#).unwrap();
        let store = JsonFileStore::new(&path);

        assert!(!store.remove_record("org/a").unwrap());
        assert!(store.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("models.json"));
        store.add_record(PersistedModelRecord::now("org/a", "basic")).unwrap();
        store.clear().unwrap();
        assert!(store.list_records().unwrap().is_empty());
    }
}
