// Flat per-record JSON store. One document per record in a configured
// directory, fully loaded into memory at startup. The DashMap index
// doubles as the per-record write lock the timers rely on.

use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),
}

/// Anything the store can hold: serializable, cloneable, self-identifying.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn record_id(&self) -> &str;
}

impl Record for crate::settlement::Settlement {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for crate::verification::VerificationRecord {
    fn record_id(&self) -> &str {
        &self.request.settlement_id
    }
}

impl Record for crate::challenge::Challenge {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Id-keyed registry with one JSON file per record.
pub struct FileStore<T: Record> {
    dir: PathBuf,
    records: DashMap<String, T>,
}

impl<T: Record> FileStore<T> {
    /// Open a store rooted at `dir`, creating the directory if needed
    /// and loading every parseable document in it. Documents that fail
    /// to parse are skipped with a warning, not fatal.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let records = DashMap::new();
        let mut loaded = 0usize;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::load_one(&path) {
                Ok(record) => {
                    records.insert(record.record_id().to_string(), record);
                    loaded += 1;
                }
                Err(e) => warn!("skipping unreadable record {}: {}", path.display(), e),
            }
        }
        if loaded > 0 {
            info!("loaded {} records from {}", loaded, dir.display());
        }
        Ok(FileStore { dir, records })
    }

    fn load_one(path: &Path) -> Result<T, StoreError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Atomic write: temp file in the same directory, then rename.
    fn persist(&self, record: &T) -> Result<(), StoreError> {
        let path = self.path_for(record.record_id());
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Insert a new record; rejects an id already present.
    pub fn insert(&self, record: T) -> Result<(), StoreError> {
        let id = record.record_id().to_string();
        if self.records.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        self.persist(&record)?;
        self.records.insert(id, record);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.records.get(id).map(|r| r.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Mutate one record under its entry lock and persist the result.
    /// The closure's return value is passed through, so callers can
    /// thread their own Result out of the critical section.
    pub fn with_mut<R>(&self, id: &str, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let out = f(entry.value_mut());
        self.persist(entry.value())?;
        Ok(out)
    }

    pub fn remove(&self, id: &str) -> Result<T, StoreError> {
        let (_, record) = self
            .records
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(record)
    }

    pub fn all(&self) -> Vec<T> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
