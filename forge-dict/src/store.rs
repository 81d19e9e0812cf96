//! Durable storage of extension dictionaries.
//!
//! A store keeps one [`DictionaryRecord`] per dictionary id. Readers must
//! never observe a half-written record, and [`DictionaryStore::lock`] hands
//! out an exclusive per-id lock that writers hold for a whole
//! load, mutate, persist cycle.
use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use log::{trace, warn};
use parking_lot::RwLock;

use crate::{
    dictionary::{DictionaryId, DictionaryRecord},
    utils::error::{DictError, DictResult},
};

/// Exclusive lock over one dictionary id, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: Option<File>,
}

impl StoreLock {
    /// A lock for stores that are not shared outside the current process.
    pub fn in_process() -> Self {
        Self { file: None }
    }

    fn file(file: File) -> Self {
        Self { file: Some(file) }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file
            && let Err(e) = FileExt::unlock(file)
        {
            warn!("Failed to release dictionary lock: {}", e);
        }
    }
}

pub trait DictionaryStore: Send + Sync {
    /// Ids of every persisted dictionary.
    fn ids(&self) -> DictResult<Vec<DictionaryId>>;

    /// The persisted record of `id`, or `None` if it was never saved.
    fn load(&self, id: &DictionaryId) -> DictResult<Option<DictionaryRecord>>;

    /// Replace the persisted record of `record.id` atomically.
    fn save(&self, record: &DictionaryRecord) -> DictResult<()>;

    /// Block until the exclusive lock of `id` is acquired.
    fn lock(&self, id: &DictionaryId) -> DictResult<StoreLock>;
}

/// Volatile store, for tests and single-process tools.
///
/// In-process writers are already serialized by the allocator, so
/// [`DictionaryStore::lock`] returns an [`StoreLock::in_process`] lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<DictionaryId, DictionaryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DictionaryStore for MemoryStore {
    fn ids(&self) -> DictResult<Vec<DictionaryId>> {
        let mut ids: Vec<_> = self.records.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn load(&self, id: &DictionaryId) -> DictResult<Option<DictionaryRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn save(&self, record: &DictionaryRecord) -> DictResult<()> {
        self.records
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn lock(&self, _id: &DictionaryId) -> DictResult<StoreLock> {
        Ok(StoreLock::in_process())
    }
}

/// One pretty-printed JSON document per dictionary under a directory:
/// `<dir>/<id>.json`, locked through an advisory lock on `<dir>/<id>.json.lock`.
///
/// Saves write a uniquely named temporary file next to the target and rename
/// it over the target, so concurrent readers see either the old or the new
/// record.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, id: &DictionaryId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn lock_path(&self, id: &DictionaryId) -> PathBuf {
        self.dir.join(format!("{}.json.lock", id))
    }

    fn tmp_path(&self, id: &DictionaryId) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        self.dir
            .join(format!("{}.json.tmp.{}.{}", id, std::process::id(), nanos))
    }
}

impl DictionaryStore for FileStore {
    fn ids(&self) -> DictResult<Vec<DictionaryId>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DictError::Io(e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match DictionaryId::new(stem) {
                Ok(id) => ids.push(id),
                Err(_) => warn!("Ignoring {}: not a dictionary id", path.display()),
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load(&self, id: &DictionaryId) -> DictResult<Option<DictionaryRecord>> {
        let path = self.record_path(id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DictError::Io(e)),
        };

        let record: DictionaryRecord =
            serde_json::from_str(&content).map_err(|e| DictError::CorruptDictionary {
                id: id.to_string(),
                reason: format!("{}: {}", path.display(), e),
            })?;
        if &record.id != id {
            return Err(DictError::CorruptDictionary {
                id: id.to_string(),
                reason: format!("{} holds dictionary '{}'", path.display(), record.id),
            });
        }
        trace!("Loaded dictionary '{}' from {}", id, path.display());
        Ok(Some(record))
    }

    fn save(&self, record: &DictionaryRecord) -> DictResult<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.record_path(&record.id);
        let tmp_path = self.tmp_path(&record.id);
        let content = serde_json::to_string_pretty(record)?;
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(DictError::Io(e));
        }
        trace!("Saved dictionary '{}' to {}", record.id, path.display());
        Ok(())
    }

    fn lock(&self, id: &DictionaryId) -> DictResult<StoreLock> {
        let lock_err = |source| DictError::Lock {
            id: id.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(lock_err)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path(id))
            .map_err(lock_err)?;
        file.lock_exclusive().map_err(lock_err)?;
        Ok(StoreLock::file(file))
    }
}
