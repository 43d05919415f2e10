//! Durable storage of [`ScheduleRecord`]s, one per owner.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::schedule::ScheduleRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored schedule could not be encoded or decoded: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Stored schedule is unusable: {0}")]
    Corrupt(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Created,
    Updated,
}

/// Keyed by owner. `save` replaces the owner's whole record; there are no
/// field-level updates.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn save(&self, record: &ScheduleRecord) -> Result<SaveKind, StoreError>;

    /// The owner's most recently saved record, or `None` on first use.
    async fn load_latest(&self, owner_id: &str) -> Result<Option<ScheduleRecord>, StoreError>;

    /// Returns whether a record existed.
    async fn delete(&self, owner_id: &str) -> Result<bool, StoreError>;
}

/// One pretty-printed JSON file per owner inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, owner_id: &str) -> PathBuf {
        // Owner ids are opaque, so encode them rather than trusting them as file names.
        self.dir
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(owner_id.as_bytes())))
    }
}

#[async_trait]
impl ScheduleStore for JsonFileStore {
    async fn save(&self, record: &ScheduleRecord) -> Result<SaveKind, StoreError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.record_path(&record.owner_id);
        let kind = if fs::try_exists(&path).await? {
            SaveKind::Updated
        } else {
            SaveKind::Created
        };

        let contents = serde_json::to_string_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, &path).await?;

        info!(owner = %record.owner_id, tasks = record.schedule_tasks.len(), ?kind, "schedule saved");
        Ok(kind)
    }

    async fn load_latest(&self, owner_id: &str) -> Result<Option<ScheduleRecord>, StoreError> {
        let path = self.record_path(owner_id);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(owner = %owner_id, "no saved schedule");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let record: ScheduleRecord = serde_json::from_str(&contents)?;
        if record.owner_id != owner_id {
            return Err(StoreError::Corrupt(format!(
                "record at {:?} belongs to '{}'",
                path, record.owner_id
            )));
        }
        Ok(Some(record))
    }

    async fn delete(&self, owner_id: &str) -> Result<bool, StoreError> {
        match fs::remove_file(self.record_path(owner_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store. Counts writes and can be told to fail, which makes it
/// handy for exercising the save path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, ScheduleRecord>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ScheduleRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn save(&self, record: &ScheduleRecord) -> Result<SaveKind, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }
        let previous = self.lock()?.insert(record.owner_id.clone(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(if previous.is_some() {
            SaveKind::Updated
        } else {
            SaveKind::Created
        })
    }

    async fn load_latest(&self, owner_id: &str) -> Result<Option<ScheduleRecord>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }
        Ok(self.lock()?.get(owner_id).cloned())
    }

    async fn delete(&self, owner_id: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove(owner_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{ScheduleTask, TimeWindow};

    fn record(owner: &str) -> ScheduleRecord {
        let task = ScheduleTask::new("a", "Roast chicken", "06:00".parse().unwrap(), 30).unwrap();
        ScheduleRecord::new(owner, vec!["a".into()], vec![task], TimeWindow::default())
    }

    #[tokio::test]
    async fn test_file_store_upserts_per_owner() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonFileStore::new(dir.path().join("schedules"));

        assert!(store.load_latest("chef/1").await?.is_none());
        assert_eq!(store.save(&record("chef/1")).await?, SaveKind::Created);

        let mut changed = record("chef/1");
        changed.task_id_list.push("b".into());
        assert_eq!(store.save(&changed).await?, SaveKind::Updated);
        store.save(&record("chef-2")).await?;

        let loaded = store.load_latest("chef/1").await?.unwrap();
        assert_eq!(loaded, changed);
        assert_eq!(std::fs::read_dir(store.dir())?.count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_store_delete() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonFileStore::new(dir.path());
        store.save(&record("chef")).await?;
        assert!(store.delete("chef").await?);
        assert!(!store.delete("chef").await?);
        assert!(store.load_latest("chef").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_file_store_reports_garbage() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonFileStore::new(dir.path());
        std::fs::write(store.record_path("chef"), "{not json")?;
        assert!(matches!(
            store.load_latest("chef").await,
            Err(StoreError::Serialization(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_store_failure_switch() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(store.save(&record("chef")).await.is_err());
        assert_eq!(store.write_count(), 0);
        store.set_failing(false);
        assert_eq!(store.save(&record("chef")).await.unwrap(), SaveKind::Created);
        assert_eq!(store.write_count(), 1);
    }
}
