//! Local snapshot store
//!
//! Persists the last merged [`Snapshot`] between runs. Both operations are
//! whole-snapshot. A store also hands out a run guard so that two sync runs
//! against the same store never interleave their load → reconcile → save.
//!
//! # File layout
//!
//! ```text
//! <store.path>            # snapshot envelope (pretty JSON)
//! <store.path>.lock       # run lock, held for the duration of a sync run
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::lock::{self, FileLock};
use crate::model::Snapshot;

pub const SNAPSHOT_SCHEMA_VERSION: &str = "taskkeep.snapshot.v1";

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    schema_version: String,
    saved_at: DateTime<Utc>,
    snapshot: Snapshot,
}

/// Held for the duration of one sync run; released on drop.
#[derive(Debug)]
pub enum RunGuard {
    File(FileLock),
    Memory(OwnedMutexGuard<()>),
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Last saved snapshot, or the empty snapshot if none was saved yet.
    async fn load(&self) -> Result<Snapshot>;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Exclusive access for one run.
    async fn lock_run(&self) -> Result<RunGuard>;
}

/// Snapshot persisted as a JSON file, written atomically.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>, lock_timeout_ms: u64) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(config.snapshot_path()?, config.lock_timeout_ms))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        lock::lock_path_for(&self.path)
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load(&self) -> Result<Snapshot> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no snapshot yet");
                return Ok(Snapshot::empty());
            }
            Err(err) => return Err(Error::Io(err)),
        };

        let file: SnapshotFile = serde_json::from_str(&content).map_err(|err| {
            Error::InvalidData(format!("{}: {}", self.path.display(), err))
        })?;
        if file.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(Error::InvalidData(format!(
                "{}: unsupported schema_version '{}' (expected {})",
                self.path.display(),
                file.schema_version,
                SNAPSHOT_SCHEMA_VERSION
            )));
        }
        Ok(file.snapshot)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let file = SnapshotFile {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            saved_at: Utc::now(),
            snapshot: snapshot.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        lock::write_atomic(&self.path, json.as_bytes())?;
        tracing::debug!(path = %self.path.display(), tasks = snapshot.len(), "snapshot saved");
        Ok(())
    }

    async fn lock_run(&self) -> Result<RunGuard> {
        let lock = FileLock::acquire(self.lock_path(), self.lock_timeout_ms).await?;
        Ok(RunGuard::File(lock))
    }
}

/// In-process store, shared by clones.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    snapshot: Arc<Mutex<Snapshot>>,
    saves: Arc<Mutex<usize>>,
    run_lock: Arc<Mutex<()>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(snapshot)),
            ..Self::default()
        }
    }

    /// Current stored snapshot.
    pub async fn current(&self) -> Snapshot {
        self.snapshot.lock().await.clone()
    }

    /// Number of completed saves.
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.current().await)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.snapshot.lock().await = snapshot.clone();
        *self.saves.lock().await += 1;
        Ok(())
    }

    async fn lock_run(&self) -> Result<RunGuard> {
        Ok(RunGuard::Memory(Arc::clone(&self.run_lock).lock_owned().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskListMeta, TaskRecord};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        let list = TaskListMeta::new("list-1", "Inbox");
        let when = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        let mut snapshot = Snapshot::new(
            [list.clone()],
            [
                TaskRecord::completed("t1", "Done", &list, when, when),
                TaskRecord::needs_action("t2", "Open", &list, when).with_due(when),
            ],
        );
        snapshot.pending_archive.insert("archive:t1:1".to_string());
        snapshot
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("snapshot.json"), 1000);
        assert_eq!(store.load().await.unwrap(), Snapshot::empty());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("state").join("snapshot.json"), 1000);
        let snapshot = sample();

        store.save(&snapshot).await.unwrap();
        assert_eq!(store.load().await.unwrap(), snapshot);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains(SNAPSHOT_SCHEMA_VERSION));
    }

    #[tokio::test]
    async fn unknown_schema_is_invalid_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(
            &path,
            r#"{"schema_version":"other.v9","saved_at":"2024-01-01T00:00:00Z","snapshot":{}}"#,
        )
        .unwrap();

        let store = JsonSnapshotStore::new(&path, 1000);
        assert!(matches!(store.load().await, Err(Error::InvalidData(_))));
    }

    #[tokio::test]
    async fn corrupt_file_is_invalid_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonSnapshotStore::new(&path, 1000);
        assert!(matches!(store.load().await, Err(Error::InvalidData(_))));
    }

    #[tokio::test]
    async fn second_run_lock_times_out() {
        let dir = TempDir::new().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("snapshot.json"), 60);

        let _guard = store.lock_run().await.unwrap();
        assert!(matches!(store.lock_run().await, Err(Error::LockFailed(_))));
    }

    #[tokio::test]
    async fn memory_store_counts_saves() {
        let store = MemorySnapshotStore::new();
        store.save(&sample()).await.unwrap();
        store.save(&sample()).await.unwrap();

        assert_eq!(store.save_count().await, 2);
        assert_eq!(store.load().await.unwrap(), sample());
    }
}
