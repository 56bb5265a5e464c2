#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use taskkeep::guard::DuplicateGuard;
use taskkeep::model::{Snapshot, TaskListMeta, TaskRecord};
use taskkeep::remote::mock::MockFixture;
use taskkeep::remote::MockTaskSource;
use taskkeep::store::MemorySnapshotStore;
use taskkeep::sync::SyncEngine;
use tempfile::TempDir;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// `t0` shifted by `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

pub fn home() -> TaskListMeta {
    TaskListMeta::new("home", "Home")
}

pub fn done(id: &str, title: &str, completed_at: DateTime<Utc>) -> TaskRecord {
    TaskRecord::completed(id, title, &home(), completed_at, completed_at)
}

pub fn pending(id: &str, title: &str) -> TaskRecord {
    TaskRecord::needs_action(id, title, &home(), at(3600))
}

pub fn snapshot(tasks: Vec<TaskRecord>) -> Snapshot {
    Snapshot::new([home()], tasks)
}

/// Engine over a mock source and an in-memory store, both shared with the test.
pub struct Harness {
    pub source: Arc<MockTaskSource>,
    pub store: MemorySnapshotStore,
    pub engine: SyncEngine,
}

impl Harness {
    pub fn new(remote: Vec<TaskRecord>) -> Self {
        Self::with_store(remote, MemorySnapshotStore::new())
    }

    pub fn with_store(remote: Vec<TaskRecord>, store: MemorySnapshotStore) -> Self {
        let source = Arc::new(MockTaskSource::new(vec![home()], remote));
        let engine = engine_for(&source, &store);
        Self {
            source,
            store,
            engine,
        }
    }

    /// A second engine sharing this harness's source and store.
    pub fn another_engine(&self) -> SyncEngine {
        engine_for(&self.source, &self.store)
    }
}

fn engine_for(source: &Arc<MockTaskSource>, store: &MemorySnapshotStore) -> SyncEngine {
    SyncEngine::new(
        source.clone(),
        Arc::new(store.clone()),
        DuplicateGuard::default(),
    )
}

/// Temp directory holding a config file, a fixture and the snapshot path.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_fixture(&self, tasks: Vec<TaskRecord>) -> PathBuf {
        let fixture = MockFixture {
            lists: vec![home()],
            tasks,
        };
        let path = self.dir.path().join("fixture.json");
        std::fs::write(&path, serde_json::to_string_pretty(&fixture).unwrap()).unwrap();
        path
    }

    pub fn read_fixture(&self) -> MockFixture {
        let raw = std::fs::read_to_string(self.dir.path().join("fixture.json")).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    /// Config using the mock fixture and a snapshot inside this directory.
    pub fn write_config(&self) -> PathBuf {
        let path = self.dir.path().join("taskkeep.toml");
        std::fs::write(
            &path,
            "[source]\nmode = \"mock\"\nfixture = \"fixture.json\"\n\n[store]\npath = \"snapshot.json\"\n",
        )
        .unwrap();
        path
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.path().join("snapshot.json")
    }
}
