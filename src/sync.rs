//! One sync run: fetch, reconcile, archive, persist.
//!
//! A run holds the store's run lock from load to save. The remote snapshot is
//! drained completely before reconciliation; if that fails the run aborts and
//! the stored snapshot is left as it was. Archive write failures do not abort
//! the run: they are reported per event and their archival ids are kept in
//! `pending_archive` so the next run submits them again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::archive::{ArchiveOutcome, ArchiveWriter};
use crate::config::Config;
use crate::error::Result;
use crate::guard::DuplicateGuard;
use crate::model::{RolloverEvent, Snapshot};
use crate::reconcile::{reconcile, Reconciliation};
use crate::remote::{self, fetch_snapshot, RemoteTaskSource};
use crate::store::{JsonSnapshotStore, SnapshotStore};

/// Identity of a rollover, for reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RolloverSummary {
    pub task_id: String,
    pub archival_id: String,
    pub title: String,
    pub list_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&RolloverEvent> for RolloverSummary {
    fn from(event: &RolloverEvent) -> Self {
        let source = &event.source_task;
        Self {
            task_id: event.original_id().to_string(),
            archival_id: source.id.clone(),
            title: source.title.clone(),
            list_name: source.list_name.clone(),
            completed_at: source.completed_at,
        }
    }
}

/// What one run did.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    #[serde(skip)]
    pub merged: Snapshot,
    pub total_tasks: usize,
    pub archived_tasks: usize,
    /// Rollovers detected in this run.
    pub rollovers: Vec<RolloverSummary>,
    /// Earlier failed archive writes submitted again.
    pub retried: Vec<RolloverSummary>,
    /// Events already covered by a record on the remote.
    pub skipped_duplicates: Vec<RolloverSummary>,
    pub outcomes: Vec<ArchiveOutcome>,
}

impl SyncReport {
    pub fn archived_ok(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.success).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ArchiveOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.success)
    }
}

pub struct SyncEngine {
    source: Arc<dyn RemoteTaskSource>,
    store: Arc<dyn SnapshotStore>,
    guard: DuplicateGuard,
    writer: ArchiveWriter,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn RemoteTaskSource>,
        store: Arc<dyn SnapshotStore>,
        guard: DuplicateGuard,
    ) -> Self {
        let writer = ArchiveWriter::new(guard.marker().clone());
        Self {
            source,
            store,
            guard,
            writer,
        }
    }

    /// Engine wired from configuration: configured source, JSON store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = remote::from_config(&config.source)?;
        let store = Arc::new(JsonSnapshotStore::from_config(&config.store)?);
        let guard = DuplicateGuard::from_config(&config.archive)?;
        Ok(Self::new(source, store, guard))
    }

    /// The last saved merged snapshot.
    pub async fn cached(&self) -> Result<Snapshot> {
        self.store.load().await
    }

    /// Run one reconciliation against the remote source.
    pub async fn run(&self) -> Result<SyncReport> {
        let _guard = self.store.lock_run().await?;
        let previous = self.store.load().await?;

        let fresh = match fetch_snapshot(self.source.as_ref()).await {
            Ok(fresh) => fresh,
            Err(err) => {
                tracing::error!(error = %err, "remote fetch failed; stored snapshot kept");
                return Err(err);
            }
        };

        let Reconciliation {
            mut merged,
            rollovers,
        } = reconcile(&previous, &fresh, Utc::now());

        let retries = retry_events(&merged);
        let rollover_summaries: Vec<RolloverSummary> = rollovers.iter().map(Into::into).collect();
        let retried: Vec<RolloverSummary> = retries.iter().map(Into::into).collect();

        let mut events = rollovers;
        events.extend(retries);
        let (to_write, skipped) = self.guard.partition(events, &fresh);
        for event in &skipped {
            tracing::debug!(
                task_id = %event.original_id(),
                title = %event.source_task.title,
                "already archived remotely; skipping"
            );
        }

        let outcomes = self.writer.archive(self.source.as_ref(), to_write).await;
        merged.pending_archive = outcomes
            .iter()
            .filter(|outcome| !outcome.success)
            .map(|outcome| outcome.event.source_task.id.clone())
            .collect();

        self.store.save(&merged).await?;

        let report = SyncReport {
            total_tasks: merged.len(),
            archived_tasks: merged.archived_count(),
            merged,
            rollovers: rollover_summaries,
            retried,
            skipped_duplicates: skipped.iter().map(Into::into).collect(),
            outcomes,
        };
        tracing::info!(
            tasks = report.total_tasks,
            rollovers = report.rollovers.len(),
            archived = report.archived_ok(),
            failed = report.failed().count(),
            skipped = report.skipped_duplicates.len(),
            "sync run complete"
        );
        Ok(report)
    }
}

/// Events for archival records whose earlier write failed.
fn retry_events(merged: &Snapshot) -> Vec<RolloverEvent> {
    merged
        .pending_archive
        .iter()
        .filter_map(|id| merged.get(id))
        .map(|source| RolloverEvent {
            source_task: source.clone(),
            replacement_task: merged
                .get(source.origin_id())
                .cloned()
                .unwrap_or_else(|| source.clone()),
        })
        .collect()
}
