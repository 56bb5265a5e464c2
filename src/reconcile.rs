//! Reconciliation of the retained local snapshot with a fresh remote one.
//!
//! The remote source is authoritative for live state and the local snapshot
//! is authoritative for history. A task that was completed locally but comes
//! back from the remote as needing action has rolled over: its completion is
//! preserved as an archival record and reported as a [`RolloverEvent`].

use chrono::{DateTime, Utc};

use crate::model::{RolloverEvent, Snapshot, TaskStatus};

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub merged: Snapshot,
    pub rollovers: Vec<RolloverEvent>,
}

/// Merge `previous` (local) with `fresh` (remote).
///
/// `detected_at` feeds the synthesized archival ids, so two rollovers of the
/// same task detected in different runs never share an id.
pub fn reconcile(
    previous: &Snapshot,
    fresh: &Snapshot,
    detected_at: DateTime<Utc>,
) -> Reconciliation {
    let mut merged = Snapshot {
        lists: fresh.lists.clone(),
        ..Snapshot::empty()
    };
    let mut rollovers = Vec::new();

    for (id, local) in &previous.tasks {
        match fresh.get(id) {
            Some(remote)
                if local.status == TaskStatus::Completed
                    && remote.status == TaskStatus::NeedsAction =>
            {
                let archival = local.archival_copy(detected_at);
                let mut live = remote.clone();
                live.is_recurring = true;

                tracing::info!(
                    task_id = %id,
                    archival_id = %archival.id,
                    title = %local.title,
                    "rollover detected"
                );

                merged.insert_task(archival.clone());
                merged.insert_task(live.clone());
                rollovers.push(RolloverEvent {
                    source_task: archival,
                    replacement_task: live,
                });
            }
            Some(remote) => {
                let mut live = remote.clone();
                live.is_recurring = local.is_recurring || remote.is_recurring;
                merged.insert_task(live);
            }
            None if local.is_completed() || local.is_archived => {
                let mut retained = local.clone();
                retained.is_archived = true;
                merged.insert_task(retained);
            }
            None => {
                tracing::debug!(task_id = %id, "pending task vanished remotely; dropping");
            }
        }
    }

    for (id, remote) in &fresh.tasks {
        if !previous.contains(id) {
            merged.insert_task(remote.clone());
        }
    }

    merged.pending_archive = previous
        .pending_archive
        .iter()
        .filter(|id| merged.contains(id))
        .cloned()
        .collect();

    Reconciliation { merged, rollovers }
}
