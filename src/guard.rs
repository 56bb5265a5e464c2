//! Duplicate guard for compensating archive writes.
//!
//! Records the archive writer creates carry the archive marker in their notes,
//! followed by a fingerprint derived from the original task id and completion
//! time. A rollover is already archived remotely when a completed remote
//! record carries its fingerprint, or (for records without one) carries the
//! marker, has the same title and a completion time within the tolerance
//! window.

use chrono::Duration;
use uuid::Uuid;

use std::collections::BTreeSet;

use crate::config::ArchiveConfig;
use crate::error::Result;
use crate::model::{RolloverEvent, Snapshot, TaskRecord};

/// Default archive marker appended to notes of archival writes.
pub const DEFAULT_ARCHIVE_MARKER: &str = "#taskkeep-archived";

/// Default completion-time tolerance for the heuristic match.
pub const DEFAULT_TOLERANCE_SECS: i64 = 60;

const FINGERPRINT_NAMESPACE: Uuid = Uuid::NAMESPACE_URL;

/// The notes token that identifies records written by the archive writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMarker {
    text: String,
}

impl ArchiveMarker {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Deterministic reference for the completion `task` records.
    pub fn fingerprint(&self, task: &TaskRecord) -> Option<String> {
        let completed_at = task.completed_at?;
        let name = format!(
            "taskkeep:{}:{}",
            task.origin_id(),
            completed_at.timestamp_millis()
        );
        let id = Uuid::new_v5(&FINGERPRINT_NAMESPACE, name.as_bytes());
        Some(format!("[ref:{id}]"))
    }

    /// Notes for the archival write: original notes, then marker and fingerprint.
    pub fn annotate(&self, task: &TaskRecord) -> String {
        let mut tag = self.text.clone();
        if let Some(fingerprint) = self.fingerprint(task) {
            tag.push(' ');
            tag.push_str(&fingerprint);
        }
        match task.notes.as_deref().map(str::trim_end) {
            Some(notes) if !notes.is_empty() => format!("{notes}\n\n{tag}"),
            _ => tag,
        }
    }

    /// Ids of live records in `snapshot` that are remote copies of one of its
    /// archival records, matched by fingerprint.
    pub fn remote_copies(&self, snapshot: &Snapshot) -> BTreeSet<String> {
        let fingerprints: Vec<String> = snapshot
            .tasks
            .values()
            .filter(|task| task.is_archived)
            .filter_map(|task| self.fingerprint(task))
            .collect();

        snapshot
            .tasks
            .values()
            .filter(|task| !task.is_archived && task.is_completed())
            .filter(|task| task.notes_contain(&self.text))
            .filter(|task| fingerprints.iter().any(|fp| task.notes_contain(fp)))
            .map(|task| task.id.clone())
            .collect()
    }
}

impl Default for ArchiveMarker {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_MARKER)
    }
}

#[derive(Debug, Clone)]
pub struct DuplicateGuard {
    marker: ArchiveMarker,
    tolerance: Duration,
}

impl DuplicateGuard {
    pub fn new(marker: ArchiveMarker, tolerance: Duration) -> Self {
        Self { marker, tolerance }
    }

    pub fn from_config(config: &ArchiveConfig) -> Result<Self> {
        Ok(Self::new(
            ArchiveMarker::new(config.marker.clone()),
            config.tolerance()?,
        ))
    }

    pub fn marker(&self) -> &ArchiveMarker {
        &self.marker
    }

    /// Whether `remote` already holds a compensating record for `event`.
    pub fn is_duplicate(&self, event: &RolloverEvent, remote: &Snapshot) -> bool {
        let source = &event.source_task;
        let fingerprint = self.marker.fingerprint(source);

        remote
            .tasks
            .values()
            .filter(|candidate| candidate.is_completed())
            .any(|candidate| {
                if let Some(fingerprint) = fingerprint.as_deref() {
                    if candidate.notes_contain(fingerprint) {
                        return true;
                    }
                }
                candidate.title == source.title
                    && candidate.notes_contain(self.marker.text())
                    && self.within_tolerance(candidate, source)
            })
    }

    /// Split events into those still needing a write and those already covered.
    pub fn partition(
        &self,
        events: Vec<RolloverEvent>,
        remote: &Snapshot,
    ) -> (Vec<RolloverEvent>, Vec<RolloverEvent>) {
        events
            .into_iter()
            .partition(|event| !self.is_duplicate(event, remote))
    }

    fn within_tolerance(&self, a: &TaskRecord, b: &TaskRecord) -> bool {
        match (a.completed_at, b.completed_at) {
            (Some(a), Some(b)) => {
                (a - b).num_milliseconds().abs() < self.tolerance.num_milliseconds()
            }
            _ => false,
        }
    }
}

impl Default for DuplicateGuard {
    fn default() -> Self {
        Self::new(
            ArchiveMarker::default(),
            Duration::seconds(DEFAULT_TOLERANCE_SECS),
        )
    }
}
