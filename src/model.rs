//! Task records, list metadata and snapshots.
//!
//! A [`Snapshot`] is a point-in-time view of every list and task, either the
//! merged state retained locally or the state freshly drained from the remote
//! source. Tasks are keyed by id, so a snapshot never holds two records with
//! the same id.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of synthesized archival ids. Remote ids never contain it.
pub const ARCHIVE_ID_PREFIX: &str = "archive:";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NeedsAction,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskListMeta {
    pub id: String,
    pub title: String,
}

impl TaskListMeta {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub list_id: String,
    pub list_name: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_recurring: bool,
}

impl TaskRecord {
    /// A pending task. `completed_at` stays unset.
    pub fn needs_action(
        id: impl Into<String>,
        title: impl Into<String>,
        list: &TaskListMeta,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::NeedsAction,
            completed_at: None,
            due_at: None,
            updated_at,
            notes: None,
            list_id: list.id.clone(),
            list_name: list.title.clone(),
            is_archived: false,
            is_recurring: false,
        }
    }

    /// A completed task.
    pub fn completed(
        id: impl Into<String>,
        title: impl Into<String>,
        list: &TaskListMeta,
        completed_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: TaskStatus::Completed,
            completed_at: Some(completed_at),
            ..Self::needs_action(id, title, list, updated_at)
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_due(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_recurring(mut self, recurring: bool) -> Self {
        self.is_recurring = recurring;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Timestamp used for presentation ordering.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.updated_at)
    }

    pub fn notes_contain(&self, needle: &str) -> bool {
        self.notes
            .as_deref()
            .map(|notes| notes.contains(needle))
            .unwrap_or(false)
    }

    /// Copy of this record preserved under a synthesized archival id.
    pub fn archival_copy(&self, detected_at: DateTime<Utc>) -> TaskRecord {
        TaskRecord {
            id: archival_id(&self.id, detected_at),
            is_archived: true,
            is_recurring: true,
            ..self.clone()
        }
    }

    /// Id of the live task this record was archived from. Live records
    /// return their own id.
    pub fn origin_id(&self) -> &str {
        archival_origin(&self.id).unwrap_or(&self.id)
    }
}

/// Archival id for `original_id` detected at `detected_at`.
pub fn archival_id(original_id: &str, detected_at: DateTime<Utc>) -> String {
    format!(
        "{ARCHIVE_ID_PREFIX}{original_id}:{}",
        detected_at.timestamp_millis()
    )
}

/// Original id encoded in an archival id, if `id` is one.
pub fn archival_origin(id: &str) -> Option<&str> {
    id.strip_prefix(ARCHIVE_ID_PREFIX)?
        .rsplit_once(':')
        .map(|(origin, _)| origin)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    #[serde(default)]
    pub lists: BTreeMap<String, TaskListMeta>,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskRecord>,
    /// Archival records whose compensating remote write has not landed yet.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub pending_archive: BTreeSet<String>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        lists: impl IntoIterator<Item = TaskListMeta>,
        tasks: impl IntoIterator<Item = TaskRecord>,
    ) -> Self {
        let mut snapshot = Self::empty();
        for list in lists {
            snapshot.insert_list(list);
        }
        for task in tasks {
            snapshot.insert_task(task);
        }
        snapshot
    }

    pub fn insert_list(&mut self, list: TaskListMeta) {
        self.lists.insert(list.id.clone(), list);
    }

    /// Insert a task, replacing (and returning) any record with the same id.
    pub fn insert_task(&mut self, task: TaskRecord) -> Option<TaskRecord> {
        self.tasks.insert(task.id.clone(), task)
    }

    pub fn get(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn archived_count(&self) -> usize {
        self.tasks.values().filter(|task| task.is_archived).count()
    }

    /// Tasks newest first, by completion time falling back to update time.
    pub fn sorted_tasks(&self) -> Vec<&TaskRecord> {
        let mut tasks: Vec<&TaskRecord> = self.tasks.values().collect();
        tasks.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        tasks
    }
}

/// A completed recurring task the remote service reset to pending.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RolloverEvent {
    /// Archival copy of the completion that the reset erased.
    pub source_task: TaskRecord,
    /// Live remote record, now needing action again.
    pub replacement_task: TaskRecord,
}

impl RolloverEvent {
    pub fn original_id(&self) -> &str {
        self.source_task.origin_id()
    }
}

/// Sort records newest first (see [`TaskRecord::sort_key`]).
pub fn sort_tasks(tasks: &mut [TaskRecord]) {
    tasks.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}
