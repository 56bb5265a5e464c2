//! Remote task source: the task-list service taskkeep reconciles against.
//!
//! Sources expose paginated reads and a single-record insert. [`fetch_snapshot`]
//! drains every page of every list before anything is handed to
//! reconciliation, so a partially fetched remote state is never merged.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{SourceConfig, SourceMode};
use crate::error::{Error, Result};
use crate::model::{Snapshot, TaskListMeta, TaskRecord, TaskStatus};

pub mod google;
pub mod mock;

pub use google::GoogleTasksSource;
pub use mock::MockTaskSource;

/// One page of tasks from a list.
#[derive(Debug, Clone, Default)]
pub struct TaskPage {
    pub items: Vec<TaskRecord>,
    pub next_page_token: Option<String>,
}

/// Fields of a task to create remotely.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[async_trait]
pub trait RemoteTaskSource: Send + Sync {
    /// All task lists visible to the configured account.
    async fn list_task_lists(&self) -> Result<Vec<TaskListMeta>>;

    /// One page of tasks in `list`, completed and hidden tasks included.
    async fn list_tasks(&self, list: &TaskListMeta, page_token: Option<&str>) -> Result<TaskPage>;

    /// Create a task in `list_id`, returning the stored record.
    async fn insert_task(&self, list_id: &str, task: &NewTask) -> Result<TaskRecord>;
}

/// Drain all lists and all task pages into one snapshot.
///
/// Any error aborts the whole fetch and is reported as [`Error::Fetch`].
pub async fn fetch_snapshot(source: &dyn RemoteTaskSource) -> Result<Snapshot> {
    let lists = source.list_task_lists().await.map_err(Error::fetch)?;
    let mut snapshot = Snapshot::empty();

    for list in lists {
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;
        loop {
            let page = source
                .list_tasks(&list, page_token.as_deref())
                .await
                .map_err(Error::fetch)?;
            pages += 1;
            for task in page.items {
                snapshot.insert_task(task);
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        tracing::debug!(list_id = %list.id, pages, "drained task list");
        snapshot.insert_list(list);
    }

    Ok(snapshot)
}

/// Build the source selected by `config`.
pub fn from_config(config: &SourceConfig) -> Result<Arc<dyn RemoteTaskSource>> {
    match config.mode {
        SourceMode::Mock => {
            let source = match config.fixture.as_ref() {
                Some(path) => MockTaskSource::from_fixture(path)?,
                None => MockTaskSource::demo(),
            };
            Ok(Arc::new(source.with_page_size(config.page_size)))
        }
        SourceMode::Live => {
            let credentials = config.credentials.as_ref().ok_or_else(|| {
                Error::InvalidConfig("source.credentials required in live mode".to_string())
            })?;
            Ok(Arc::new(GoogleTasksSource::new(credentials.clone())?))
        }
    }
}
