//! In-process task service.
//!
//! Serves lists and tasks from memory with real pagination, records every
//! insert, and can inject fetch and insert failures. When built from a fixture
//! file, inserts are written back so later runs observe them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{NewTask, RemoteTaskSource, TaskPage};
use crate::error::{Error, Result};
use crate::lock;
use crate::model::{TaskListMeta, TaskRecord, TaskStatus};

/// On-disk shape of a mock fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockFixture {
    #[serde(default)]
    pub lists: Vec<TaskListMeta>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Default)]
struct MockState {
    lists: Vec<TaskListMeta>,
    tasks: Vec<TaskRecord>,
    inserted: Vec<(String, NewTask)>,
    page_requests: usize,
    fail_pages_after: Option<usize>,
    fail_inserts_titled: HashSet<String>,
}

#[derive(Debug)]
pub struct MockTaskSource {
    state: Mutex<MockState>,
    page_size: usize,
    fixture: Option<PathBuf>,
}

impl MockTaskSource {
    pub fn new(lists: Vec<TaskListMeta>, tasks: Vec<TaskRecord>) -> Self {
        Self {
            state: Mutex::new(MockState {
                lists,
                tasks,
                ..MockState::default()
            }),
            page_size: 100,
            fixture: None,
        }
    }

    /// Load lists and tasks from a JSON fixture; inserts are saved back to it.
    pub fn from_fixture(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture: MockFixture = serde_json::from_str(&content).map_err(|err| {
            Error::InvalidData(format!("invalid fixture {}: {}", path.display(), err))
        })?;
        let mut source = Self::new(fixture.lists, fixture.tasks);
        source.fixture = Some(path.to_path_buf());
        Ok(source)
    }

    /// Small built-in data set.
    pub fn demo() -> Self {
        let now = Utc::now();
        let home = TaskListMeta::new("home", "Home");
        let work = TaskListMeta::new("work", "Work");
        let tasks = vec![
            TaskRecord::completed(
                "home-1",
                "Water plants",
                &home,
                now - Duration::days(2),
                now - Duration::days(2),
            ),
            TaskRecord::needs_action("home-2", "Pay rent", &home, now - Duration::days(1))
                .with_due(now + Duration::days(5)),
            TaskRecord::completed(
                "work-1",
                "Submit timesheet",
                &work,
                now - Duration::days(3),
                now - Duration::days(3),
            ),
            TaskRecord::needs_action("work-2", "Review roadmap", &work, now - Duration::hours(6)),
        ];
        Self::new(vec![home, work], tasks)
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fail every page request after the first `pages` succeeded.
    pub fn fail_pages_after(&self, pages: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_pages_after = Some(pages);
        }
    }

    /// Reject inserts whose title equals `title`.
    pub fn fail_inserts_titled(&self, title: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_inserts_titled.insert(title.into());
        }
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_pages_after = None;
            state.fail_inserts_titled.clear();
        }
    }

    /// Insert or replace a task by id, as the service would on its own.
    pub fn put_task(&self, task: TaskRecord) {
        if let Ok(mut state) = self.state.lock() {
            match state.tasks.iter_mut().find(|existing| existing.id == task.id) {
                Some(existing) => *existing = task,
                None => state.tasks.push(task),
            }
        }
    }

    pub fn remove_task(&self, id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.tasks.retain(|task| task.id != id);
        }
    }

    /// Reset a completed task to needs-action, the way recurring tasks roll over.
    pub fn roll_over(&self, id: &str) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(task) = state.tasks.iter_mut().find(|task| task.id == id) {
                task.status = TaskStatus::NeedsAction;
                task.completed_at = None;
                task.updated_at = Utc::now();
            }
        }
    }

    /// Every successful insert as `(list_id, task)`.
    pub fn inserted(&self) -> Vec<(String, NewTask)> {
        self.state
            .lock()
            .map(|state| state.inserted.clone())
            .unwrap_or_default()
    }

    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.state
            .lock()
            .map(|state| state.tasks.clone())
            .unwrap_or_default()
    }

    pub fn page_requests(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.page_requests)
            .unwrap_or_default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| Error::OperationFailed("mock source state poisoned".to_string()))
    }

    /// Write `lists` and `tasks` back to the fixture file, if there is one.
    fn persist(&self, lists: &[TaskListMeta], tasks: &[TaskRecord]) -> Result<()> {
        let Some(path) = &self.fixture else {
            return Ok(());
        };
        let fixture = MockFixture {
            lists: lists.to_vec(),
            tasks: tasks.to_vec(),
        };
        let json = serde_json::to_string_pretty(&fixture)?;
        lock::write_atomic(path, json.as_bytes())
    }
}

#[async_trait]
impl RemoteTaskSource for MockTaskSource {
    async fn list_task_lists(&self) -> Result<Vec<TaskListMeta>> {
        Ok(self.state()?.lists.clone())
    }

    async fn list_tasks(&self, list: &TaskListMeta, page_token: Option<&str>) -> Result<TaskPage> {
        let mut state = self.state()?;
        if let Some(limit) = state.fail_pages_after {
            if state.page_requests >= limit {
                return Err(Error::Remote(format!(
                    "injected failure listing tasks of {}",
                    list.id
                )));
            }
        }
        state.page_requests += 1;

        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::Remote(format!("invalid page token '{token}'")))?,
            None => 0,
        };

        let in_list: Vec<&TaskRecord> = state
            .tasks
            .iter()
            .filter(|task| task.list_id == list.id)
            .collect();
        let end = offset.saturating_add(self.page_size).min(in_list.len());
        let items = in_list
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|task| TaskRecord {
                list_name: list.title.clone(),
                ..(*task).clone()
            })
            .collect();
        let next_page_token = (end < in_list.len()).then(|| end.to_string());

        Ok(TaskPage {
            items,
            next_page_token,
        })
    }

    async fn insert_task(&self, list_id: &str, task: &NewTask) -> Result<TaskRecord> {
        let mut state = self.state()?;
        if state.fail_inserts_titled.contains(&task.title) {
            return Err(Error::Remote(format!(
                "injected failure inserting '{}'",
                task.title
            )));
        }
        let list = state
            .lists
            .iter()
            .find(|list| list.id == list_id)
            .cloned()
            .ok_or_else(|| Error::Remote(format!("task list not found: {list_id}")))?;

        let now = Utc::now();
        let id = format!("mock-{}", Uuid::new_v4().simple());
        let mut record = match task.status {
            TaskStatus::Completed => TaskRecord::completed(
                id,
                task.title.clone(),
                &list,
                task.completed_at.unwrap_or(now),
                now,
            ),
            TaskStatus::NeedsAction => TaskRecord::needs_action(id, task.title.clone(), &list, now),
        };
        record.notes = task.notes.clone();

        // the fixture is written first so a failed write leaves no trace in memory
        let mut tasks = state.tasks.clone();
        tasks.push(record.clone());
        self.persist(&state.lists, &tasks)?;

        state.tasks = tasks;
        state.inserted.push((list_id.to_string(), task.clone()));
        Ok(record)
    }
}
