//! Google Tasks REST client.
//!
//! JSON payloads are deserialized into private payload structs and converted
//! into [`TaskRecord`] here; loosely typed fields never leave this module.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{NewTask, RemoteTaskSource, TaskPage};
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::model::{TaskListMeta, TaskRecord, TaskStatus};

pub const TASKS_API: &str = "https://tasks.googleapis.com/tasks/v1";
const MAX_RESULTS: &str = "100";
const STATUS_NEEDS_ACTION: &str = "needsAction";
const STATUS_COMPLETED: &str = "completed";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskListsResponse {
    items: Option<Vec<TaskListPayload>>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct TaskListPayload {
    id: String,
    title: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TasksResponse {
    items: Option<Vec<TaskPayload>>,
    next_page_token: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
struct TaskPayload {
    id: String,
    title: Option<String>,
    status: Option<String>,
    updated: Option<String>,
    due: Option<String>,
    completed: Option<String>,
    notes: Option<String>,
    deleted: Option<bool>,
}

#[derive(Serialize)]
struct TaskInsertRequest<'a> {
    title: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

/// A task payload together with the list it was read from.
struct ListedTask<'a> {
    payload: TaskPayload,
    list: &'a TaskListMeta,
}

impl TryFrom<ListedTask<'_>> for TaskRecord {
    type Error = Error;

    fn try_from(listed: ListedTask<'_>) -> Result<Self> {
        let ListedTask { payload, list } = listed;
        let updated_at = payload
            .updated
            .as_deref()
            .map(parse_timestamp)
            .transpose()?
            .ok_or_else(|| Error::InvalidData(format!("task {} has no updated time", payload.id)))?;

        let status = match payload.status.as_deref() {
            Some(STATUS_COMPLETED) => TaskStatus::Completed,
            Some(STATUS_NEEDS_ACTION) | None => TaskStatus::NeedsAction,
            Some(other) => {
                return Err(Error::InvalidData(format!(
                    "task {} has unknown status '{other}'",
                    payload.id
                )))
            }
        };

        let completed_at = match status {
            TaskStatus::Completed => Some(
                payload
                    .completed
                    .as_deref()
                    .map(parse_timestamp)
                    .transpose()?
                    .unwrap_or(updated_at),
            ),
            TaskStatus::NeedsAction => None,
        };

        Ok(TaskRecord {
            id: payload.id,
            title: payload.title.unwrap_or_default(),
            status,
            completed_at,
            due_at: payload.due.as_deref().map(parse_timestamp).transpose()?,
            updated_at,
            notes: payload.notes.filter(|notes| !notes.is_empty()),
            list_id: list.id.clone(),
            list_name: list.title.clone(),
            is_archived: false,
            is_recurring: false,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| Error::InvalidData(format!("invalid timestamp '{value}': {err}")))
}

fn status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::NeedsAction => STATUS_NEEDS_ACTION,
        TaskStatus::Completed => STATUS_COMPLETED,
    }
}

pub struct GoogleTasksSource {
    http: Client,
    credentials: Credentials,
    base_url: String,
    list_titles: Mutex<HashMap<String, String>>,
}

impl GoogleTasksSource {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("taskkeep/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            credentials,
            base_url: TASKS_API.to_string(),
            list_titles: Mutex::new(HashMap::new()),
        })
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn remember_lists(&self, lists: &[TaskListMeta]) {
        if let Ok(mut titles) = self.list_titles.lock() {
            for list in lists {
                titles.insert(list.id.clone(), list.title.clone());
            }
        }
    }

    fn list_meta(&self, list_id: &str) -> TaskListMeta {
        let title = self
            .list_titles
            .lock()
            .ok()
            .and_then(|titles| titles.get(list_id).cloned())
            .unwrap_or_else(|| list_id.to_string());
        TaskListMeta::new(list_id, title)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        url: String,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.credentials.key)
            .query(query)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::RemoteStatus {
                operation: operation.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }
}

impl std::fmt::Debug for GoogleTasksSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTasksSource")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl RemoteTaskSource for GoogleTasksSource {
    async fn list_task_lists(&self) -> Result<Vec<TaskListMeta>> {
        let url = format!("{}/users/@me/lists", self.base_url);
        let mut lists = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("maxResults", MAX_RESULTS)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let body: TaskListsResponse = self.get_json("list task lists", url.clone(), &query).await?;
            lists.extend(body.items.unwrap_or_default().into_iter().map(|item| {
                let title = item.title.unwrap_or_else(|| item.id.clone());
                TaskListMeta::new(item.id, title)
            }));
            match body.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        self.remember_lists(&lists);
        Ok(lists)
    }

    async fn list_tasks(&self, list: &TaskListMeta, page_token: Option<&str>) -> Result<TaskPage> {
        let url = format!("{}/lists/{}/tasks", self.base_url, list.id);
        let mut query = vec![
            ("showCompleted", "true"),
            ("showHidden", "true"),
            ("maxResults", MAX_RESULTS),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let body: TasksResponse = self.get_json("list tasks", url, &query).await?;
        let items = body
            .items
            .unwrap_or_default()
            .into_iter()
            .filter(|payload| payload.deleted != Some(true))
            .map(|payload| TaskRecord::try_from(ListedTask { payload, list }))
            .collect::<Result<Vec<_>>>()?;

        Ok(TaskPage {
            items,
            next_page_token: body.next_page_token.filter(|token| !token.is_empty()),
        })
    }

    async fn insert_task(&self, list_id: &str, task: &NewTask) -> Result<TaskRecord> {
        let url = format!("{}/lists/{}/tasks", self.base_url, list_id);
        let request = TaskInsertRequest {
            title: &task.title,
            status: status_str(task.status),
            completed: task.completed_at.map(|at| at.to_rfc3339()),
            notes: task.notes.as_deref(),
        };

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.credentials.key)
            .json(&request)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::RemoteStatus {
                operation: "insert task".to_string(),
                status: resp.status().as_u16(),
            });
        }

        let payload: TaskPayload = resp.json().await?;
        let list = self.list_meta(list_id);
        TaskRecord::try_from(ListedTask {
            payload,
            list: &list,
        })
    }
}
