//! taskkeep list command implementation
//!
//! Reads the stored snapshot only; the remote is not contacted.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::guard::ArchiveMarker;
use crate::model::{TaskRecord, TaskStatus};
use crate::output::{emit_success, OutputOptions, Report};
use crate::store::{JsonSnapshotStore, SnapshotStore};

/// Options for the list command
pub struct ListOptions {
    pub config: Config,
    pub list: Option<String>,
    pub archived: bool,
    pub all: bool,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct ListReport {
    total: usize,
    hidden_remote_copies: usize,
    tasks: Vec<TaskRecord>,
}

pub async fn run(options: ListOptions) -> Result<()> {
    let store = JsonSnapshotStore::from_config(&options.config.store)?;
    let snapshot = store.load().await?;
    let hidden = if options.all {
        BTreeSet::new()
    } else {
        ArchiveMarker::new(options.config.archive.marker.clone()).remote_copies(&snapshot)
    };

    let tasks: Vec<TaskRecord> = snapshot
        .sorted_tasks()
        .into_iter()
        .filter(|task| !hidden.contains(&task.id))
        .filter(|task| !options.archived || task.is_archived)
        .filter(|task| match options.list.as_deref() {
            Some(wanted) => task.list_id == wanted || task.list_name == wanted,
            None => true,
        })
        .cloned()
        .collect();

    let mut out = Report::new(format!("taskkeep list: {} task(s)", tasks.len()));
    out.count("snapshot", store.path().display());
    if let Some(list) = &options.list {
        out.count("list", list);
    }
    if !hidden.is_empty() {
        out.count("hidden remote copies", hidden.len());
    }
    for task in &tasks {
        out.line(describe(task));
    }
    if snapshot.is_empty() {
        out.hint("run taskkeep sync first");
    }

    let report = ListReport {
        total: tasks.len(),
        hidden_remote_copies: hidden.len(),
        tasks,
    };
    emit_success(options.output, "list", &report, &out)
}

fn describe(task: &TaskRecord) -> String {
    let mark = match task.status {
        TaskStatus::Completed => "x",
        TaskStatus::NeedsAction => " ",
    };
    let mut line = format!("[{mark}] {} ({})", task.title, task.list_name);
    if let Some(completed_at) = task.completed_at {
        line.push_str(&format!(" done {}", short_time(completed_at)));
    }
    if task.is_archived {
        line.push_str(" archived");
    } else if task.is_recurring {
        line.push_str(" recurring");
    }
    line
}

fn short_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}
