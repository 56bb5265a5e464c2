//! taskkeep sync command implementation

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, OutputOptions, Report};
use crate::sync::{SyncEngine, SyncReport};

/// Options for the sync command
pub struct SyncOptions {
    pub config: Config,
    pub output: OutputOptions,
}

pub async fn run(options: SyncOptions) -> Result<()> {
    let engine = SyncEngine::from_config(&options.config)?;
    let report = engine.run().await?;
    emit_success(options.output, "sync", &report, &render(&report))
}

fn render(report: &SyncReport) -> Report {
    let failed: Vec<_> = report.failed().collect();
    let mut out = Report::new(if failed.is_empty() {
        "taskkeep sync: up to date".to_string()
    } else {
        format!("taskkeep sync: {} archive write(s) failed", failed.len())
    });
    out.count("tasks", report.total_tasks);
    out.count("archived records", report.archived_tasks);
    out.count("rollovers", report.rollovers.len());
    out.count("archive writes", report.archived_ok());
    if !report.retried.is_empty() {
        out.count("retried", report.retried.len());
    }
    if !report.skipped_duplicates.is_empty() {
        out.count("already archived", report.skipped_duplicates.len());
    }

    for rollover in &report.rollovers {
        out.line(format!(
            "{} [{}] rolled over; kept as {}",
            rollover.title, rollover.list_name, rollover.archival_id
        ));
    }
    for outcome in &failed {
        out.warn(format!(
            "{}: {}",
            outcome.event.source_task.title,
            outcome.error.as_deref().unwrap_or("unknown error")
        ));
    }
    if !failed.is_empty() {
        out.hint("failed writes are retried on the next taskkeep sync");
    }
    out
}
