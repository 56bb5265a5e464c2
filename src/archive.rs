//! Archive writer: recreates lost completions on the remote service.
//!
//! Every write of a batch is dispatched at once and the batch is awaited as a
//! whole. A failed write is recorded on its own outcome; it never cancels the
//! other writes and is not retried here.

use futures::future::join_all;
use serde::Serialize;

use crate::guard::ArchiveMarker;
use crate::model::{RolloverEvent, TaskStatus};
use crate::remote::{NewTask, RemoteTaskSource};

/// Result of archiving one rollover event.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveOutcome {
    pub event: RolloverEvent,
    pub success: bool,
    /// Id the remote service assigned to the archival record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveWriter {
    marker: ArchiveMarker,
}

impl ArchiveWriter {
    pub fn new(marker: ArchiveMarker) -> Self {
        Self { marker }
    }

    /// The completed record to insert for `event`.
    pub fn archival_task(&self, event: &RolloverEvent) -> NewTask {
        let source = &event.source_task;
        NewTask {
            title: source.title.clone(),
            status: TaskStatus::Completed,
            completed_at: source.completed_at,
            notes: Some(self.marker.annotate(source)),
        }
    }

    /// Write one archival record per event. Outcomes keep the input order.
    pub async fn archive(
        &self,
        source: &dyn RemoteTaskSource,
        events: Vec<RolloverEvent>,
    ) -> Vec<ArchiveOutcome> {
        let writes = events.into_iter().map(|event| async move {
            let task = self.archival_task(&event);
            let list_id = event.source_task.list_id.clone();
            match source.insert_task(&list_id, &task).await {
                Ok(created) => {
                    tracing::info!(
                        task_id = %event.original_id(),
                        remote_id = %created.id,
                        "archived completion"
                    );
                    ArchiveOutcome {
                        event,
                        success: true,
                        remote_id: Some(created.id),
                        error: None,
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        task_id = %event.original_id(),
                        error = %err,
                        "archive write failed"
                    );
                    ArchiveOutcome {
                        event,
                        success: false,
                        remote_id: None,
                        error: Some(err.to_string()),
                    }
                }
            }
        });

        join_all(writes).await
    }
}
