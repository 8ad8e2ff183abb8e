use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::application::services::{RouteOutcome, RouteStatus};
use crate::domain::StorageEvent;
use crate::presentation::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub records: Vec<StorageEvent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub key: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<RouteOutcome> for RecordOutcome {
    fn from(outcome: RouteOutcome) -> Self {
        let (status, task, reason) = match outcome.status {
            RouteStatus::Dispatched(task) => ("dispatched", Some(task), None),
            RouteStatus::Skipped(reason) => ("skipped", None, Some(reason.to_string())),
            RouteStatus::Failed(reason) => ("failed", None, Some(reason)),
        };
        Self {
            key: outcome.key,
            status,
            task,
            reason,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventBatchResponse {
    pub results: Vec<RecordOutcome>,
}

/// Entry point for storage-change notifications delivered over HTTP.
#[tracing::instrument(skip(state, batch), fields(records = batch.records.len()))]
pub async fn events_handler(
    State(state): State<AppState>,
    Json(batch): Json<EventBatch>,
) -> Json<EventBatchResponse> {
    let results = state
        .stage_router
        .route_batch(&batch.records)
        .into_iter()
        .map(RecordOutcome::from)
        .collect();
    Json(EventBatchResponse { results })
}
