use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ApiError;
use crate::extractors::AppJson;
use crate::services::event_unlock::{DayState, EventProgress, TaskCompletion, WeeklyEvent};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUnlockRequest {
    pub event: WeeklyEvent,
    #[serde(default)]
    pub progress: Option<EventProgress>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUnlockResponse {
    pub event_id: String,
    pub days: Vec<DayState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteEventTaskRequest {
    pub event: WeeklyEvent,
    #[serde(default)]
    pub progress: EventProgress,
    pub day_id: String,
    pub task_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteEventTaskResponse {
    pub outcome: TaskCompletion,
    pub progress: EventProgress,
    pub days: Vec<DayState>,
}

fn validate_event(event: &WeeklyEvent) -> Result<(), ApiError> {
    event
        .validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))
}

/// POST /api/v1/events/unlocks
///
/// Day and task unlocks for an event given the learner's event progress.
pub async fn event_unlocks(
    AppJson(request): AppJson<EventUnlockRequest>,
) -> Result<Json<EventUnlockResponse>, ApiError> {
    validate_event(&request.event)?;

    let days = request.event.day_states(request.progress.as_ref());
    tracing::debug!(
        "Evaluated {} days of event {}, {} open",
        days.len(),
        request.event.id,
        days.iter().filter(|d| d.unlocked).count()
    );

    Ok(Json(EventUnlockResponse {
        event_id: request.event.id,
        days,
    }))
}

/// POST /api/v1/events/tasks/complete
///
/// Applies one task completion to the supplied event progress. Tasks of a
/// locked day leave the progress untouched.
pub async fn complete_event_task(
    AppJson(request): AppJson<CompleteEventTaskRequest>,
) -> Result<Json<CompleteEventTaskResponse>, ApiError> {
    validate_event(&request.event)?;

    let mut progress = request.progress;
    let outcome = request
        .event
        .complete_task(&mut progress, &request.day_id, &request.task_id);
    if outcome == TaskCompletion::Locked {
        tracing::info!(
            "Refused completion of {} in {}: day is locked",
            request.task_id,
            request.day_id
        );
    }

    let days = request.event.day_states(Some(&progress));
    Ok(Json(CompleteEventTaskResponse {
        outcome,
        progress,
        days,
    }))
}
