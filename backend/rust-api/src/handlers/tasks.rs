use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::models::DailyTasksResponse;
use crate::services::cache::CacheInfo;
use crate::services::task_service::{PoolRefresh, TaskDiagnostics, UsageOutcome};
use crate::services::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct DailyTasksQuery {
    #[serde(default)]
    pub guest: bool,
    pub date: Option<NaiveDate>,
    #[validate(range(max = 50))]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub task_id: String,
    pub date: NaiveDate,
    pub outcome: UsageOutcome,
}

/// GET /api/v1/tasks/daily
pub async fn daily_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DailyTasksQuery>,
) -> Result<Json<DailyTasksResponse>, ApiError> {
    query
        .validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    let response = state
        .tasks
        .daily_tasks(query.guest, query.date, query.count)
        .await;
    Ok(Json(response))
}

/// POST /api/v1/tasks/{id}/usage
pub async fn record_usage(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Query(query): Query<UsageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = query.date.unwrap_or_else(|| state.tasks.today());

    let outcome = state.tasks.record_usage(&task_id, date).await;
    let status = match outcome {
        UsageOutcome::Recorded => StatusCode::OK,
        UsageOutcome::UnknownTask => {
            return Err(ApiError::NotFound(format!("Task not found: {}", task_id)))
        }
        // Usage tracking is best effort; the caller is not failed for it.
        UsageOutcome::Failed => StatusCode::ACCEPTED,
    };

    Ok((
        status,
        Json(UsageResponse {
            task_id,
            date,
            outcome,
        }),
    ))
}

/// GET /api/v1/tasks/cache
pub async fn cache_info(State(state): State<Arc<AppState>>) -> Json<CacheInfo> {
    Json(state.tasks.cache_info().await)
}

/// DELETE /api/v1/tasks/cache
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.tasks.clear_cache().await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/tasks/cache/refresh
pub async fn refresh_pool(State(state): State<Arc<AppState>>) -> Json<PoolRefresh> {
    Json(state.tasks.refresh_pool().await)
}

/// GET /api/v1/tasks/diagnostics
pub async fn diagnostics(State(state): State<Arc<AppState>>) -> Json<TaskDiagnostics> {
    Json(state.tasks.diagnose().await)
}
