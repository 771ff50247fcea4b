use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ApiError;
use crate::extractors::AppJson;
use crate::models::{
    LearningModule, LessonView, ModuleOverview, ModuleProgress, ProgressOutcome, ProgressUpdate,
    UnlockStatus,
};
use crate::services::levels::UserLevel;
use crate::services::unlock::{UnresolvedPrerequisite, UnresolvedPrerequisitePolicy};
use crate::services::AppState;

#[derive(Debug, Deserialize)]
pub struct LessonQuery {
    pub hearts: Option<u32>,
    #[serde(default)]
    pub guest: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub modules: Vec<LearningModule>,
    pub unresolved_prerequisites: Vec<UnresolvedPrerequisite>,
    pub policy: UnresolvedPrerequisitePolicy,
}

/// GET /api/v1/modules
pub async fn catalog(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    let catalog = state.modules.catalog().await;
    Json(CatalogResponse {
        modules: catalog.modules().to_vec(),
        unresolved_prerequisites: catalog.unresolved().to_vec(),
        policy: state.modules.policy(),
    })
}

/// POST /api/v1/modules/catalog/invalidate
pub async fn invalidate_catalog(State(state): State<Arc<AppState>>) -> StatusCode {
    state.modules.invalidate_catalog().await;
    StatusCode::NO_CONTENT
}

/// GET /api/v1/users/{user_id}/modules
pub async fn modules_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<Vec<ModuleOverview>> {
    Json(state.modules.modules_for_user(&user_id).await)
}

/// GET /api/v1/users/{user_id}/level
pub async fn user_level(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserLevel>, ApiError> {
    Ok(Json(state.modules.user_level(&user_id).await?))
}

/// GET /api/v1/users/{user_id}/modules/{module_id}/unlocked
pub async fn unlock_status(
    State(state): State<Arc<AppState>>,
    Path((user_id, module_id)): Path<(String, String)>,
) -> Json<UnlockStatus> {
    let unlocked = state.modules.is_module_unlocked(&user_id, &module_id).await;
    Json(UnlockStatus {
        module_id,
        unlocked,
    })
}

/// GET /api/v1/users/{user_id}/modules/{module_id}/lessons
pub async fn lessons(
    State(state): State<Arc<AppState>>,
    Path((user_id, module_id)): Path<(String, String)>,
    Query(query): Query<LessonQuery>,
) -> Result<Json<Vec<LessonView>>, ApiError> {
    let lessons = state
        .modules
        .lesson_states(&user_id, &module_id, query.hearts, query.guest)
        .await?;
    Ok(Json(lessons))
}

/// GET /api/v1/users/{user_id}/modules/{module_id}/progress
///
/// `null` when the learner has not started the module.
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, module_id)): Path<(String, String)>,
) -> Result<Json<Option<ModuleProgress>>, ApiError> {
    let progress = state.modules.get_progress(&user_id, &module_id).await?;
    Ok(Json(progress))
}

/// PUT /api/v1/users/{user_id}/modules/{module_id}/progress
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, module_id)): Path<(String, String)>,
    AppJson(update): AppJson<ProgressUpdate>,
) -> Result<Json<ProgressOutcome>, ApiError> {
    let outcome = state
        .modules
        .update_progress(&user_id, &module_id, update)
        .await?;
    Ok(Json(outcome))
}
