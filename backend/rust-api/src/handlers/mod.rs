use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::LearningError;
use crate::metrics;
use crate::services::AppState;

pub mod events;
pub mod modules;
pub mod tasks;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<LearningError> for ApiError {
    fn from(err: LearningError) -> Self {
        match err {
            LearningError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            LearningError::Validation(_) => ApiError::BadRequest(err.to_string()),
            LearningError::Conflict(_) => ApiError::Conflict(err.to_string()),
            LearningError::Store(e) => {
                tracing::error!("Store failure while handling request: {}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let json_response = json!({
            "message": message,
            "status": status.as_u16()
        });
        (status, Json(json_response)).into_response()
    }
}

/// Store and shared cache reachability. The content store being down
/// degrades service (samples are served) but is reported as unhealthy.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dependencies = serde_json::Map::new();
    let mut all_healthy = true;

    let store = match tokio::time::timeout(
        std::time::Duration::from_secs(1),
        state.task_store.ping(),
    )
    .await
    {
        Ok(Ok(())) => json!({ "status": "healthy" }),
        Ok(Err(e)) => {
            all_healthy = false;
            json!({ "status": "unhealthy", "error": e.to_string() })
        }
        Err(_) => {
            all_healthy = false;
            json!({ "status": "unhealthy", "error": "Store timeout after 1s" })
        }
    };
    dependencies.insert("store".to_string(), store);

    let cache = match &state.redis {
        None => json!({ "status": "disabled" }),
        Some(redis) => {
            match tokio::time::timeout(std::time::Duration::from_millis(500), redis.ping()).await
            {
                Ok(Ok(())) => json!({ "status": "healthy" }),
                Ok(Err(e)) => {
                    all_healthy = false;
                    json!({ "status": "unhealthy", "error": e.to_string() })
                }
                Err(_) => {
                    all_healthy = false;
                    json!({ "status": "unhealthy", "error": "Redis timeout after 500ms" })
                }
            }
        }
    };
    dependencies.insert("cache".to_string(), cache);

    let (status_code, status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "ecg-learning-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}
