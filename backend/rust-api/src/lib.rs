use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod data;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod stores;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(middlewares::request_id::REQUEST_ID_HEADER),
        ])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1/tasks", task_routes())
        .nest("/api/v1/modules", module_routes())
        .nest("/api/v1/users/{user_id}/modules", user_module_routes())
        .route("/api/v1/users/{user_id}/level", get(handlers::modules::user_level))
        .nest("/api/v1/events", event_routes())
        .with_state(app_state)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(
            middlewares::request_id::request_id_middleware,
        ))
}

fn task_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/daily", get(handlers::tasks::daily_tasks))
        .route("/{id}/usage", post(handlers::tasks::record_usage))
        .route(
            "/cache",
            get(handlers::tasks::cache_info).delete(handlers::tasks::clear_cache),
        )
        .route("/cache/refresh", post(handlers::tasks::refresh_pool))
        .route("/diagnostics", get(handlers::tasks::diagnostics))
}

fn event_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/unlocks", post(handlers::events::event_unlocks))
        .route(
            "/tasks/complete",
            post(handlers::events::complete_event_task),
        )
}

fn module_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::modules::catalog))
        .route(
            "/catalog/invalidate",
            post(handlers::modules::invalidate_catalog),
        )
}

fn user_module_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::modules::modules_for_user))
        .route(
            "/{module_id}/unlocked",
            get(handlers::modules::unlock_status),
        )
        .route("/{module_id}/lessons", get(handlers::modules::lessons))
        .route(
            "/{module_id}/progress",
            get(handlers::modules::get_progress).put(handlers::modules::update_progress),
        )
}
