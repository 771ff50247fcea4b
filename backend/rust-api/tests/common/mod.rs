#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use ecg_learning_api::{
    config::Config,
    create_router,
    data::{sample_modules, sample_tasks},
    models::{LearningModule, LearningTask},
    services::AppState,
    stores::{MemoryModuleStore, MemoryProgressStore, MemoryTaskStore},
    utils::clock::ManualClock,
};

pub struct TestApp {
    pub router: Router,
    pub tasks: Arc<MemoryTaskStore>,
    pub modules: Arc<MemoryModuleStore>,
    pub progress: Arc<MemoryProgressStore>,
    pub clock: Arc<ManualClock>,
}

/// App over in-memory stores seeded with the built-in content.
pub fn create_test_app() -> TestApp {
    create_test_app_with(sample_tasks(), sample_modules(), Config::default())
}

pub fn create_test_app_with(
    tasks: Vec<LearningTask>,
    modules: Vec<LearningModule>,
    config: Config,
) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let tasks = Arc::new(MemoryTaskStore::new(tasks));
    let modules = Arc::new(MemoryModuleStore::new(modules));
    let progress = Arc::new(MemoryProgressStore::new(vec![]));
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));

    let state = AppState::in_memory(
        config,
        tasks.clone(),
        modules.clone(),
        progress.clone(),
        clock.clone(),
    );

    TestApp {
        router: create_router(Arc::new(state)),
        tasks,
        modules,
        progress,
        clock,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::POST, uri, None).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    pub async fn put_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }
}

pub fn ids(tasks: &Value) -> Vec<String> {
    tasks
        .as_array()
        .expect("tasks array")
        .iter()
        .map(|task| task["id"].as_str().unwrap().to_string())
        .collect()
}
