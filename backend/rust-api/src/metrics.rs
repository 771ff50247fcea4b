use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Store Metrics (MongoDB)
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "store_operations_total",
        "Total number of content/progress store operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref STORE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "store_operation_duration_seconds",
        "Store operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Cache Metrics
    pub static ref CACHE_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_lookups_total",
        "Cache lookups by cache name and result",
        &["cache", "result"]
    )
    .unwrap();

    pub static ref CACHE_TIER_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_tier_errors_total",
        "Shared cache tier failures that degraded to a miss",
        &["operation"]
    )
    .unwrap();

    // Business Metrics
    pub static ref TASK_POOL_LOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "task_pool_loads_total",
        "Task pool loads by source (cache, store, stale_cache, samples)",
        &["source"]
    )
    .unwrap();

    pub static ref DAILY_TASKS_SERVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "daily_tasks_served_total",
        "Daily tasks served by task type",
        &["task_type"]
    )
    .unwrap();

    pub static ref TASK_USAGE_UPDATES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "task_usage_updates_total",
        "Usage counter updates by outcome",
        &["status"]
    )
    .unwrap();

    pub static ref UNLOCK_CHECKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "unlock_checks_total",
        "Module unlock checks by outcome (unlocked, locked, error)",
        &["result"]
    )
    .unwrap();

    pub static ref PROGRESS_UPDATES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "progress_updates_total",
        "Module progress writes by outcome",
        &["status"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Times a store call and counts it by outcome.
pub async fn track_store_operation<F, T, E>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

pub fn record_cache_hit(cache: &str) {
    CACHE_LOOKUPS_TOTAL.with_label_values(&[cache, "hit"]).inc();
}

pub fn record_cache_miss(cache: &str) {
    CACHE_LOOKUPS_TOTAL.with_label_values(&[cache, "miss"]).inc();
}

pub fn record_cache_tier_error(operation: &str) {
    CACHE_TIER_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn record_pool_source(source: &str) {
    TASK_POOL_LOADS_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_unlock_check(result: &str) {
    UNLOCK_CHECKS_TOTAL.with_label_values(&[result]).inc();
}
