//! HTTP tests for weekly event day unlocks.
//!
//! Run with: cargo test --test event_unlock_api_tests

mod common;

use axum::http::{Method, StatusCode};
use common::create_test_app;
use serde_json::{json, Value};

fn week(days: u32) -> Value {
    let days: Vec<Value> = (1..=days)
        .map(|n| {
            json!({
                "id": format!("stemi-week-day-{}", n),
                "dayNumber": n,
                "taskIds": [format!("stemi-week-day-{}-quiz", n)]
            })
        })
        .collect();
    json!({ "id": "stemi-week", "days": days })
}

fn unlocked(body: &Value) -> Vec<bool> {
    body["days"]
        .as_array()
        .unwrap()
        .iter()
        .map(|day| day["unlocked"].as_bool().unwrap())
        .collect()
}

#[tokio::test]
async fn only_the_first_day_opens_without_progress() {
    let app = create_test_app();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/events/unlocks",
            Some(json!({ "event": week(7) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eventId"], "stemi-week");
    assert_eq!(unlocked(&body), vec![true, false, false, false, false, false, false]);
}

#[tokio::test]
async fn completed_days_open_the_following_day() {
    let app = create_test_app();

    let request = json!({
        "event": week(4),
        "progress": {
            "completedDays": ["stemi-week-day-1", "stemi-week-day-2"],
            "completedTasks": ["stemi-week-day-1-quiz", "stemi-week-day-2-quiz"]
        }
    });
    let (status, body) = app
        .send(Method::POST, "/api/v1/events/unlocks", Some(request))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unlocked(&body), vec![true, true, true, false]);
    assert_eq!(body["days"][1]["completed"], true);
    assert_eq!(body["days"][2]["completed"], false);
}

#[tokio::test]
async fn oversized_or_malformed_events_are_rejected() {
    let app = create_test_app();

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/events/unlocks",
            Some(json!({ "event": week(31) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/events/unlocks",
            Some(json!({ "event": { "id": "x", "days": "none" } })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
}

#[tokio::test]
async fn finishing_a_day_through_the_api_opens_the_next() {
    let app = create_test_app();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/events/tasks/complete",
            Some(json!({
                "event": week(3),
                "dayId": "stemi-week-day-2",
                "taskId": "stemi-week-day-2-quiz"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "locked");
    assert_eq!(body["progress"]["completedTasks"], json!([]));

    let (_, body) = app
        .send(
            Method::POST,
            "/api/v1/events/tasks/complete",
            Some(json!({
                "event": week(3),
                "dayId": "stemi-week-day-1",
                "taskId": "stemi-week-day-1-quiz"
            })),
        )
        .await;
    assert_eq!(body["outcome"]["recorded"]["dayCompleted"], true);
    assert_eq!(body["progress"]["completedDays"], json!(["stemi-week-day-1"]));
    assert_eq!(unlocked(&body), vec![true, true, false]);
}
