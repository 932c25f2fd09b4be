//! Integration tests for the engagement HTTP API
//!
//! Requests go through the full router (extractors, validation, storage)
//! against an in-memory SQLite database and a frozen clock.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use engagement::analytics::FixedClock;
use engagement::api::{create_api_router, AppState};
use engagement::config::{AnalyticsConfig, CorsConfig};
use engagement::storage::{SqliteStorage, Storage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Helper to create test storage
async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Router over fresh storage with the clock frozen at Monday 2024-01-15 12:00 UTC
async fn create_test_app() -> (Router, Arc<dyn Storage>) {
    let storage = create_test_storage().await;
    let state = Arc::new(AppState {
        storage: Arc::clone(&storage),
        clock: Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        )),
        analytics: AnalyticsConfig::default(),
    });
    (create_api_router(state, &CorsConfig::default()), storage)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, user_id: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("user-id", user_id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn create_view(app: &Router, name: &str) -> i64 {
    let (status, json) = send(
        app,
        post_json("/api/engagement-logs/views", None, json!({ "view_name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_i64().unwrap()
}

async fn create_log(app: &Router, user_id: &str, view_id: i64, duration: i64, viewed_at: &str) {
    let (status, json) = send(
        app,
        post_json(
            "/api/engagement-logs",
            Some(user_id),
            json!({ "view_id": view_id, "duration_seconds": duration, "viewed_at": viewed_at }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
}

#[tokio::test]
async fn test_health_and_service_info() {
    let (app, _) = create_test_app().await;

    let (status, json) = send(&app, get("/api/engagement-logs/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["service"], "engagement-logs");
    assert_eq!(json["timestamp"], "2024-01-15T12:00:00+00:00");

    let (status, json) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["endpoints"]["engagement_logs"], "/api/engagement-logs");
}

#[tokio::test]
async fn test_security_headers() {
    let (app, _) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/engagement-logs/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["referrer-policy"], "no-referrer");
}

#[tokio::test]
async fn test_json_body_limit() {
    let (app, _) = create_test_app().await;
    let view_id = create_view(&app, "dashboard").await;

    // Above axum's 2MB default but under the 10MB limit
    let padding = "x".repeat(3 * 1024 * 1024);
    let body = json!({ "view_id": view_id, "duration_seconds": 10, "padding": padding });
    let (status, _) = send(&app, post_json("/api/engagement-logs", Some("1"), body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let padding = "x".repeat(11 * 1024 * 1024);
    let body = json!({ "view_id": view_id, "duration_seconds": 10, "padding": padding });
    let (status, json) = send(&app, post_json("/api/engagement-logs", Some("1"), body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["error"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let (app, _) = create_test_app().await;

    let (status, json) = send(&app, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "NOT_FOUND");
    assert_eq!(json["message"], "Route /api/nope not found");
}

#[tokio::test]
async fn test_create_log_requires_user_id_header() {
    let (app, _) = create_test_app().await;
    let view_id = create_view(&app, "dashboard").await;
    let body = json!({ "view_id": view_id, "duration_seconds": 300 });

    let (status, json) = send(&app, post_json("/api/engagement-logs", None, body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "MISSING_USER_ID");
    assert_eq!(json["message"], "User ID is required in headers");

    let (status, json) = send(
        &app,
        post_json("/api/engagement-logs", Some("abc"), body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "INVALID_USER_ID");

    let request = Request::builder()
        .method("POST")
        .uri("/api/engagement-logs")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-user-id", "456")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["user_id"], 456);
}

#[tokio::test]
async fn test_create_log() {
    let (app, _) = create_test_app().await;
    let view_id = create_view(&app, "dashboard").await;

    let (status, json) = send(
        &app,
        post_json(
            "/api/engagement-logs",
            Some("123"),
            json!({ "view_id": view_id, "duration_seconds": 300 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Engagement log created successfully");
    assert_eq!(json["data"]["user_id"], 123);
    assert_eq!(json["data"]["view_id"], view_id);
    assert_eq!(json["data"]["view_name"], "dashboard");
    assert_eq!(json["data"]["duration_seconds"], 300);
    // Both timestamps come from the clock
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap().timestamp();
    assert_eq!(json["data"]["viewed_at"], now);
    assert_eq!(json["data"]["created_at"], now);
}

#[tokio::test]
async fn test_create_log_validation() {
    let (app, _) = create_test_app().await;
    let view_id = create_view(&app, "dashboard").await;

    let cases = [
        json!({}),
        json!({ "view_id": view_id }),
        json!({ "view_id": 0, "duration_seconds": 10 }),
        json!({ "view_id": view_id, "duration_seconds": -5 }),
        json!({ "view_id": view_id, "duration_seconds": 100000 }),
        json!({ "view_id": "abc", "duration_seconds": 10 }),
        json!({ "view_id": view_id, "duration_seconds": 10, "viewed_at": "yesterday" }),
    ];

    for body in cases {
        let (status, json) = send(
            &app,
            post_json("/api/engagement-logs", Some("1"), body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(json["error"], "VALIDATION_ERROR", "body {body}");
    }

    let (status, json) = send(
        &app,
        post_json(
            "/api/engagement-logs",
            Some("1"),
            json!({ "view_id": view_id + 100, "duration_seconds": 10 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "UNKNOWN_VIEW");
}

#[tokio::test]
async fn test_list_logs_with_pagination() {
    let (app, _) = create_test_app().await;
    let view_id = create_view(&app, "dashboard").await;

    create_log(&app, "1", view_id, 10, "2024-01-10T08:00:00Z").await;
    create_log(&app, "1", view_id, 20, "2024-01-11T08:00:00Z").await;
    create_log(&app, "2", view_id, 30, "2024-01-12T08:00:00Z").await;

    let (status, json) = send(&app, get("/api/engagement-logs?limit=2&offset=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"][0]["duration_seconds"], 30);
    assert_eq!(json["pagination"], json!({ "limit": 2, "offset": 0, "count": 2 }));

    let (status, json) = send(&app, get("/api/engagement-logs/user/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Retrieved 2 engagement logs for user 1");
    assert_eq!(json["pagination"]["limit"], 100);
    let durations: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["duration_seconds"].as_i64().unwrap())
        .collect();
    assert_eq!(durations, vec![20, 10]);

    let (status, json) = send(&app, get("/api/engagement-logs?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "VALIDATION_ERROR");

    let (status, json) = send(&app, get("/api/engagement-logs/user/-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "INVALID_USER_ID");
}

#[tokio::test]
async fn test_stats_endpoints() {
    let (app, _) = create_test_app().await;
    let dashboard = create_view(&app, "dashboard").await;
    let profile = create_view(&app, "profile").await;

    create_log(&app, "9", dashboard, 300, "2024-01-15T10:00:00Z").await;
    create_log(&app, "9", profile, 100, "2024-01-14T10:00:00Z").await;

    let (status, json) = send(&app, get("/api/engagement-logs/stats/user/9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total_sessions"], 2);
    assert_eq!(json["data"]["total_duration"], 400);
    assert_eq!(json["data"]["avg_duration"], 200.0);
    assert_eq!(json["data"]["unique_views"], 2);

    let (status, json) = send(&app, get("/api/engagement-logs/stats/views")).await;
    assert_eq!(status, StatusCode::OK);
    let stats = json["data"].as_array().unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0]["view_name"], "dashboard");

    let (status, json) = send(&app, get("/api/engagement-logs/stats/user/zero")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "INVALID_USER_ID");
}

#[tokio::test]
async fn test_view_endpoints() {
    let (app, _) = create_test_app().await;

    let (status, json) = send(
        &app,
        post_json("/api/engagement-logs/views", None, json!({ "view_name": "  settings  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["view_name"], "settings");
    assert_eq!(json["message"], "View \"settings\" created successfully");

    let (status, json) = send(
        &app,
        post_json("/api/engagement-logs/views", None, json!({ "view_name": "settings" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "VIEW_EXISTS");

    let (status, json) = send(
        &app,
        post_json("/api/engagement-logs/views", None, json!({ "view_name": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "VALIDATION_ERROR");

    let (status, json) = send(&app, get("/api/engagement-logs/views")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!([{ "id": 1, "view_name": "settings" }]));

    let (_, json) = send(&app, get("/api/engagement-logs/views/settings")).await;
    assert_eq!(json["data"], json!({ "exists": true, "view_name": "settings" }));

    let (_, json) = send(&app, get("/api/engagement-logs/views/missing")).await;
    assert_eq!(json["data"]["exists"], false);
    assert_eq!(json["message"], "View \"missing\" does not exist");
}

#[tokio::test]
async fn test_analytics_endpoint() {
    let (app, _) = create_test_app().await;
    let dashboard = create_view(&app, "dashboard").await;
    let profile = create_view(&app, "profile").await;

    // Previous week (Sunday 2023-12-31 start): 2 sessions, 200s
    create_log(&app, "3", dashboard, 100, "2024-01-01T08:00:00Z").await;
    create_log(&app, "3", dashboard, 100, "2024-01-02T08:00:00Z").await;
    // Latest week (Sunday 2024-01-07 start): 3 sessions, 600s
    create_log(&app, "3", dashboard, 200, "2024-01-08T08:00:00Z").await;
    create_log(&app, "3", profile, 200, "2024-01-09T08:00:00Z").await;
    create_log(&app, "3", profile, 200, "2024-01-09T09:00:00Z").await;
    // Outside the window
    create_log(&app, "3", profile, 5000, "2023-10-01T08:00:00Z").await;

    let (status, json) = send(&app, get("/api/engagement-logs/analytics/user/3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["message"],
        "Retrieved engagement analytics for user 3 (last 30 days)"
    );

    let data = &json["data"];
    assert_eq!(data["total_sessions"], 5);
    assert_eq!(data["total_duration"], 800);
    assert_eq!(data["avg_duration"], 160.0);
    assert_eq!(data["unique_views"], 2);
    assert_eq!(data["engagement_trend"], "increasing");

    let daily = data["daily_engagement"].as_array().unwrap();
    assert_eq!(daily.len(), 30);
    assert_eq!(daily[0]["date"], "2024-01-15");
    assert_eq!(daily[29]["date"], "2023-12-17");
    let jan_9 = daily.iter().find(|d| d["date"] == "2024-01-09").unwrap();
    assert_eq!(jan_9["sessions"], 2);
    assert_eq!(jan_9["duration"], 400);
    assert_eq!(jan_9["unique_views"], 1);
    assert_eq!(jan_9["avg_duration"], 200.0);
}

#[tokio::test]
async fn test_analytics_days_parameter() {
    let (app, _) = create_test_app().await;

    let (status, json) = send(&app, get("/api/engagement-logs/analytics/user/3?days=7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["daily_engagement"].as_array().unwrap().len(), 7);
    assert_eq!(json["data"]["total_sessions"], 0);
    assert_eq!(json["data"]["engagement_trend"], "insufficient_data");

    for bad in ["0", "abc", "-2", "100000"] {
        let (status, json) = send(
            &app,
            get(&format!("/api/engagement-logs/analytics/user/3?days={bad}")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "days={bad}");
        assert_eq!(json["error"], "VALIDATION_ERROR");
    }

    let (status, json) = send(&app, get("/api/engagement-logs/analytics/user/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "INVALID_USER_ID");
}
