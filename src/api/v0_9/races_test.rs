//! Integration tests for Race API endpoints.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api::{AppState, create_router, version_map};
use crate::config::Environment;
use crate::db::Storage;
use crate::logging::LogService;

/// Create a test app with an in-memory database
async fn test_app() -> Router {
    let storage = Storage::in_memory()
        .await
        .expect("Failed to create test database");
    let state = AppState::new(
        storage,
        LogService::global(),
        Environment::Development,
        version_map().unwrap(),
    );
    create_router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(serde_json::to_vec(&body).unwrap())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn race(name: &str, country: &str, season: i64, round: i64) -> Value {
    json!({
        "name": name,
        "circuit": format!("{name} Circuit"),
        "country": country,
        "season": season,
        "round": round
    })
}

async fn create_race(app: &Router, body: Value) -> i64 {
    let (status, body) = send(app, "POST", "/api/v0.9/races", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

// =============================================================================
// CRUD
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn create_then_get_race() {
    let app = test_app().await;
    let id = create_race(&app, race("British Grand Prix", "United Kingdom", 2024, 12)).await;

    let (status, body) = send(&app, "GET", &format!("/api/v0.9/races/{id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "British Grand Prix");
    assert_eq!(body["round"], 12);
    assert!(body["winner_id"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn update_records_the_winner() {
    let app = test_app().await;
    let id = create_race(&app, race("Hungarian Grand Prix", "Hungary", 2024, 13)).await;
    let (_, driver) = send(
        &app,
        "POST",
        "/api/v0.9/drivers",
        Some(json!({"name": "Oscar Piastri", "team": "McLaren"})),
    )
    .await;

    let mut replacement = race("Hungarian Grand Prix", "Hungary", 2024, 13);
    replacement["winner_id"] = driver["id"].clone();
    replacement["date"] = json!("2024-07-21");
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v0.9/races/{id}"),
        Some(replacement),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["winner_id"], driver["id"]);
    assert_eq!(body["date"], "2024-07-21");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_winner_is_rejected() {
    let app = test_app().await;

    let mut body = race("Italian Grand Prix", "Italy", 2024, 16);
    body["winner_id"] = json!(42);
    let (status, body) = send(&app, "POST", "/api/v0.9/races", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "winner_id");
}

#[tokio::test(flavor = "multi_thread")]
async fn round_must_be_positive() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v0.9/races",
        Some(race("Pre-season Test", "Bahrain", 2024, 0)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "round");
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_race_then_get_returns_not_found() {
    let app = test_app().await;
    let id = create_race(&app, race("Dutch Grand Prix", "Netherlands", 2024, 15)).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/v0.9/races/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/api/v0.9/races/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn season_lists_calendar_in_round_order() {
    let app = test_app().await;
    create_race(&app, race("Singapore Grand Prix", "Singapore", 2024, 18)).await;
    create_race(&app, race("Bahrain Grand Prix", "Bahrain", 2024, 1)).await;
    create_race(&app, race("Miami Grand Prix", "United States", 2024, 6)).await;
    create_race(&app, race("Bahrain Grand Prix", "Bahrain", 2023, 1)).await;

    let (status, body) = send(&app, "GET", "/api/v0.9/races?season=2024", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    let rounds: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["round"].as_i64().unwrap())
        .collect();
    assert_eq!(rounds, vec![1, 6, 18]);
}

#[tokio::test(flavor = "multi_thread")]
async fn list_combines_filters() {
    let app = test_app().await;
    create_race(&app, race("Miami Grand Prix", "United States", 2024, 6)).await;
    create_race(&app, race("Las Vegas Grand Prix", "United States", 2024, 22)).await;
    create_race(&app, race("Miami Grand Prix", "United States", 2023, 5)).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/v0.9/races?season=2024&country=United%20States",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let (_, body) = send(&app, "GET", "/api/v0.9/races?name=miami", None).await;
    assert_eq!(body["total"], 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn non_numeric_season_is_rejected() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/api/v0.9/races?season=last", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}
