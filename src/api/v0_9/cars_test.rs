//! Integration tests for Car API endpoints.

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

async fn create_car(app: &Router, name: &str, season: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v0.9/cars",
        Some(json!({
            "name": name,
            "season": season,
            "engine": "Mercedes",
            "team": "McLaren"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

async fn seat_driver(app: &Router, name: &str, car: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v0.9/drivers",
        Some(json!({"name": name, "team": "McLaren", "car_id": car})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

// =============================================================================
// CRUD
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn list_cars_initially_empty() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/api/v0.9/cars", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
    assert_eq!(body["total"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn create_then_get_car() {
    let app = test_app().await;
    let id = create_car(&app, "MCL35M", 2021).await;

    let (status, body) = send(&app, "GET", &format!("/api/v0.9/cars/{id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "MCL35M");
    assert_eq!(body["season"], 2021);
    assert_eq!(body["engine"], "Mercedes");
}

#[tokio::test(flavor = "multi_thread")]
async fn update_car_uses_path_id() {
    let app = test_app().await;
    let id = create_car(&app, "MCL60", 2023).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v0.9/cars/{id}"),
        Some(json!({
            "name": "MCL60",
            "season": 2023,
            "engine": "Mercedes M14 E Performance",
            "team": "McLaren"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["engine"], "Mercedes M14 E Performance");
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_car_keeps_its_drivers() {
    let app = test_app().await;
    let car = create_car(&app, "MCL36", 2022).await;
    let driver = seat_driver(&app, "Daniel Ricciardo", car).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/v0.9/cars/{car}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/v0.9/cars/{car}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", &format!("/api/v0.9/drivers/{driver}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["car_id"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn season_before_championship_is_rejected() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v0.9/cars",
        Some(json!({
            "name": "M2B",
            "season": 1949,
            "engine": "Ford",
            "team": "McLaren"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "season");
}

#[tokio::test(flavor = "multi_thread")]
async fn get_car_with_non_numeric_id_is_rejected() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/api/v0.9/cars/latest", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "id");
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn list_filters_by_season() {
    let app = test_app().await;
    create_car(&app, "MCL35M", 2021).await;
    create_car(&app, "MCL36", 2022).await;
    create_car(&app, "MCL36B", 2022).await;

    let (status, body) = send(&app, "GET", "/api/v0.9/cars?season=2022", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["name"], "MCL36");
    assert_eq!(body["items"][1]["name"], "MCL36B");
}

#[tokio::test(flavor = "multi_thread")]
async fn car_drivers_lists_assigned_drivers() {
    let app = test_app().await;
    let car = create_car(&app, "MCL38", 2024).await;
    let other = create_car(&app, "MCL60", 2023).await;
    seat_driver(&app, "Lando Norris", car).await;
    seat_driver(&app, "Oscar Piastri", car).await;
    seat_driver(&app, "Daniel Ricciardo", other).await;

    let (status, body) = send(&app, "GET", &format!("/api/v0.9/cars/{car}/drivers"), None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Lando Norris", "Oscar Piastri"]);

    let (status, _) = send(&app, "GET", "/api/v0.9/cars/999/drivers", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Graph
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn graph_links_drivers_back_to_car() {
    let app = test_app().await;
    let car = create_car(&app, "MCL38", 2024).await;
    let lando = seat_driver(&app, "Lando Norris", car).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v0.9/races",
        Some(json!({
            "name": "Miami Grand Prix",
            "circuit": "Miami International Autodrome",
            "country": "United States",
            "season": 2024,
            "round": 6,
            "winner_id": lando
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", &format!("/api/v0.9/cars/{car}/graph"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["$id"], "1");
    assert_eq!(body["$type"], "Car");

    let drivers = body["drivers"]["$values"].as_array().unwrap();
    assert_eq!(drivers.len(), 1);
    let driver = &drivers[0];
    assert_eq!(driver["name"], "Lando Norris");
    assert_eq!(driver["car"], json!({"$ref": "1"}));

    let wins = driver["wins"]["$values"].as_array().unwrap();
    assert_eq!(wins.len(), 1);
    assert_eq!(wins[0]["name"], "Miami Grand Prix");
    assert_eq!(wins[0]["winner"]["$ref"], driver["$id"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn graph_of_empty_car_has_no_drivers() {
    let app = test_app().await;
    let car = create_car(&app, "MCL35M", 2021).await;

    let (status, body) = send(&app, "GET", &format!("/api/v0.9/cars/{car}/graph"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["drivers"], json!({"$values": []}));
}
