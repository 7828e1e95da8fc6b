mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{RecordingNotifier, fast_policy};
use enrollwatch::application::WatcherRegistry;
use enrollwatch::infrastructure::fake_eligibility::ScriptedEligibility;
use enrollwatch::infrastructure::sqlite_store::SqliteWatchStore;
use enrollwatch::interfaces::http_api::{ApiState, build_router};

async fn app(api_token: Option<&str>) -> (Router, Arc<WatcherRegistry>) {
    let store = SqliteWatchStore::in_memory().await.unwrap();
    let registry = Arc::new(WatcherRegistry::new(
        Arc::new(store),
        Arc::new(ScriptedEligibility::new()),
        Arc::new(RecordingNotifier::new()),
        fast_policy(),
    ));
    let router = build_router(ApiState {
        registry: registry.clone(),
        api_token: api_token.map(str::to_string),
    });
    (router, registry)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn add_list_delete_round() {
    let (app, registry) = app(None).await;

    let (code, body) = send(&app, "POST", "/users/15/events", Some(json!({"eventId": 3000}))).await;
    assert_eq!(code, StatusCode::CREATED);
    assert_eq!(body, json!({"event": "3000"}));

    let (code, _) = send(&app, "POST", "/users/15/events", Some(json!({"eventId": "3000"}))).await;
    assert_eq!(code, StatusCode::OK);

    send(&app, "POST", "/users/15/events", Some(json!({"eventId": 3001}))).await;
    let (code, body) = send(&app, "GET", "/users/15/events", None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body, json!({"events": ["3000", "3001"]}));

    let (code, body) = send(&app, "DELETE", "/users/15/events/3000", None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body, json!({"event": "3000"}));

    let (code, body) = send(&app, "DELETE", "/users/15/events/3000", None).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");

    registry.shutdown().await;
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let (app, registry) = app(None).await;

    let (code, body) = send(&app, "GET", "/users/99/events", None).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert_eq!(body["description"], "user not found");

    let (code, _) = send(&app, "DELETE", "/users/99/events/1", None).await;
    assert_eq!(code, StatusCode::NOT_FOUND);

    registry.shutdown().await;
}

#[tokio::test]
async fn bad_body_is_rejected() {
    let (app, registry) = app(None).await;
    let (code, body) = send(&app, "POST", "/users/15/events", Some(json!({"nope": 1}))).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["description"], "unable to decode json");
    assert!(registry.users().unwrap().is_empty());
    registry.shutdown().await;
}

#[tokio::test]
async fn api_token_guards_user_routes() {
    let (app, registry) = app(Some("s3cret")).await;

    let (code, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(code, StatusCode::OK);

    let (code, _) = send(&app, "POST", "/users/1/events", Some(json!({"eventId": 1}))).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("POST")
        .uri("/users/1/events")
        .header("authorization", "Bearer s3cret")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"eventId": 1, "token": "user-token"}"#))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let list = registry.get(&common::user("1")).unwrap().unwrap();
    assert_eq!(list.watch_user().token.as_deref(), Some("user-token"));

    registry.shutdown().await;
}

#[tokio::test]
async fn empty_token_is_ignored() {
    let (app, registry) = app(None).await;

    let (code, _) = send(
        &app,
        "POST",
        "/users/2/events",
        Some(json!({"eventId": 1, "token": ""})),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);

    let list = registry.get(&common::user("2")).unwrap().unwrap();
    assert_eq!(list.watch_user().token, None);

    registry.shutdown().await;
}
