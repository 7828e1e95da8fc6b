use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::application::{AddOutcome, AppError, WatcherRegistry};
use crate::domain::{EventId, UserId};

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<WatcherRegistry>,
    pub api_token: Option<String>,
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users/{user_id}/events", get(list_events).post(add_event))
        .route("/users/{user_id}/events/{event_id}", delete(delete_event))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[derive(Deserialize)]
struct AddEventBody {
    #[serde(rename = "eventId")]
    event_id: EventId,
    token: Option<String>,
}

async fn add_event(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return error_response(code, &msg);
    }
    let user = match UserId::parse(&user_id) {
        Ok(u) => u,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let body: AddEventBody = match serde_json::from_slice(&body) {
        Ok(b) => b,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "unable to decode json"),
    };

    let list = match state.registry.get_or_create(&user) {
        Ok(l) => l,
        Err(e) => return app_error_response(e),
    };
    if let Some(token) = body.token.filter(|t| !t.is_empty()) {
        if let Err(e) = list.set_token(token).await {
            return app_error_response(e);
        }
    }

    match list.add(&body.event_id).await {
        Ok(AddOutcome::Added) => {
            (StatusCode::CREATED, Json(json!({ "event": body.event_id }))).into_response()
        }
        Ok(AddOutcome::AlreadyWatched) => {
            (StatusCode::OK, Json(json!({ "event": body.event_id }))).into_response()
        }
        Err(e) => app_error_response(e),
    }
}

async fn list_events(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return error_response(code, &msg);
    }
    let user = match UserId::parse(&user_id) {
        Ok(u) => u,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let list = match state.registry.get(&user) {
        Ok(Some(l)) => l,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "user not found"),
        Err(e) => return app_error_response(e),
    };

    match list.list().await {
        Ok(events) => Json(json!({ "events": events })).into_response(),
        Err(e) => app_error_response(e),
    }
}

async fn delete_event(
    State(state): State<ApiState>,
    Path((user_id, event_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return error_response(code, &msg);
    }
    let (user, event) = match (UserId::parse(&user_id), EventId::parse(&event_id)) {
        (Ok(u), Ok(e)) => (u, e),
        (Err(e), _) | (_, Err(e)) => {
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };
    let list = match state.registry.get(&user) {
        Ok(Some(l)) => l,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "user not found"),
        Err(e) => return app_error_response(e),
    };

    match list.delete(&event).await {
        Ok(()) => Json(json!({ "event": event })).into_response(),
        Err(e) => app_error_response(e),
    }
}

fn app_error_response(e: AppError) -> Response {
    if e.is_not_found() {
        return error_response(StatusCode::NOT_FOUND, &e.to_string());
    }
    error!("request failed: {e}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
}

fn error_response(code: StatusCode, description: &str) -> Response {
    (
        code,
        Json(json!({ "status": "error", "description": description })),
    )
        .into_response()
}

fn check_auth(headers: &HeaderMap, token: &Option<String>) -> Result<(), (StatusCode, String)> {
    let Some(expected) = token else {
        return Ok(());
    }; // no token configured, no auth
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if auth == format!("Bearer {}", expected) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "unauthorized".to_string()))
    }
}
