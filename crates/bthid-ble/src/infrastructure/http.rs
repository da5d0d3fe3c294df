//! HTTP JSON API driving the BLE HID service.
//!
//! | Route              | Body                      | Success            |
//! |--------------------|---------------------------|--------------------|
//! | `GET /healthz`     | –                         | `{"status":"ok","hid_running":…}` |
//! | `POST /hid/text`   | `{"text": "…"}`           | `{"status":"ok"}`  |
//! | `POST /hid/click`  | `{"x", "y", "button"?}`   | `{"status":"ok"}`  |
//! | `POST /hid/move`   | `{"x", "y"}`              | `{"status":"ok"}`  |
//!
//! Failures return 400 with `{"status":"error","detail":…}`. The engine
//! sleeps between reports, so handlers run it on the blocking pool.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use bthid_core::report::MouseButton;

use crate::application::service::{BleHidService, ServiceError};

// ── Error mapping ─────────────────────────────────────────────────────────────

struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl ToString) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.to_string(),
        }
    }

    fn internal(detail: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.to_string(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        ApiError::bad_request(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({"status": "error", "detail": self.detail}));
        (self.status, body).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn router(hid: Arc<BleHidService>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/hid/text", post(send_text))
        .route("/hid/click", post(click))
        .route("/hid/move", post(move_pointer))
        .with_state(hid)
}

async fn healthz(State(hid): State<Arc<BleHidService>>) -> Json<Value> {
    Json(json!({"status": "ok", "hid_running": hid.is_running()}))
}

#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

async fn send_text(
    State(hid): State<Arc<BleHidService>>,
    Json(request): Json<TextRequest>,
) -> Result<Json<Value>, ApiError> {
    debug!(chars = request.text.len(), "POST /hid/text");
    run_blocking(move || hid.send_text(&request.text)).await?;
    Ok(Json(json!({"status": "ok"})))
}

#[derive(Deserialize)]
struct ClickRequest {
    x: i32,
    y: i32,
    button: Option<String>,
}

async fn click(
    State(hid): State<Arc<BleHidService>>,
    Json(request): Json<ClickRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = request.button.unwrap_or_else(|| "left".to_string());
    let button = MouseButton::from_name(&name)
        .ok_or_else(|| ApiError::from(ServiceError::UnknownButton(name)))?;
    run_blocking(move || hid.click(request.x, request.y, button)).await?;
    Ok(Json(json!({"status": "ok"})))
}

#[derive(Deserialize)]
struct MoveRequest {
    x: i32,
    y: i32,
}

async fn move_pointer(
    State(hid): State<Arc<BleHidService>>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<Value>, ApiError> {
    run_blocking(move || hid.move_pointer(request.x, request.y)).await?;
    Ok(Json(json!({"status": "ok"})))
}

/// Runs a paced engine operation off the async worker threads.
async fn run_blocking<F>(operation: F) -> Result<(), ApiError>
where
    F: FnOnce() -> Result<(), ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| ApiError::internal(format!("engine task failed: {e}")))?
        .map_err(ApiError::from)
}
