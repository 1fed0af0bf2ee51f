//! POS concierge HTTP surface.
//!
//! `POST /api/chat`, `/api/chat/approve` and `/api/chat/reject` drive the
//! confirmation gate; `GET /api/summary` serves the dashboard.

pub mod app;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use concierge_core::gate::ChatReply;
use concierge_core::summary::{build_summary, DashboardSummary};
use concierge_types::ConciergeError;

pub use app::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionBody {
    pub session_id: String,
}

type ApiError = (StatusCode, Json<Value>);

fn internal(e: ConciergeError) -> ApiError {
    log::error!("request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/chat", post(chat))
        .route("/api/chat/approve", post(approve))
        .route("/api/chat/reject", post(reject))
        .route("/api/summary", get(summary))
        .with_state(state)
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, ApiError> {
    let outcome = state.gate.chat(&body.session_id, &body.message).await;
    state.log_turn_events(&body.session_id);
    outcome.map(Json).map_err(internal)
}

async fn approve(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> Result<Json<ChatReply>, ApiError> {
    let outcome = state.gate.approve(&body.session_id).await;
    state.log_turn_events(&body.session_id);
    outcome.map(Json).map_err(internal)
}

async fn reject(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> Result<Json<ChatReply>, ApiError> {
    state
        .gate
        .reject(&body.session_id)
        .await
        .map(Json)
        .map_err(internal)
}

async fn summary(State(state): State<AppState>) -> Result<Json<DashboardSummary>, ApiError> {
    build_summary(state.connector.as_ref(), &state.api_tool_suffix)
        .await
        .map(Json)
        .map_err(internal)
}
