use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::discovery::DiscoveryService;
use crate::api::models::AudioSource;

#[derive(Clone)]
pub struct ApiState {
    pub discovery: Arc<DiscoveryService>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/audio-sources", get(list_audio_sources))
        .route("/audio-sources/{sink_input_id}/select", post(select_audio_source))
        .route("/health", get(health_check))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub sources: Vec<AudioSource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectResponse {
    pub success: bool,
    pub sink_input_id: u32,
    pub message: String,
}

/// API error carrying the status the handler chose.
#[derive(Debug)]
struct ApiError(StatusCode, anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.0,
            Json(serde_json::json!({ "error": self.1.to_string() })),
        )
            .into_response()
    }
}

/// GET /audio-sources — applications currently playing audio, with window
/// titles where one matched.
async fn list_audio_sources(
    State(state): State<ApiState>,
) -> Result<Json<SourcesResponse>, ApiError> {
    let sources = state
        .discovery
        .discover_sources()
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    Ok(Json(SourcesResponse { sources }))
}

/// POST /audio-sources/{id}/select — route the stream into the virtual sink.
async fn select_audio_source(
    State(state): State<ApiState>,
    Path(sink_input_id): Path<i64>,
) -> Result<Json<SelectResponse>, ApiError> {
    if sink_input_id < 0 || sink_input_id > u32::MAX as i64 {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("invalid sink_input_id"),
        ));
    }
    let sink_input_id = sink_input_id as u32;

    state
        .discovery
        .select_source(sink_input_id)
        .await
        .map_err(|e| ApiError(StatusCode::NOT_FOUND, e))?;

    Ok(Json(SelectResponse {
        success: true,
        sink_input_id,
        message: "Audio source routed to virtual sink".into(),
    }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "groove-bot-api",
    }))
}
