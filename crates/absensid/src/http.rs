//! HTTP API.
//!
//! Endpoints:
//!   POST /analyze-face   multipart field `image` → names of the faces in it
//!   GET  /status         version, roster size, last sync

use std::sync::Arc;

use absensi_core::{DistanceMatcher, Matcher};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveTime;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::engine::{EngineError, EngineHandle};
use crate::roster::RosterStore;

/// Name of the multipart field carrying the photo.
const IMAGE_FIELD: &str = "image";

/// State shared by all handlers.
pub struct AppState {
    pub engine: EngineHandle,
    pub store: Arc<RosterStore>,
    pub matcher: DistanceMatcher,
    pub sync_time: NaiveTime,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("multipart field `image` is required")]
    MissingImage,
    #[error("invalid multipart request: {0}")]
    Rejected(#[from] MultipartRejection),
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingImage => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Rejected(r) => r.status(),
            Self::Multipart(e) => e.status(),
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "analyze-face failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub detected_faces: Vec<String>,
    pub count: usize,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/analyze-face", post(analyze_face))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// POST /analyze-face
async fn analyze_face(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let image = read_image_field(multipart?).await?;
    let signatures = state.engine.encode(image).await?;

    let roster = state.store.roster();
    let detected_faces: Vec<String> = signatures
        .iter()
        .map(|sig| state.matcher.compare(sig, roster.entries()).label().to_string())
        .collect();

    tracing::info!(faces = detected_faces.len(), roster = roster.len(), "analyze-face");

    Ok(Json(AnalyzeResponse {
        status: "success",
        count: detected_faces.len(),
        detected_faces,
    }))
}

async fn read_image_field(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            return Ok(field.bytes().await?.to_vec());
        }
    }
    Err(ApiError::MissingImage)
}

// GET /status
async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.store.snapshot();
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "roster_size": snapshot.roster.len(),
        "last_synced_at": snapshot.synced_at.map(|t| t.to_rfc3339()),
        "sync_time": state.sync_time.format("%H:%M").to_string(),
    }))
}
