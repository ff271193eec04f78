//! Shared API types and the catalog/health handlers.

use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rawi_types::VoiceModelDescriptor;
use rawi_voice::VoiceError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<VoiceError> for ApiError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::ArtifactNotFound => ApiError::NotFound("Audio file not found".to_string()),
            VoiceError::UnknownVoiceModel(_) => {
                ApiError::BadRequest("Invalid voice model".to_string())
            }
            VoiceError::Stt(msg) => {
                ApiError::InternalServerError(format!("Transcription failed: {}", msg))
            }
            other => ApiError::InternalServerError(other.to_string()),
        }
    }
}

/// Response body for `GET /voice-models`.
#[derive(Debug, Serialize)]
pub struct VoiceModelsResponse {
    pub models: BTreeMap<String, VoiceModelDescriptor>,
    pub default: String,
}

/// Handler for `GET /voice-models`.
pub async fn voice_models_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<VoiceModelsResponse> {
    let synthesizer = &state.pipeline.context().synthesizer;
    let models = synthesizer
        .voices()
        .iter()
        .map(|voice| (voice.id.clone(), voice.clone()))
        .collect();

    Json(VoiceModelsResponse {
        models,
        default: synthesizer.default_id().to_string(),
    })
}

/// Handler for `GET /health`.
///
/// Reports liveness and the selectable voice ids. Used by load balancers and
/// monitoring to verify the server is running.
pub async fn health_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let voice_models: Vec<&str> = state
        .pipeline
        .context()
        .synthesizer
        .voices()
        .iter()
        .map(|voice| voice.id.as_str())
        .collect();

    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "voice_models": voice_models,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_and_body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn missing_artifact_maps_to_404() {
        let (status, body) = status_and_body(VoiceError::ArtifactNotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Audio file not found");
    }

    #[tokio::test]
    async fn unknown_voice_maps_to_400() {
        let err: ApiError = VoiceError::UnknownVoiceModel("robot".to_string()).into();
        let (status, body) = status_and_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid voice model");
    }

    #[tokio::test]
    async fn transcription_failure_maps_to_500() {
        let err: ApiError = VoiceError::Stt("whisper crashed".to_string()).into();
        let (status, body) = status_and_body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("whisper crashed"));
    }
}
