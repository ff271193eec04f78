//! Voice pipeline handlers: upload, playback, and voice tests.

use crate::{api::ApiError, AppState};
use axum::{
    extract::{multipart::MultipartError, Extension, Json, Multipart, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

/// Where clients fetch the current artifact.
pub const AUDIO_URL: &str = "/audio";

/// Phrase synthesized by `GET /test-voice/{id}`.
pub const TEST_PHRASE: &str = "مرحباً، هذا اختبار للصوت. كيف يبدو؟";

/// Response body for `POST /transcribe`.
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcription: String,
    pub n8n_reply: String,
    pub audio_ready: bool,
    pub audio_url: String,
    pub voice_model_used: String,
    pub voice_model_name: String,
    /// Wall-clock seconds for the whole run.
    pub processing_time: f64,
    pub audio_provider: Option<String>,
    pub fallback_used: bool,
    pub reply_was_fallback: bool,
}

/// Response body for `GET /test-voice/{id}`.
#[derive(Debug, Serialize)]
pub struct TestVoiceResponse {
    pub test_text: String,
    pub audio_ready: bool,
    pub audio_url: String,
    pub voice_model: String,
    pub audio_provider: Option<String>,
    pub fallback_used: bool,
}

struct Upload {
    audio: Vec<u8>,
    format_hint: Option<String>,
    voice_model: Option<String>,
}

/// Reads the `audio` file and optional `voice_model` fields.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut upload = Upload {
        audio: Vec::new(),
        format_hint: None,
        voice_model: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error("multipart error", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("audio") => {
                upload.format_hint = field
                    .file_name()
                    .and_then(|name| std::path::Path::new(name).extension())
                    .and_then(|ext| ext.to_str())
                    .or_else(|| field.content_type().and_then(subtype))
                    .map(str::to_string);
                upload.audio = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error("failed to read upload", e))?
                    .to_vec();
            }
            Some("voice_model") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("invalid voice_model: {}", e)))?;
                let value = value.trim();
                if !value.is_empty() {
                    upload.voice_model = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// Bodies over the configured limit surface as multipart errors.
fn upload_error(context: &str, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Audio file too large".to_string())
    } else {
        ApiError::BadRequest(format!("{}: {}", context, err))
    }
}

/// `audio/webm;codecs=opus` → `webm`.
fn subtype(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .next()
        .and_then(|essence| essence.split_once('/'))
        .map(|(_, sub)| sub.trim())
        .filter(|sub| !sub.is_empty())
}

/// Handler for `POST /transcribe`.
///
/// Runs the full pipeline for one uploaded utterance. Only a missing upload
/// (400) or a transcription failure (500) is reported as an error; dialogue
/// and synthesis failures are folded into the response fields.
pub async fn transcribe_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    if upload.audio.is_empty() {
        return Err(ApiError::BadRequest("No audio file uploaded".to_string()));
    }

    let report = state
        .pipeline
        .run(
            &upload.audio,
            upload.format_hint.as_deref(),
            upload.voice_model.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "pipeline run failed");
            ApiError::from(e)
        })?;

    let processing_time = (report.processing_time.as_secs_f64() * 100.0).round() / 100.0;
    Ok(Json(TranscribeResponse {
        transcription: report.transcript.text,
        n8n_reply: report.reply.text,
        audio_ready: report.speech.audio_ready,
        audio_url: AUDIO_URL.to_string(),
        voice_model_used: report.speech.voice_model_used,
        voice_model_name: report.speech.voice_model_name,
        processing_time,
        audio_provider: report.speech.audio_provider,
        fallback_used: report.speech.fallback_used,
        reply_was_fallback: report.reply.source_was_fallback_default,
    }))
}

/// Handler for `GET /audio`.
///
/// Serves the current artifact with its stored MIME type.
pub async fn audio_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let (artifact, bytes) = state.artifacts().read_current().await?;

    Ok((
        [
            (header::CONTENT_TYPE, artifact.mime_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        bytes,
    )
        .into_response())
}

/// Handler for `GET /test-voice/{voiceModel}`.
///
/// Synthesizes [`TEST_PHRASE`] with the named voice, replacing the current
/// artifact. Unlike `/transcribe`, an unknown voice is rejected.
pub async fn test_voice_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(voice_model): Path<String>,
) -> Result<Json<TestVoiceResponse>, ApiError> {
    let speech = state.pipeline.speak(TEST_PHRASE, &voice_model).await?;

    Ok(Json(TestVoiceResponse {
        test_text: TEST_PHRASE.to_string(),
        audio_ready: speech.audio_ready,
        audio_url: AUDIO_URL.to_string(),
        voice_model: speech.voice_model_used,
        audio_provider: speech.audio_provider,
        fallback_used: speech.fallback_used,
    }))
}
