//! Rawi server library logic.

pub mod api;
pub mod api_voice;
pub mod background;
pub mod config;

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Extension, Router};
use config::Config;
use rawi_voice::{
    ArtifactStore, AudioEncoder, DialogueRelay, PipelineContext, PipelineCoordinator,
    SynthesisOrchestrator, TranscriptionGateway, VoiceError, WhisperEngine,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The voice-reply pipeline.
    pub pipeline: Arc<PipelineCoordinator>,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<PipelineCoordinator>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
        }
    }

    pub fn artifacts(&self) -> &Arc<ArtifactStore> {
        &self.pipeline.context().artifacts
    }
}

/// Builds every pipeline component from configuration.
///
/// Opening the artifact store clears audio left by a previous process.
///
/// # Errors
///
/// Returns `VoiceError` if the artifact directory cannot be prepared or a
/// component rejects its configuration.
pub async fn build_pipeline(config: &Config) -> Result<PipelineCoordinator, VoiceError> {
    let artifacts = Arc::new(ArtifactStore::open(&config.artifacts.dir).await?);
    let encoder = Arc::new(AudioEncoder::new(&config.encoder, artifacts.scratch_dir()));

    let engine = Arc::new(WhisperEngine::new(&config.stt, encoder.clone()));
    let transcriber = TranscriptionGateway::new(engine, artifacts.scratch_dir());
    let relay = DialogueRelay::new(&config.dialogue)?;
    let synthesizer = SynthesisOrchestrator::from_config(
        config.voices.models.clone(),
        config.voices.default.clone(),
        &config.providers,
        encoder,
    )?;

    tracing::info!(
        voices = synthesizer.voices().len(),
        default_voice = synthesizer.default_id(),
        fallback = synthesizer.fallback_id(),
        artifact_dir = %artifacts.root().display(),
        "voice pipeline ready"
    );

    Ok(PipelineCoordinator::new(Arc::new(PipelineContext {
        transcriber,
        relay,
        synthesizer,
        artifacts,
    })))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/health", get(api::health_handler))
        .route("/voice-models", get(api::voice_models_handler))
        .route("/transcribe", post(api_voice::transcribe_handler))
        .route("/audio", get(api_voice::audio_handler))
        .route("/test-voice/{voiceModel}", get(api_voice::test_voice_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
