//! Shared fixtures for rawi-server API tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::routing::post;
use axum::{Json, Router};
use rawi_server::{app, AppState};
use rawi_types::{builtin_catalog, ProviderEngine};
use rawi_voice::{
    ArtifactStore, DialogueConfig, DialogueRelay, PipelineContext, PipelineCoordinator,
    RecognitionEngine, SpeechProvider, SynthesisOrchestrator, TranscriptionGateway, VoiceError,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const BOUNDARY: &str = "rawi-test-boundary";

pub struct MockProvider {
    id: String,
    result: Result<Vec<u8>, String>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn succeeding(id: &str, payload: &[u8]) -> Self {
        Self {
            id: id.to_string(),
            result: Ok(payload.to_vec()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(id: &str) -> Self {
        Self {
            id: id.to_string(),
            result: Err(format!("{} is unavailable", id)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechProvider for MockProvider {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(VoiceError::Tts)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn engine(&self) -> ProviderEngine {
        ProviderEngine::Gemini
    }
}

pub struct MockEngine {
    result: Result<Vec<String>, String>,
    pub calls: AtomicUsize,
}

impl MockEngine {
    pub fn segments(segments: &[&str]) -> Self {
        Self {
            result: Ok(segments.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecognitionEngine for MockEngine {
    async fn recognize(&self, _audio_path: &Path) -> Result<Vec<String>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(VoiceError::Stt)
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub engine: Arc<MockEngine>,
    pub providers: HashMap<String, Arc<MockProvider>>,
    pub fallback: Arc<MockProvider>,
    _dir: tempfile::TempDir,
}

impl TestApp {
    pub fn provider(&self, id: &str) -> &MockProvider {
        &self.providers[id]
    }
}

/// Serves a webhook that always replies `{"response": reply}`.
pub async fn spawn_webhook(reply: &'static str) -> String {
    let router = Router::new().route(
        "/webhook",
        post(move || async move { Json(json!({ "response": reply })) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/webhook", addr)
}

/// Builds the router over mocks. Every built-in voice succeeds unless named
/// in `failing`.
pub async fn test_app(
    engine: MockEngine,
    webhook_url: String,
    failing: &[&str],
    fallback: MockProvider,
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Arc::new(ArtifactStore::open(dir.path()).await.unwrap());

    let voices = builtin_catalog();
    let mut mocks = HashMap::new();
    let mut registry: HashMap<String, Arc<dyn SpeechProvider>> = HashMap::new();
    for voice in &voices {
        let mock = if failing.contains(&voice.id.as_str()) {
            Arc::new(MockProvider::failing(&voice.id))
        } else {
            let payload = format!("mp3:{}", voice.id);
            Arc::new(MockProvider::succeeding(&voice.id, payload.as_bytes()))
        };
        registry.insert(voice.id.clone(), mock.clone());
        mocks.insert(voice.id.clone(), mock);
    }
    let fallback = Arc::new(fallback);
    let synthesizer =
        SynthesisOrchestrator::new(voices, registry, "gemini", fallback.clone()).unwrap();

    let engine = Arc::new(engine);
    let context = PipelineContext {
        transcriber: TranscriptionGateway::new(engine.clone(), artifacts.scratch_dir()),
        relay: DialogueRelay::new(&DialogueConfig {
            timeout_secs: 2,
            ..DialogueConfig::new(webhook_url)
        })
        .unwrap(),
        synthesizer,
        artifacts,
    };

    let state = AppState::new(
        Arc::new(PipelineCoordinator::new(Arc::new(context))),
        1024 * 1024,
    );

    TestApp {
        router: app(state.clone()),
        state,
        engine,
        providers: mocks,
        fallback,
        _dir: dir,
    }
}

/// Encodes multipart form fields. `(name, filename, content_type, data)`.
pub fn multipart_body(parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", name);
        if let Some(filename) = filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
