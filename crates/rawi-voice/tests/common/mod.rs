//! Shared fixtures for rawi-voice integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use rawi_types::ProviderEngine;
use rawi_voice::{RecognitionEngine, SpeechProvider, VoiceError};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Stand-in for ffmpeg: copies the `-i` input to the last argument.
pub const COPY_FFMPEG: &str = r#"#!/bin/sh
input=""
prev=""
for arg; do
  if [ "$prev" = "-i" ]; then input="$arg"; fi
  prev="$arg"
done
cp "$input" "$prev"
"#;

/// Stand-in for ffmpeg: writes a fixed payload to the last argument.
pub const FAKE_MP3_FFMPEG: &str = r#"#!/bin/sh
for last; do :; done
printf 'ID3fake-mp3' > "$last"
"#;

pub const FAILING_BINARY: &str = "#!/bin/sh\necho 'conversion failed' >&2\nexit 1\n";

/// Writes an executable shell script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod script");
    path
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{}", addr)
}

/// Number of regular files directly inside `dir`.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}

/// A provider that either returns a fixed payload or fails, counting calls.
pub struct MockProvider {
    id: String,
    engine: ProviderEngine,
    result: Result<Vec<u8>, String>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn succeeding(id: &str, payload: &[u8]) -> Self {
        Self::with_result(id, Ok(payload.to_vec()))
    }

    pub fn failing(id: &str) -> Self {
        Self::with_result(id, Err(format!("{} is unavailable", id)))
    }

    fn with_result(id: &str, result: Result<Vec<u8>, String>) -> Self {
        Self {
            id: id.to_string(),
            engine: ProviderEngine::Gemini,
            result,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechProvider for MockProvider {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        self.result.clone().map_err(VoiceError::Tts)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn engine(&self) -> ProviderEngine {
        self.engine
    }
}

/// A recognizer returning canned segments.
pub struct MockEngine {
    result: Result<Vec<String>, String>,
    calls: AtomicUsize,
    seen_paths: Mutex<Vec<PathBuf>>,
}

impl MockEngine {
    pub fn segments(segments: &[&str]) -> Self {
        Self {
            result: Ok(segments.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
            seen_paths: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            seen_paths: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen_paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecognitionEngine for MockEngine {
    async fn recognize(&self, audio_path: &Path) -> Result<Vec<String>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(audio_path.exists(), "upload should exist while recognizing");
        self.seen_paths
            .lock()
            .unwrap()
            .push(audio_path.to_path_buf());
        self.result.clone().map_err(VoiceError::Stt)
    }
}
