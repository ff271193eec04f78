mod common;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine as _;
use common::{spawn_server, write_script, COPY_FFMPEG, FAILING_BINARY};
use rawi_types::ProviderEngine;
use rawi_voice::{
    AudioEncoder, ElevenLabsConfig, ElevenLabsProvider, EncoderConfig, EspeakConfig,
    EspeakProvider, GeminiConfig, GeminiProvider, SpeechProvider, VoiceError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(String, HashMap<String, String>, Option<String>, Value)>>>,
}

impl Captured {
    fn last(&self) -> (String, HashMap<String, String>, Option<String>, Value) {
        self.requests.lock().unwrap().last().cloned().expect("no request captured")
    }
}

fn passthrough_encoder(bin_dir: &std::path::Path, scratch: &std::path::Path) -> Arc<AudioEncoder> {
    let config = EncoderConfig {
        ffmpeg_binary: write_script(bin_dir, "ffmpeg", COPY_FFMPEG),
        timeout_secs: 5,
        ..EncoderConfig::default()
    };
    Arc::new(AudioEncoder::new(&config, scratch))
}

async fn elevenlabs_mock(
    State(captured): State<Captured>,
    Path(voice_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Vec<u8>) {
    let key = headers
        .get("xi-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captured
        .requests
        .lock()
        .unwrap()
        .push((voice_id, query, key, body));
    (StatusCode::OK, b"ID3eleven".to_vec())
}

#[tokio::test]
async fn elevenlabs_posts_voice_settings_and_returns_mp3() {
    let captured = Captured::default();
    let router = Router::new()
        .route("/text-to-speech/{voice_id}", post(elevenlabs_mock))
        .with_state(captured.clone());
    let base = spawn_server(router).await;

    let provider = ElevenLabsProvider::new(
        "elevenlabs_bella",
        "EXAVITQu4vr4xnSDxMaL",
        ElevenLabsConfig {
            base_url: base,
            ..ElevenLabsConfig::new("xi-test-key")
        },
    )
    .unwrap();

    let audio = provider.synthesize("أهلاً وسهلاً").await.unwrap();

    assert_eq!(audio, b"ID3eleven");
    assert_eq!(provider.id(), "elevenlabs_bella");
    assert_eq!(provider.engine(), ProviderEngine::ElevenLabs);

    let (voice_id, query, key, body) = captured.last();
    assert_eq!(voice_id, "EXAVITQu4vr4xnSDxMaL");
    assert_eq!(query.get("output_format").map(String::as_str), Some("mp3_44100_128"));
    assert_eq!(key.as_deref(), Some("xi-test-key"));
    assert_eq!(body["text"], "أهلاً وسهلاً");
    assert_eq!(body["model_id"], "eleven_multilingual_v2");
    assert_eq!(body["voice_settings"]["use_speaker_boost"], true);
}

#[tokio::test]
async fn elevenlabs_error_status_is_a_tts_error() {
    let router = Router::new().route(
        "/text-to-speech/{voice_id}",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
    );
    let base = spawn_server(router).await;

    let provider = ElevenLabsProvider::new(
        "elevenlabs_adam",
        "pNInz6obpgDQGcFmaJgB",
        ElevenLabsConfig {
            base_url: base,
            ..ElevenLabsConfig::new("bad-key")
        },
    )
    .unwrap();

    match provider.synthesize("hello").await {
        Err(VoiceError::Tts(msg)) => assert!(msg.contains("401"), "{}", msg),
        other => panic!("expected Tts error, got {:?}", other.map(|a| a.len())),
    }
}

#[tokio::test]
async fn gemini_pcm_is_wrapped_at_the_declared_rate() {
    let pcm: Vec<u8> = (0..3200u16).flat_map(|i| i.to_le_bytes()).collect();
    let encoded_pcm = base64::engine::general_purpose::STANDARD.encode(&pcm);
    let captured = Captured::default();

    let router = Router::new()
        .route(
            "/models/{call}",
            post(
                move |State(captured): State<Captured>,
                      Path(call): Path<String>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| {
                    let data = encoded_pcm.clone();
                    async move {
                        let key = headers
                            .get("x-goog-api-key")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        captured
                            .requests
                            .lock()
                            .unwrap()
                            .push((call, HashMap::new(), key, body));
                        Json(json!({
                            "candidates": [{
                                "content": {
                                    "parts": [{
                                        "inlineData": {
                                            "mimeType": "audio/L16;codec=pcm;rate=16000",
                                            "data": data
                                        }
                                    }]
                                }
                            }]
                        }))
                    }
                },
            ),
        )
        .with_state(captured.clone());
    let base = spawn_server(router).await;

    let bin = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let provider = GeminiProvider::new(
        "gemini",
        GeminiConfig {
            base_url: base,
            ..GeminiConfig::new("gm-test-key")
        },
        passthrough_encoder(bin.path(), scratch.path()),
    )
    .unwrap();

    let audio = provider.synthesize("مرحبا").await.unwrap();

    let reader = hound::WavReader::new(Cursor::new(audio)).unwrap();
    assert_eq!(reader.spec().sample_rate, 16_000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len(), 3200);

    let (call, _, key, body) = captured.last();
    assert_eq!(call, "gemini-2.5-flash-preview-tts:generateContent");
    assert_eq!(key.as_deref(), Some("gm-test-key"));
    assert!(body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .ends_with("مرحبا"));
}

#[tokio::test]
async fn gemini_without_audio_is_a_tts_error() {
    let router = Router::new().route(
        "/models/{call}",
        post(|| async { Json(json!({ "candidates": [] })) }),
    );
    let base = spawn_server(router).await;

    let bin = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let provider = GeminiProvider::new(
        "gemini",
        GeminiConfig {
            base_url: base,
            ..GeminiConfig::new("k")
        },
        passthrough_encoder(bin.path(), scratch.path()),
    )
    .unwrap();

    assert!(matches!(
        provider.synthesize("مرحبا").await,
        Err(VoiceError::Tts(_))
    ));
}

#[tokio::test]
async fn espeak_output_is_transcoded() {
    let bin = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let espeak = write_script(
        bin.path(),
        "espeak-ng",
        "#!/bin/sh\n[ \"$1\" = \"-v\" ] && [ \"$2\" = \"ar\" ] && [ \"$3\" = \"--stdout\" ] || exit 2\nprintf 'RIFFespeak'\n",
    );
    let provider = EspeakProvider::new(
        "espeak",
        &EspeakConfig {
            binary: espeak,
            ..EspeakConfig::default()
        },
        passthrough_encoder(bin.path(), scratch.path()),
    );

    let audio = provider.synthesize("مرحبا").await.unwrap();

    assert_eq!(audio, b"RIFFespeak");
    assert_eq!(provider.engine(), ProviderEngine::Espeak);
}

#[tokio::test]
async fn espeak_failure_is_a_tts_error() {
    let bin = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let espeak = write_script(bin.path(), "espeak-ng", FAILING_BINARY);
    let provider = EspeakProvider::new(
        "espeak",
        &EspeakConfig {
            binary: espeak,
            ..EspeakConfig::default()
        },
        passthrough_encoder(bin.path(), scratch.path()),
    );

    match provider.synthesize("مرحبا").await {
        Err(VoiceError::Tts(msg)) => assert!(msg.contains("conversion failed"), "{}", msg),
        other => panic!("expected Tts error, got {:?}", other.map(|a| a.len())),
    }
}
