//! Speech synthesis providers.
//!
//! Every provider renders text to the deliverable MP3 format behind the same
//! [`SpeechProvider`] contract, hiding how its upstream returns audio:
//! Gemini answers with base64 PCM that is wrapped and encoded locally,
//! ElevenLabs streams MP3 directly, and eSpeak NG writes WAV to stdout.

use crate::config::{ElevenLabsConfig, EspeakConfig, GeminiConfig};
use crate::encoder::AudioEncoder;
use crate::error::VoiceError;
use crate::wav::PcmFormat;
use async_trait::async_trait;
use base64::Engine as _;
use rawi_types::ProviderEngine;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Id the guaranteed-fallback provider reports.
pub const FALLBACK_PROVIDER_ID: &str = "espeak";

/// A text-to-speech backend.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Renders `text` and returns the encoded audio.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;

    /// Identifier reported when this provider produced the audio.
    fn id(&self) -> &str;

    fn engine(&self) -> ProviderEngine;
}

fn check_input(text: &str) -> Result<(), VoiceError> {
    if text.len() > MAX_TTS_INPUT_BYTES {
        return Err(VoiceError::Tts(format!(
            "text exceeds maximum size: {} bytes (limit: {} bytes)",
            text.len(),
            MAX_TTS_INPUT_BYTES
        )));
    }
    if text.trim().is_empty() {
        return Err(VoiceError::Tts("text is empty".to_string()));
    }
    Ok(())
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, VoiceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))
}

// ── Gemini ──

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

/// Extracts `rate=NNNN` from a PCM mime type such as `audio/L16;codec=pcm;rate=24000`.
fn sample_rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.trim().parse().ok())
}

/// Gemini TTS over the `generateContent` REST endpoint.
pub struct GeminiProvider {
    id: String,
    config: GeminiConfig,
    client: reqwest::Client,
    encoder: Arc<AudioEncoder>,
}

impl GeminiProvider {
    pub fn new(
        id: impl Into<String>,
        config: GeminiConfig,
        encoder: Arc<AudioEncoder>,
    ) -> Result<Self, VoiceError> {
        if config.api_key.is_empty() {
            return Err(VoiceError::Config("Gemini API key is not configured".to_string()));
        }
        let client = http_client(config.timeout_secs)?;
        Ok(Self {
            id: id.into(),
            config,
            client,
            encoder,
        })
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        let prompt = if self.config.style_prompt.is_empty() {
            text.to_string()
        } else {
            format!("{} {}", self.config.style_prompt, text)
        };

        serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.config.voice_name }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl SpeechProvider for GeminiProvider {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        check_input(text)?;
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| VoiceError::Tts(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Tts(format!("Gemini returned {}: {}", status, body)));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Tts(format!("Gemini response malformed: {}", e)))?;

        let inline = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
            .ok_or_else(|| VoiceError::Tts("Gemini response carried no audio".to_string()))?;

        let pcm = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| VoiceError::Tts(format!("Gemini audio is not valid base64: {}", e)))?;

        if pcm.is_empty() {
            return Err(VoiceError::Tts("Gemini returned an empty audio payload".to_string()));
        }

        let rate = sample_rate_from_mime(&inline.mime_type).unwrap_or(self.config.sample_rate);
        let encoded = self
            .encoder
            .encode_pcm(&pcm, PcmFormat::default().with_sample_rate(rate))
            .await?;

        tracing::info!(provider = %self.id, pcm_bytes = pcm.len(), rate, "Gemini audio generated");
        Ok(encoded)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn engine(&self) -> ProviderEngine {
        ProviderEngine::Gemini
    }
}

// ── ElevenLabs ──

/// ElevenLabs text-to-speech for one upstream voice.
pub struct ElevenLabsProvider {
    id: String,
    voice_id: String,
    config: ElevenLabsConfig,
    client: reqwest::Client,
}

impl ElevenLabsProvider {
    pub fn new(
        id: impl Into<String>,
        voice_id: impl Into<String>,
        config: ElevenLabsConfig,
    ) -> Result<Self, VoiceError> {
        let id = id.into();
        let voice_id = voice_id.into();
        if config.api_key.is_empty() {
            return Err(VoiceError::Config(
                "ElevenLabs API key is not configured".to_string(),
            ));
        }
        if voice_id.is_empty() {
            return Err(VoiceError::Config(format!(
                "ElevenLabs voice '{}' has no voice_id",
                id
            )));
        }
        let client = http_client(config.timeout_secs)?;
        Ok(Self {
            id,
            voice_id,
            config,
            client,
        })
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsProvider {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        check_input(text)?;
        let url = format!(
            "{}/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            self.voice_id
        );

        let body = serde_json::json!({
            "text": text,
            "model_id": self.config.model_id,
            "voice_settings": {
                "stability": self.config.stability,
                "similarity_boost": self.config.similarity_boost,
                "style": self.config.style,
                "use_speaker_boost": self.config.use_speaker_boost,
            }
        });

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("xi-api-key", &self.config.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Tts(format!("ElevenLabs request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Tts(format!(
                "ElevenLabs returned {}: {}",
                status, body
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Tts(format!("Failed to read ElevenLabs audio: {}", e)))?;

        if audio.is_empty() {
            return Err(VoiceError::Tts(
                "ElevenLabs returned an empty audio payload".to_string(),
            ));
        }

        tracing::info!(provider = %self.id, voice_id = %self.voice_id, bytes = audio.len(), "ElevenLabs audio generated");
        Ok(audio.to_vec())
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn engine(&self) -> ProviderEngine {
        ProviderEngine::ElevenLabs
    }
}

// ── eSpeak NG ──

/// Local eSpeak NG synthesis. No network access; used as the last resort.
pub struct EspeakProvider {
    id: String,
    binary: PathBuf,
    voice: String,
    timeout: Duration,
    encoder: Arc<AudioEncoder>,
}

impl EspeakProvider {
    pub fn new(id: impl Into<String>, config: &EspeakConfig, encoder: Arc<AudioEncoder>) -> Self {
        Self {
            id: id.into(),
            binary: config.binary.clone(),
            voice: config.voice.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            encoder,
        }
    }
}

#[async_trait]
impl SpeechProvider for EspeakProvider {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        check_input(text)?;

        let mut command = Command::new(&self.binary);
        command
            .arg("-v")
            .arg(&self.voice)
            .arg("--stdout")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| VoiceError::Tts(format!("Failed to spawn espeak-ng: {}", e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Tts(format!(
                    "espeak-ng timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Tts(format!("Failed to wait for espeak-ng: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Tts(format!("espeak-ng failed: {}", stderr.trim())));
        }

        if output.stdout.is_empty() {
            return Err(VoiceError::Tts("espeak-ng produced no audio".to_string()));
        }

        let encoded = self.encoder.encode_container_bytes(&output.stdout).await?;
        tracing::info!(provider = %self.id, bytes = encoded.len(), "eSpeak fallback audio generated");
        Ok(encoded)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn engine(&self) -> ProviderEngine {
        ProviderEngine::Espeak
    }
}
