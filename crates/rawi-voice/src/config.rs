use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Reply synthesized when the dialogue service cannot be reached.
pub const DEFAULT_FALLBACK_REPLY: &str = "عذرًا، حدث خطأ أثناء الاتصال بالمساعد.";

fn default_dialogue_timeout_secs() -> u64 {
    30
}

fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_gemini_voice() -> String {
    "Kore".to_string()
}

fn default_gemini_style_prompt() -> String {
    "Say in a friendly tone with saudia arabian accent:".to_string()
}

fn default_pcm_sample_rate() -> u32 {
    24_000
}

fn default_remote_timeout_secs() -> u64 {
    60
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_elevenlabs_output_format() -> String {
    "mp3_44100_128".to_string()
}

fn default_stability() -> f32 {
    0.5
}

fn default_similarity_boost() -> f32 {
    0.75
}

fn default_style() -> f32 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_espeak_binary() -> PathBuf {
    PathBuf::from("espeak-ng")
}

fn default_espeak_voice() -> String {
    "ar".to_string()
}

fn default_local_timeout_secs() -> u64 {
    30
}

fn default_ffmpeg_binary() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_bitrate() -> String {
    "128k".to_string()
}

fn default_whisper_binary() -> PathBuf {
    PathBuf::from("whisper-cli")
}

fn default_whisper_model() -> PathBuf {
    PathBuf::from("models/ggml-base.bin")
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_stt_timeout_secs() -> u64 {
    120
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_orphan_max_age_secs() -> u64 {
    600
}

/// Outbound dialogue webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Webhook URL receiving `{ "text": transcript }`. Must be supplied.
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_dialogue_timeout_secs")]
    pub timeout_secs: u64,
    /// Reply used whenever the webhook fails.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout_secs: default_dialogue_timeout_secs(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

impl DialogueConfig {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            ..Self::default()
        }
    }
}

/// Gemini TTS settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Prebuilt voice name.
    #[serde(default = "default_gemini_voice")]
    pub voice_name: String,
    /// Instruction prepended to the text to steer delivery.
    #[serde(default = "default_gemini_style_prompt")]
    pub style_prompt: String,
    /// PCM sample rate assumed when the response does not declare one.
    #[serde(default = "default_pcm_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            voice_name: default_gemini_voice(),
            style_prompt: default_gemini_style_prompt(),
            sample_rate: default_pcm_sample_rate(),
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("voice_name", &self.voice_name)
            .field("style_prompt", &self.style_prompt)
            .field("sample_rate", &self.sample_rate)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

/// ElevenLabs settings shared by every ElevenLabs voice.
#[derive(Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_elevenlabs_base_url")]
    pub base_url: String,
    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,
    #[serde(default = "default_elevenlabs_output_format")]
    pub output_format: String,
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,
    #[serde(default = "default_style")]
    pub style: f32,
    #[serde(default = "default_true")]
    pub use_speaker_boost: bool,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_elevenlabs_base_url(),
            model_id: default_elevenlabs_model(),
            output_format: default_elevenlabs_output_format(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
            style: default_style(),
            use_speaker_boost: true,
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

impl fmt::Debug for ElevenLabsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .field("output_format", &self.output_format)
            .field("stability", &self.stability)
            .field("similarity_boost", &self.similarity_boost)
            .field("style", &self.style)
            .field("use_speaker_boost", &self.use_speaker_boost)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

/// eSpeak NG settings for the guaranteed fallback voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EspeakConfig {
    #[serde(default = "default_espeak_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_espeak_voice")]
    pub voice: String,
    #[serde(default = "default_local_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            binary: default_espeak_binary(),
            voice: default_espeak_voice(),
            timeout_secs: default_local_timeout_secs(),
        }
    }
}

/// Provider credentials and tuning, one table per engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,
    #[serde(default)]
    pub espeak: EspeakConfig,
}

/// External encoder (ffmpeg) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_ffmpeg_binary")]
    pub ffmpeg_binary: PathBuf,
    /// MP3 bitrate passed as `-b:a`.
    #[serde(default = "default_bitrate")]
    pub bitrate: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: default_ffmpeg_binary(),
            bitrate: default_bitrate(),
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

/// Speech recognition (whisper.cpp) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default = "default_whisper_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_whisper_model")]
    pub model_path: PathBuf,
    /// Spoken language hint, or `auto`.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_stt_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            binary: default_whisper_binary(),
            model_path: default_whisper_model(),
            language: default_language(),
            timeout_secs: default_stt_timeout_secs(),
        }
    }
}

/// Artifact storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
    /// Seconds between orphan sweeps. `0` disables the sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Age after which a non-current artifact or scratch file is an orphan.
    #[serde(default = "default_orphan_max_age_secs")]
    pub orphan_max_age_secs: u64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
            sweep_interval_secs: default_sweep_interval_secs(),
            orphan_max_age_secs: default_orphan_max_age_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_redacted_in_debug() {
        let gemini = GeminiConfig::new("gm-secret");
        let eleven = ElevenLabsConfig::new("xi-secret");

        let rendered = format!("{:?} {:?}", gemini, eleven);
        assert!(!rendered.contains("gm-secret"));
        assert!(!rendered.contains("xi-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn credentials_are_not_serialized() {
        let json = serde_json::to_value(GeminiConfig::new("gm-secret")).unwrap();
        assert!(json.get("api_key").is_none());
    }

    #[test]
    fn providers_parse_with_defaults() {
        let toml_str = r#"
            [gemini]
            api_key = "k1"

            [elevenlabs]
            api_key = "k2"
            stability = 0.3
        "#;

        let providers: ProvidersConfig = toml::from_str(toml_str).expect("parse TOML");
        assert_eq!(providers.gemini.api_key, "k1");
        assert_eq!(providers.gemini.voice_name, "Kore");
        assert_eq!(providers.gemini.sample_rate, 24_000);
        assert_eq!(providers.elevenlabs.model_id, "eleven_multilingual_v2");
        assert!((providers.elevenlabs.stability - 0.3).abs() < f32::EPSILON);
        assert!(providers.elevenlabs.use_speaker_boost);
        assert_eq!(providers.espeak.voice, "ar");
    }

    #[test]
    fn dialogue_defaults() {
        let config = DialogueConfig::new("http://localhost:5678/webhook");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.fallback_reply, DEFAULT_FALLBACK_REPLY);
    }
}
