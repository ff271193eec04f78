//! Server configuration loading from file and environment variables.

use rawi_types::{
    builtin_catalog, ProviderEngine, VoiceModelDescriptor, DEFAULT_VOICE_MODEL, VOICE_ID_PARAM,
};
use rawi_voice::{ArtifactConfig, DialogueConfig, EncoderConfig, ProvidersConfig, SttConfig};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Outbound dialogue webhook.
    #[serde(default)]
    pub dialogue: DialogueConfig,

    /// Speech recognition engine.
    #[serde(default)]
    pub stt: SttConfig,

    /// External audio encoder.
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Artifact storage and sweeping.
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Synthesis provider credentials and tuning.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Voice catalog.
    #[serde(default)]
    pub voices: VoicesConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "rawi_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// The selectable voices and the default among them.
#[derive(Debug, Clone, Deserialize)]
pub struct VoicesConfig {
    /// Voice used when a request names none, or an unknown one.
    #[serde(default = "default_voice")]
    pub default: String,

    #[serde(default = "builtin_catalog")]
    pub models: Vec<VoiceModelDescriptor>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    5005
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE_MODEL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            default: default_voice(),
            models: builtin_catalog(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration is complete but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Checks everything the pipeline needs before any component is built.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the dialogue URL is missing, the
    /// catalog is empty or has duplicate ids, the default voice is not in the
    /// catalog, a catalog voice lacks the credentials its engine needs, or
    /// the orphan age is shorter than a stage may take.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dialogue.webhook_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "dialogue.webhook_url is required (or set RAWI_DIALOGUE_URL)".to_string(),
            ));
        }

        let voices = &self.voices.models;
        if voices.is_empty() {
            return Err(ConfigError::Invalid("voices.models is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for voice in voices {
            if !seen.insert(voice.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate voice id '{}'",
                    voice.id
                )));
            }
        }

        if !seen.contains(self.voices.default.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "default voice '{}' is not in voices.models",
                self.voices.default
            )));
        }

        for voice in voices {
            match voice.engine {
                ProviderEngine::Gemini if self.providers.gemini.api_key.is_empty() => {
                    return Err(ConfigError::Invalid(format!(
                        "voice '{}' needs providers.gemini.api_key (or RAWI_GEMINI_API_KEY)",
                        voice.id
                    )));
                }
                ProviderEngine::ElevenLabs => {
                    if self.providers.elevenlabs.api_key.is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "voice '{}' needs providers.elevenlabs.api_key (or RAWI_ELEVENLABS_API_KEY)",
                            voice.id
                        )));
                    }
                    if voice.param(VOICE_ID_PARAM).map_or(true, str::is_empty) {
                        return Err(ConfigError::Invalid(format!(
                            "voice '{}' needs a '{}' param",
                            voice.id, VOICE_ID_PARAM
                        )));
                    }
                }
                _ => {}
            }
        }

        if self.artifacts.sweep_interval_secs > 0 {
            let longest_stage = self.longest_stage_timeout_secs();
            if self.artifacts.orphan_max_age_secs < longest_stage {
                return Err(ConfigError::Invalid(format!(
                    "artifacts.orphan_max_age_secs ({}) must be at least the longest stage timeout ({}s)",
                    self.artifacts.orphan_max_age_secs, longest_stage
                )));
            }
        }

        Ok(())
    }

    fn longest_stage_timeout_secs(&self) -> u64 {
        [
            self.dialogue.timeout_secs,
            self.stt.timeout_secs,
            self.encoder.timeout_secs,
            self.providers.gemini.timeout_secs,
            self.providers.elevenlabs.timeout_secs,
            self.providers.espeak.timeout_secs,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
    }
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `RAWI_HOST` overrides `server.host`
/// - `RAWI_PORT` overrides `server.port`
/// - `RAWI_LOG_LEVEL` overrides `logging.level`
/// - `RAWI_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `RAWI_DIALOGUE_URL` overrides `dialogue.webhook_url`
/// - `RAWI_GEMINI_API_KEY` overrides `providers.gemini.api_key`
/// - `RAWI_ELEVENLABS_API_KEY` overrides `providers.elevenlabs.api_key`
/// - `RAWI_FFMPEG_PATH` overrides `encoder.ffmpeg_binary`
/// - `RAWI_WHISPER_BINARY` overrides `stt.binary`
/// - `RAWI_WHISPER_MODEL` overrides `stt.model_path`
/// - `RAWI_ARTIFACT_DIR` overrides `artifacts.dir`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `RAWI_*` overrides read through `lookup`.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("RAWI_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("RAWI_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("RAWI_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("RAWI_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(url) = lookup("RAWI_DIALOGUE_URL") {
        config.dialogue.webhook_url = url;
    }
    if let Some(key) = lookup("RAWI_GEMINI_API_KEY") {
        config.providers.gemini.api_key = key;
    }
    if let Some(key) = lookup("RAWI_ELEVENLABS_API_KEY") {
        config.providers.elevenlabs.api_key = key;
    }
    if let Some(path) = lookup("RAWI_FFMPEG_PATH") {
        config.encoder.ffmpeg_binary = path.into();
    }
    if let Some(path) = lookup("RAWI_WHISPER_BINARY") {
        config.stt.binary = path.into();
    }
    if let Some(path) = lookup("RAWI_WHISPER_MODEL") {
        config.stt.model_path = path.into();
    }
    if let Some(dir) = lookup("RAWI_ARTIFACT_DIR") {
        config.artifacts.dir = dir.into();
    }
}
