//! Voice model catalog definitions.
//!
//! A `VoiceModelDescriptor` maps a public voice id (the value clients send as
//! `voice_model`) to the synthesis engine that renders it and the engine
//! parameters it needs, such as an ElevenLabs voice id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Parameter key carrying the upstream voice identifier for ElevenLabs voices.
pub const VOICE_ID_PARAM: &str = "voice_id";

/// Voice id used when a request names no voice, or an unknown one.
pub const DEFAULT_VOICE_MODEL: &str = "gemini";

/// Supported synthesis engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderEngine {
    /// Google Gemini TTS (remote, base64 PCM response).
    #[default]
    Gemini,
    /// ElevenLabs (remote, MP3 stream response).
    #[serde(rename = "elevenlabs")]
    ElevenLabs,
    /// eSpeak NG (local subprocess, WAV output).
    Espeak,
}

impl ProviderEngine {
    /// Returns the string label for this engine.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::ElevenLabs => "elevenlabs",
            Self::Espeak => "espeak",
        }
    }

    /// Whether the engine calls a remote API and therefore needs credentials.
    pub fn requires_credentials(self) -> bool {
        matches!(self, Self::Gemini | Self::ElevenLabs)
    }
}

impl fmt::Display for ProviderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable voice.
///
/// Immutable once loaded; looked up by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceModelDescriptor {
    /// Unique identifier clients send as `voice_model`.
    pub id: String,
    /// Human-readable name.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Short description shown in voice pickers.
    #[serde(default)]
    pub description: String,
    /// Engine that renders this voice.
    pub engine: ProviderEngine,
    /// Engine-specific parameters (e.g. `voice_id`).
    #[serde(default, rename = "params")]
    pub provider_params: BTreeMap<String, String>,
}

impl VoiceModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        engine: ProviderEngine,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
            engine,
            provider_params: BTreeMap::new(),
        }
    }

    /// Adds an engine parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.provider_params.insert(key.into(), value.into());
        self
    }

    /// Returns an engine parameter by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.provider_params.get(key).map(String::as_str)
    }
}

/// The voices available out of the box.
pub fn builtin_catalog() -> Vec<VoiceModelDescriptor> {
    vec![
        VoiceModelDescriptor::new(
            "gemini",
            "Gemini AI",
            "صوت ذكي وواضح من Google",
            ProviderEngine::Gemini,
        ),
        VoiceModelDescriptor::new(
            "elevenlabs_adam",
            "Adam - ElevenLabs",
            "صوت رجالي دافئ وودود",
            ProviderEngine::ElevenLabs,
        )
        .with_param(VOICE_ID_PARAM, "pNInz6obpgDQGcFmaJgB"),
        VoiceModelDescriptor::new(
            "elevenlabs_bella",
            "Bella - ElevenLabs",
            "صوت نسائي عذب ومفهوم",
            ProviderEngine::ElevenLabs,
        )
        .with_param(VOICE_ID_PARAM, "EXAVITQu4vr4xnSDxMaL"),
        VoiceModelDescriptor::new(
            "elevenlabs_charlie",
            "Charlie - ElevenLabs",
            "صوت شبابي حيوي ومرح",
            ProviderEngine::ElevenLabs,
        )
        .with_param(VOICE_ID_PARAM, "IKne3meq5aSn9XLyUdCD"),
    ]
}
