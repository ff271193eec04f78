//! Provider registry and the two-tier synthesis fallback policy.

use crate::config::ProvidersConfig;
use crate::encoder::AudioEncoder;
use crate::error::VoiceError;
use crate::tts::{
    ElevenLabsProvider, EspeakProvider, GeminiProvider, SpeechProvider, FALLBACK_PROVIDER_ID,
};
use rawi_types::{ProviderEngine, SynthesisOutcome, VoiceModelDescriptor, VOICE_ID_PARAM};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Builds the adapter for one catalog entry.
///
/// Fails when the entry's engine lacks credentials or parameters, so a
/// misconfigured voice stops startup instead of failing per request.
pub fn build_provider(
    voice: &VoiceModelDescriptor,
    providers: &ProvidersConfig,
    encoder: Arc<AudioEncoder>,
) -> Result<Arc<dyn SpeechProvider>, VoiceError> {
    let provider: Arc<dyn SpeechProvider> = match voice.engine {
        ProviderEngine::Gemini => Arc::new(GeminiProvider::new(
            &voice.id,
            providers.gemini.clone(),
            encoder,
        )?),
        ProviderEngine::ElevenLabs => Arc::new(ElevenLabsProvider::new(
            &voice.id,
            voice.param(VOICE_ID_PARAM).unwrap_or_default(),
            providers.elevenlabs.clone(),
        )?),
        ProviderEngine::Espeak => Arc::new(EspeakProvider::new(
            &voice.id,
            &providers.espeak,
            encoder,
        )),
    };
    Ok(provider)
}

/// Drives synthesis across registered providers.
///
/// Each run makes exactly one attempt with the resolved provider and, if that
/// fails, exactly one attempt with the fallback provider.
pub struct SynthesisOrchestrator {
    voices: Vec<VoiceModelDescriptor>,
    providers: HashMap<String, Arc<dyn SpeechProvider>>,
    default_id: String,
    fallback: Arc<dyn SpeechProvider>,
}

impl SynthesisOrchestrator {
    /// Creates an orchestrator from a voice catalog and one adapter per voice.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Config` if the catalog is empty, the default id is
    /// not in the catalog, or a catalog entry has no adapter.
    pub fn new(
        voices: Vec<VoiceModelDescriptor>,
        providers: HashMap<String, Arc<dyn SpeechProvider>>,
        default_id: impl Into<String>,
        fallback: Arc<dyn SpeechProvider>,
    ) -> Result<Self, VoiceError> {
        let default_id = default_id.into();
        if voices.is_empty() {
            return Err(VoiceError::Config("voice catalog is empty".to_string()));
        }
        if !voices.iter().any(|v| v.id == default_id) {
            return Err(VoiceError::Config(format!(
                "default voice '{}' is not in the catalog",
                default_id
            )));
        }
        if let Some(missing) = voices.iter().find(|v| !providers.contains_key(&v.id)) {
            return Err(VoiceError::Config(format!(
                "voice '{}' has no provider",
                missing.id
            )));
        }

        Ok(Self {
            voices,
            providers,
            default_id,
            fallback,
        })
    }

    /// Builds every adapter from configuration, with eSpeak as the fallback.
    pub fn from_config(
        voices: Vec<VoiceModelDescriptor>,
        default_id: impl Into<String>,
        providers: &ProvidersConfig,
        encoder: Arc<AudioEncoder>,
    ) -> Result<Self, VoiceError> {
        let mut registry = HashMap::with_capacity(voices.len());
        for voice in &voices {
            let provider = build_provider(voice, providers, encoder.clone())?;
            registry.insert(voice.id.clone(), provider);
        }
        let fallback: Arc<dyn SpeechProvider> = Arc::new(EspeakProvider::new(
            FALLBACK_PROVIDER_ID,
            &providers.espeak,
            encoder,
        ));

        Self::new(voices, registry, default_id, fallback)
    }

    /// The voice catalog in configuration order.
    pub fn voices(&self) -> &[VoiceModelDescriptor] {
        &self.voices
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn fallback_id(&self) -> &str {
        self.fallback.id()
    }

    pub fn voice(&self, id: &str) -> Option<&VoiceModelDescriptor> {
        self.voices.iter().find(|v| v.id == id)
    }

    /// Maps a requested id to a catalog voice. Absent or unknown ids resolve
    /// to the default voice.
    pub fn resolve(&self, requested: Option<&str>) -> &VoiceModelDescriptor {
        requested
            .and_then(|id| self.voice(id))
            .or_else(|| self.voice(&self.default_id))
            .unwrap_or(&self.voices[0])
    }

    /// Synthesizes `text` with the requested voice, falling back once.
    pub async fn synthesize(&self, text: &str, requested: Option<&str>) -> SynthesisOutcome {
        let voice = self.resolve(requested);
        if requested.is_some_and(|id| id != voice.id) {
            tracing::warn!(
                requested = requested.unwrap_or_default(),
                resolved = %voice.id,
                "unknown voice model, using default"
            );
        }

        let primary = match self.providers.get(&voice.id) {
            Some(provider) => provider.clone(),
            None => self.fallback.clone(),
        };

        match attempt(primary.as_ref(), text).await {
            Ok(audio) => {
                return SynthesisOutcome {
                    succeeded: true,
                    requested_id: voice.id.clone(),
                    provider_id: primary.id().to_string(),
                    raw_audio: Some(audio),
                    fallback_used: false,
                };
            }
            Err(e) => {
                tracing::warn!(provider = primary.id(), error = %e, "primary synthesis failed, trying fallback");
            }
        }

        match attempt(self.fallback.as_ref(), text).await {
            Ok(audio) => SynthesisOutcome {
                succeeded: true,
                requested_id: voice.id.clone(),
                provider_id: self.fallback.id().to_string(),
                raw_audio: Some(audio),
                fallback_used: true,
            },
            Err(e) => {
                tracing::error!(provider = self.fallback.id(), error = %e, "fallback synthesis failed");
                SynthesisOutcome {
                    succeeded: false,
                    requested_id: voice.id.clone(),
                    provider_id: self.fallback.id().to_string(),
                    raw_audio: None,
                    fallback_used: true,
                }
            }
        }
    }
}

async fn attempt(provider: &dyn SpeechProvider, text: &str) -> Result<Vec<u8>, VoiceError> {
    let started = Instant::now();
    let audio = provider.synthesize(text).await?;
    if audio.is_empty() {
        return Err(VoiceError::Tts(format!(
            "provider '{}' returned an empty payload",
            provider.id()
        )));
    }
    tracing::debug!(
        provider = provider.id(),
        bytes = audio.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "synthesis attempt succeeded"
    );
    Ok(audio)
}
