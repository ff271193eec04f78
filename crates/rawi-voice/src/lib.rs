//! Voice-reply pipeline for the Rawi service.
//!
//! Turns an uploaded utterance into a spoken reply: speech is transcribed
//! (`stt`), the transcript is relayed to an external dialogue webhook
//! (`dialogue`), and the reply is synthesized by one of several
//! interchangeable providers (`tts`) under a two-tier fallback policy
//! (`orchestrator`). Providers that return raw PCM go through a WAV container
//! (`wav`) and an external encoder (`encoder`). The resulting MP3 becomes the
//! single current artifact (`artifact`).
//!
//! [`PipelineCoordinator`] sequences these stages for one request over a
//! [`PipelineContext`] built once at startup.

pub mod artifact;
pub mod config;
pub mod dialogue;
pub mod encoder;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod stt;
pub mod tts;
pub mod wav;

pub use artifact::ArtifactStore;
pub use config::{
    ArtifactConfig, DialogueConfig, ElevenLabsConfig, EncoderConfig, EspeakConfig, GeminiConfig,
    ProvidersConfig, SttConfig, DEFAULT_FALLBACK_REPLY,
};
pub use dialogue::{DialogueRelay, DialogueResponse};
pub use encoder::{AudioEncoder, DELIVERABLE_MIME};
pub use error::VoiceError;
pub use orchestrator::SynthesisOrchestrator;
pub use pipeline::{PipelineContext, PipelineCoordinator, PipelineReport, SpeechReport};
pub use stt::{RecognitionEngine, TranscriptionGateway, WhisperEngine};
pub use tts::{
    ElevenLabsProvider, EspeakProvider, GeminiProvider, SpeechProvider, FALLBACK_PROVIDER_ID,
};
pub use wav::PcmFormat;
