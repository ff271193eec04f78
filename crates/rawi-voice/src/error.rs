use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Audio container error: {0}")]
    Container(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Dialogue relay error: {0}")]
    Dialogue(String),

    #[error("Artifact storage error: {0}")]
    Storage(String),

    #[error("Audio artifact not found")]
    ArtifactNotFound,

    #[error("Voice model not found: {0}")]
    UnknownVoiceModel(String),
}
