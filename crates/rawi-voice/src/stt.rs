use crate::config::SttConfig;
use crate::encoder::AudioEncoder;
use crate::error::VoiceError;
use async_trait::async_trait;
use rawi_types::TranscriptRecord;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Maximum audio input size for STT (25 MiB). Prevents OOM from oversized payloads.
pub const MAX_STT_INPUT_BYTES: usize = 25 * 1024 * 1024;

/// A speech recognizer returning text segments in emission order.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    async fn recognize(&self, audio_path: &Path) -> Result<Vec<String>, VoiceError>;
}

/// whisper.cpp invoked as a subprocess.
///
/// Uploads are normalized to 16 kHz mono WAV first, since whisper.cpp only
/// reads WAV. With `-nt` each stdout line is one segment.
#[derive(Debug, Clone)]
pub struct WhisperEngine {
    binary_path: PathBuf,
    model_path: PathBuf,
    language: String,
    timeout: Duration,
    encoder: Arc<AudioEncoder>,
}

impl WhisperEngine {
    pub fn new(config: &SttConfig, encoder: Arc<AudioEncoder>) -> Self {
        Self {
            binary_path: config.binary.clone(),
            model_path: config.model_path.clone(),
            language: config.language.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            encoder,
        }
    }
}

#[async_trait]
impl RecognitionEngine for WhisperEngine {
    async fn recognize(&self, audio_path: &Path) -> Result<Vec<String>, VoiceError> {
        let wav = self
            .encoder
            .to_recognizer_input(audio_path)
            .await
            .map_err(|e| VoiceError::Stt(format!("Failed to decode upload: {}", e)))?;

        let mut command = Command::new(&self.binary_path);
        command
            .arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(wav.path())
            .arg("-nt")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| VoiceError::Stt(format!("Failed to spawn STT binary: {}", e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Stt(format!(
                    "STT process timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Stt(format!("Failed to read stdout: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Stt(format!("STT binary failed: {}", stderr.trim())));
        }

        let segments = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        Ok(segments)
    }
}

/// Turns uploaded audio into one transcript.
pub struct TranscriptionGateway {
    engine: Arc<dyn RecognitionEngine>,
    scratch_dir: PathBuf,
}

impl TranscriptionGateway {
    pub fn new(engine: Arc<dyn RecognitionEngine>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Transcribes `audio`. `format_hint` is the upload's file extension
    /// (e.g. `webm`) and only names the scratch copy the engine reads.
    ///
    /// Segments are trimmed and joined with single spaces.
    ///
    /// # Errors
    ///
    /// `VoiceError::Stt` if the audio is empty or oversized, the engine fails,
    /// or it recognizes no segments.
    pub async fn transcribe(
        &self,
        audio: &[u8],
        format_hint: Option<&str>,
    ) -> Result<TranscriptRecord, VoiceError> {
        if audio.is_empty() {
            return Err(VoiceError::Stt("audio data is empty".to_string()));
        }
        if audio.len() > MAX_STT_INPUT_BYTES {
            return Err(VoiceError::Stt(format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                audio.len(),
                MAX_STT_INPUT_BYTES
            )));
        }

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| VoiceError::Stt(format!("Failed to create scratch dir: {}", e)))?;

        let suffix = format!(".{}", sanitize_extension(format_hint));
        let upload = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| VoiceError::Stt(format!("Failed to create upload file: {}", e)))?;
        tokio::fs::write(upload.path(), audio)
            .await
            .map_err(|e| VoiceError::Stt(format!("Failed to store upload: {}", e)))?;

        let segments = self.engine.recognize(upload.path()).await?;
        if segments.is_empty() {
            return Err(VoiceError::Stt("recognizer returned no segments".to_string()));
        }

        Ok(TranscriptRecord {
            text: join_segments(&segments),
        })
    }
}

/// Trims each segment and joins the non-empty ones with a single space.
pub fn join_segments(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn sanitize_extension(hint: Option<&str>) -> String {
    let ext: String = hint
        .unwrap_or_default()
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() {
        "webm".to_string()
    } else {
        ext
    }
}
