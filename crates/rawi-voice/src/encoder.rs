//! Transcoding through an external `ffmpeg` process.

use crate::config::EncoderConfig;
use crate::error::VoiceError;
use crate::wav::{write_wav, PcmFormat, ScratchFile};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// MIME type of everything the encoder delivers.
pub const DELIVERABLE_MIME: &str = "audio/mpeg";

/// Converts uncompressed containers into the deliverable MP3 format and
/// normalizes uploads for the recognizer.
///
/// Every intermediate file is a [`ScratchFile`] under `scratch_dir`, removed
/// before the call returns whether or not the encode succeeded.
#[derive(Debug, Clone)]
pub struct AudioEncoder {
    ffmpeg_binary: PathBuf,
    scratch_dir: PathBuf,
    bitrate: String,
    timeout: Duration,
}

impl AudioEncoder {
    pub fn new(config: &EncoderConfig, scratch_dir: impl AsRef<Path>) -> Self {
        Self {
            ffmpeg_binary: config.ffmpeg_binary.clone(),
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
            bitrate: config.bitrate.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Wraps raw PCM in a WAV scratch file and transcodes it to MP3.
    pub async fn encode_pcm(&self, pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, VoiceError> {
        self.ensure_scratch_dir().await?;
        let wav = ScratchFile::new(&self.scratch_dir, "wav");
        let wav_path = wav.path().to_path_buf();
        let pcm = pcm.to_vec();

        tokio::task::spawn_blocking(move || write_wav(&wav_path, &pcm, format))
            .await
            .map_err(|e| VoiceError::Container(format!("WAV writer task failed: {}", e)))??;

        self.encode_file(wav).await
    }

    /// Transcodes an in-memory WAV (or any container ffmpeg reads) to MP3.
    pub async fn encode_container_bytes(&self, container: &[u8]) -> Result<Vec<u8>, VoiceError> {
        self.ensure_scratch_dir().await?;
        let input = ScratchFile::new(&self.scratch_dir, "wav");
        tokio::fs::write(input.path(), container)
            .await
            .map_err(|e| VoiceError::Encode(format!("Failed to write scratch input: {}", e)))?;

        self.encode_file(input).await
    }

    /// Converts an upload into 16 kHz mono 16-bit WAV for speech recognition.
    ///
    /// The returned scratch file is removed when the caller drops it.
    pub async fn to_recognizer_input(&self, input: &Path) -> Result<ScratchFile, VoiceError> {
        self.ensure_scratch_dir().await?;
        let output = ScratchFile::new(&self.scratch_dir, "wav");

        let mut command = Command::new(&self.ffmpeg_binary);
        command
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(input)
            .arg("-ar")
            .arg("16000")
            .arg("-ac")
            .arg("1")
            .arg("-c:a")
            .arg("pcm_s16le")
            .arg(output.path());

        self.run(command).await?;
        Ok(output)
    }

    /// Transcodes `input` to MP3 and returns the encoded bytes. Both the input
    /// and the encoder output are deleted before this returns.
    async fn encode_file(&self, input: ScratchFile) -> Result<Vec<u8>, VoiceError> {
        let output = ScratchFile::new(&self.scratch_dir, "mp3");

        let mut command = Command::new(&self.ffmpeg_binary);
        command
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(input.path())
            .arg("-b:a")
            .arg(&self.bitrate)
            .arg(output.path());

        self.run(command).await?;
        drop(input);

        let encoded = tokio::fs::read(output.path())
            .await
            .map_err(|e| VoiceError::Encode(format!("Failed to read encoder output: {}", e)))?;

        if encoded.is_empty() {
            return Err(VoiceError::Encode("encoder produced no output".to_string()));
        }

        Ok(encoded)
    }

    async fn run(&self, mut command: Command) -> Result<(), VoiceError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| VoiceError::Encode(format!("Failed to spawn ffmpeg: {}", e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Encode(format!(
                    "ffmpeg timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Encode(format!("Failed to wait for ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Encode(format!(
                "ffmpeg failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn ensure_scratch_dir(&self) -> Result<(), VoiceError> {
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| VoiceError::Encode(format!("Failed to create scratch dir: {}", e)))
    }
}
