//! Uncompressed audio container writing and scratch-file handling.
//!
//! Raw linear PCM returned by some providers is wrapped in a WAV container
//! before it is handed to the encoder. The WAV lives in a [`ScratchFile`],
//! which removes itself when dropped so an intermediate file never outlives
//! the synthesis attempt that created it.

use crate::error::VoiceError;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Layout of raw linear PCM sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    /// Bytes per sample (1 to 4).
    pub sample_width: u16,
    pub sample_rate: u32,
}

impl Default for PcmFormat {
    /// Mono, 16-bit signed, 24 kHz.
    fn default() -> Self {
        Self {
            channels: 1,
            sample_width: 2,
            sample_rate: 24_000,
        }
    }
}

impl PcmFormat {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Bytes in one frame (one sample for every channel).
    pub fn frame_width(&self) -> usize {
        usize::from(self.channels) * usize::from(self.sample_width)
    }
}

/// A uniquely named file in a scratch directory, deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserves a fresh path `<dir>/<uuid>.<extension>`. Nothing is created on disk.
    pub fn new(dir: impl AsRef<Path>, extension: &str) -> Self {
        let name = format!("{}.{}", Uuid::new_v4(), extension);
        Self {
            path: dir.as_ref().join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), "failed to remove scratch file: {}", e);
            }
        }
    }
}

/// Writes `pcm` (little-endian, interleaved) to `path` as a WAV file with
/// explicit channel count, sample width and frame rate headers.
pub fn write_wav(path: &Path, pcm: &[u8], format: PcmFormat) -> Result<(), VoiceError> {
    if format.channels == 0 || format.sample_rate == 0 {
        return Err(VoiceError::Container(format!(
            "invalid PCM format: {} channels at {} Hz",
            format.channels, format.sample_rate
        )));
    }
    if !(1..=4).contains(&format.sample_width) {
        return Err(VoiceError::Container(format!(
            "unsupported sample width: {} bytes",
            format.sample_width
        )));
    }
    if pcm.is_empty() {
        return Err(VoiceError::Container("PCM payload is empty".to_string()));
    }
    if pcm.len() % format.frame_width() != 0 {
        return Err(VoiceError::Container(format!(
            "PCM length {} is not a multiple of the frame width {}",
            pcm.len(),
            format.frame_width()
        )));
    }

    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: format.sample_width * 8,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| VoiceError::Container(format!("WAV create error: {}", e)))?;

    let width = usize::from(format.sample_width);
    for sample in pcm.chunks_exact(width) {
        let written = match width {
            // 8-bit WAV is unsigned on disk; hound expects signed input.
            1 => writer.write_sample((i16::from(sample[0]) - 128) as i8),
            2 => writer.write_sample(i16::from_le_bytes([sample[0], sample[1]])),
            3 => {
                let value = i32::from_le_bytes([0, sample[0], sample[1], sample[2]]) >> 8;
                writer.write_sample(value)
            }
            _ => writer.write_sample(i32::from_le_bytes([
                sample[0], sample[1], sample[2], sample[3],
            ])),
        };
        written.map_err(|e| VoiceError::Container(format!("WAV sample write error: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| VoiceError::Container(format!("WAV finalize error: {}", e)))?;

    Ok(())
}
