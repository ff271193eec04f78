//! Per-request sequencing of the voice-reply pipeline.

use crate::artifact::ArtifactStore;
use crate::dialogue::DialogueRelay;
use crate::encoder::DELIVERABLE_MIME;
use crate::error::VoiceError;
use crate::orchestrator::SynthesisOrchestrator;
use crate::stt::TranscriptionGateway;
use rawi_types::{AudioArtifact, DialogueReply, SynthesisOutcome, TranscriptRecord};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Components shared by every request. Built once at startup.
pub struct PipelineContext {
    pub transcriber: TranscriptionGateway,
    pub relay: DialogueRelay,
    pub synthesizer: SynthesisOrchestrator,
    pub artifacts: Arc<ArtifactStore>,
}

/// Outcome of the synthesis and publish stages.
#[derive(Debug, Clone)]
pub struct SpeechReport {
    pub audio_ready: bool,
    /// Resolved voice id; unknown requested ids report the default.
    pub voice_model_used: String,
    pub voice_model_name: String,
    /// Provider that produced the published audio.
    pub audio_provider: Option<String>,
    pub fallback_used: bool,
    pub artifact: Option<AudioArtifact>,
}

/// Outcome of a full transcribe → relay → synthesize → publish run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub transcript: TranscriptRecord,
    pub reply: DialogueReply,
    pub speech: SpeechReport,
    pub processing_time: Duration,
}

pub struct PipelineCoordinator {
    context: Arc<PipelineContext>,
}

impl PipelineCoordinator {
    pub fn new(context: Arc<PipelineContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Runs one request end to end.
    ///
    /// Only a transcription failure ends the run early. Dialogue failures are
    /// answered with the fallback reply, and synthesis failures surface as
    /// `audio_ready: false`.
    ///
    /// # Errors
    ///
    /// `VoiceError::Stt` when transcription fails.
    pub async fn run(
        &self,
        audio: &[u8],
        format_hint: Option<&str>,
        voice_model: Option<&str>,
    ) -> Result<PipelineReport, VoiceError> {
        let started = Instant::now();
        let ctx = &self.context;
        let _run = ctx.artifacts.begin_run().await;

        if let Err(e) = ctx.artifacts.reset().await {
            tracing::warn!(error = %e, "failed to reset artifacts before run");
        }

        let transcript = ctx.transcriber.transcribe(audio, format_hint).await?;
        tracing::info!(
            chars = transcript.text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transcription complete"
        );

        let reply = ctx.relay.relay(&transcript.text).await;
        tracing::info!(
            fallback = reply.source_was_fallback_default,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dialogue reply ready"
        );

        let speech = self.synthesize_and_publish(&reply.text, voice_model).await;

        let processing_time = started.elapsed();
        tracing::info!(
            audio_ready = speech.audio_ready,
            voice_model = %speech.voice_model_used,
            provider = speech.audio_provider.as_deref().unwrap_or("none"),
            elapsed_ms = processing_time.as_millis() as u64,
            "pipeline run complete"
        );

        Ok(PipelineReport {
            transcript,
            reply,
            speech,
            processing_time,
        })
    }

    /// Synthesizes fixed text with a voice, skipping transcription and dialogue.
    ///
    /// # Errors
    ///
    /// `VoiceError::UnknownVoiceModel` if `voice_model` is not in the catalog.
    pub async fn speak(&self, text: &str, voice_model: &str) -> Result<SpeechReport, VoiceError> {
        if self.context.synthesizer.voice(voice_model).is_none() {
            return Err(VoiceError::UnknownVoiceModel(voice_model.to_string()));
        }

        let _run = self.context.artifacts.begin_run().await;
        if let Err(e) = self.context.artifacts.reset().await {
            tracing::warn!(error = %e, "failed to reset artifacts before voice test");
        }

        Ok(self.synthesize_and_publish(text, Some(voice_model)).await)
    }

    async fn synthesize_and_publish(&self, text: &str, voice_model: Option<&str>) -> SpeechReport {
        let ctx = &self.context;
        let outcome = ctx.synthesizer.synthesize(text, voice_model).await;
        let voice_model_name = ctx
            .synthesizer
            .voice(&outcome.requested_id)
            .map(|v| v.display_name.clone())
            .unwrap_or_default();

        let SynthesisOutcome {
            succeeded,
            requested_id,
            provider_id,
            raw_audio,
            fallback_used,
        } = outcome;

        let artifact = match raw_audio {
            Some(audio) if succeeded => match ctx.artifacts.publish(&audio, DELIVERABLE_MIME).await
            {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    tracing::error!(error = %e, "failed to publish synthesized audio");
                    None
                }
            },
            _ => None,
        };

        SpeechReport {
            audio_ready: artifact.is_some(),
            voice_model_used: requested_id,
            voice_model_name,
            audio_provider: artifact.as_ref().map(|_| provider_id),
            fallback_used: artifact.is_some() && fallback_used,
            artifact,
        }
    }
}
