//! Shared types for the Rawi voice-reply service.
//!
//! Holds the per-request records passed between pipeline stages and the
//! voice catalog definitions. Every other crate in the workspace depends on
//! this one for cross-cutting types.

pub mod voice;

pub use voice::{
    builtin_catalog, ProviderEngine, VoiceModelDescriptor, DEFAULT_VOICE_MODEL, VOICE_ID_PARAM,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Recognized text for one request. Not persisted beyond the request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub text: String,
}

/// Reply obtained from the dialogue service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueReply {
    pub text: String,
    /// `true` when the dialogue call failed and `text` is the fixed apology.
    pub source_was_fallback_default: bool,
}

/// The result of one synthesis run across the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutcome {
    pub succeeded: bool,
    /// Voice id the run was resolved to (after unknown ids degrade to the default).
    pub requested_id: String,
    /// Provider that produced `raw_audio`; the last provider tried on failure.
    pub provider_id: String,
    /// Deliverable audio bytes, present only on success.
    pub raw_audio: Option<Vec<u8>>,
    /// Set when the fallback tier was attempted, whether or not it succeeded.
    pub fallback_used: bool,
}

/// The single current synthesized-audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioArtifact {
    /// Per-request identifier the file is keyed by.
    pub id: String,
    pub path: PathBuf,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}
