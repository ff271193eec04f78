//! Outbound relay to the external dialogue webhook.

use crate::config::DialogueConfig;
use crate::error::VoiceError;
use rawi_types::DialogueReply;
use serde_json::Value;
use std::time::Duration;

/// The shapes a webhook reply is recognized as, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueResponse {
    /// `{ "output": "..." }`
    Output(String),
    /// `{ "response": "..." }`
    Response(String),
    /// `{ "message": "..." }`
    Message(String),
    /// An object with none of the known fields, rendered as JSON text.
    Raw(String),
}

impl DialogueResponse {
    /// Classifies a decoded webhook body.
    ///
    /// # Errors
    ///
    /// `VoiceError::Dialogue` if the body is not a JSON object.
    pub fn parse(body: &Value) -> Result<Self, VoiceError> {
        let object = body.as_object().ok_or_else(|| {
            VoiceError::Dialogue(format!("expected a JSON object, got: {}", body))
        })?;

        let field = |name: &str| object.get(name).and_then(reply_text);
        if let Some(text) = field("output") {
            return Ok(Self::Output(text));
        }
        if let Some(text) = field("response") {
            return Ok(Self::Response(text));
        }
        if let Some(text) = field("message") {
            return Ok(Self::Message(text));
        }
        Ok(Self::Raw(body.to_string()))
    }

    /// Name of the field the reply came from, or `raw`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Output(_) => "output",
            Self::Response(_) => "response",
            Self::Message(_) => "message",
            Self::Raw(_) => "raw",
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Output(text) | Self::Response(text) | Self::Message(text) | Self::Raw(text) => {
                text
            }
        }
    }
}

/// Text carried by a reply field, or `None` when the field counts as empty.
fn reply_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// Sends transcripts to the dialogue service and always yields a reply.
#[derive(Debug, Clone)]
pub struct DialogueRelay {
    client: reqwest::Client,
    webhook_url: String,
    fallback_reply: String,
}

impl DialogueRelay {
    /// # Errors
    ///
    /// `VoiceError::Config` if the webhook URL is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: &DialogueConfig) -> Result<Self, VoiceError> {
        if config.webhook_url.trim().is_empty() {
            return Err(VoiceError::Config(
                "dialogue webhook URL is not configured".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
            fallback_reply: config.fallback_reply.clone(),
        })
    }

    /// Returns the dialogue reply for `transcript`. Failures are absorbed and
    /// answered with the configured apology.
    pub async fn relay(&self, transcript: &str) -> DialogueReply {
        match self.exchange(transcript).await {
            Ok(response) => DialogueReply {
                text: response.into_text(),
                source_was_fallback_default: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "dialogue relay failed, using fallback reply");
                DialogueReply {
                    text: self.fallback_reply.clone(),
                    source_was_fallback_default: true,
                }
            }
        }
    }

    async fn exchange(&self, transcript: &str) -> Result<DialogueResponse, VoiceError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&serde_json::json!({ "text": transcript }))
            .send()
            .await
            .map_err(|e| VoiceError::Dialogue(format!("webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::Dialogue(format!("webhook returned {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VoiceError::Dialogue(format!("webhook reply is not JSON: {}", e)))?;

        let parsed = DialogueResponse::parse(&body)?;
        tracing::debug!(shape = parsed.kind(), "dialogue reply received");
        Ok(parsed)
    }
}
