//! Inbound request model.
//!
//! The guardrail reads the chat `messages` and the optional per-request
//! guardrail toggles from a completion body. Everything else in the body is
//! left to the gateway.

use std::collections::HashMap;
use std::fmt;

use promptgate_common::CorrelationId;
use promptgate_detector_protocol::ConversationTurn;
use serde_json::Value;

use crate::error::GuardrailError;

/// Gateway call type tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallType {
    Completion,
    Acompletion,
    TextCompletion,
    Embeddings,
    ImageGeneration,
    Moderation,
    AudioTranscription,
    Other(String),
}

impl CallType {
    /// Whether requests of this type carry chat messages worth inspecting
    pub fn is_chat(&self) -> bool {
        matches!(
            self,
            CallType::Completion | CallType::Acompletion | CallType::TextCompletion
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            CallType::Completion => "completion",
            CallType::Acompletion => "acompletion",
            CallType::TextCompletion => "text_completion",
            CallType::Embeddings => "embeddings",
            CallType::ImageGeneration => "image_generation",
            CallType::Moderation => "moderation",
            CallType::AudioTranscription => "audio_transcription",
            CallType::Other(tag) => tag,
        }
    }
}

impl From<&str> for CallType {
    fn from(tag: &str) -> Self {
        match tag {
            "completion" => CallType::Completion,
            "acompletion" => CallType::Acompletion,
            "text_completion" => CallType::TextCompletion,
            "embeddings" | "aembeddings" => CallType::Embeddings,
            "image_generation" => CallType::ImageGeneration,
            "moderation" => CallType::Moderation,
            "audio_transcription" => CallType::AudioTranscription,
            other => CallType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller identity resolved by the gateway. Passed through, only used in logs.
#[derive(Clone, Default)]
pub struct AuthContext {
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub team_id: Option<String>,
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("team_id", &self.team_id)
            .finish()
    }
}

/// Per-invocation context supplied by the gateway
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub call_type: CallType,
    pub auth: Option<AuthContext>,
    pub correlation_id: CorrelationId,
}

impl RequestContext {
    pub fn new(call_type: CallType) -> Self {
        Self {
            call_type,
            auth: None,
            correlation_id: CorrelationId::new(),
        }
    }

    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub(crate) fn user_id(&self) -> Option<&str> {
        self.auth.as_ref().and_then(|a| a.user_id.as_deref())
    }
}

/// Chat request as seen by the guardrail
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundRequest {
    /// Conversation turns in the order received
    pub messages: Vec<ConversationTurn>,
    /// Explicit per-request guardrail switches from `metadata.guardrails`
    pub guardrail_toggles: HashMap<String, bool>,
}

impl InboundRequest {
    pub fn new(messages: Vec<ConversationTurn>) -> Self {
        Self {
            messages,
            guardrail_toggles: HashMap::new(),
        }
    }

    pub fn with_guardrail_toggle(mut self, guardrail: impl Into<String>, enabled: bool) -> Self {
        self.guardrail_toggles.insert(guardrail.into(), enabled);
        self
    }

    /// Explicit toggle for `guardrail`, if the request carries one
    pub fn guardrail_toggle(&self, guardrail: &str) -> Option<bool> {
        self.guardrail_toggles.get(guardrail).copied()
    }

    /// Parse a raw completion body.
    ///
    /// A body without `messages` yields an empty request. A `messages` value
    /// that is not an array, or a message that does not parse (for instance
    /// one without a `role`), is rejected.
    pub fn from_json(body: &Value) -> Result<Self, GuardrailError> {
        let object = body.as_object().ok_or_else(|| {
            GuardrailError::InvalidRequest("request body must be a JSON object".to_string())
        })?;

        let messages = match object.get("messages") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    serde_json::from_value::<ConversationTurn>(item.clone()).map_err(|e| {
                        GuardrailError::InvalidRequest(format!("messages[{}]: {}", index, e))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(GuardrailError::InvalidRequest(
                    "messages must be an array".to_string(),
                ))
            }
        };

        let guardrail_toggles = object
            .get("metadata")
            .and_then(|m| m.get("guardrails"))
            .map(parse_guardrail_toggles)
            .unwrap_or_default();

        Ok(Self {
            messages,
            guardrail_toggles,
        })
    }

    /// Parse a raw completion body from bytes
    pub fn from_slice(body: &[u8]) -> Result<Self, GuardrailError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| GuardrailError::InvalidRequest(format!("body is not valid JSON: {}", e)))?;
        Self::from_json(&value)
    }
}

/// `{"name": bool}` toggles each guardrail; `["name", ...]` turns the listed ones on.
fn parse_guardrail_toggles(value: &Value) -> HashMap<String, bool> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(name, enabled)| enabled.as_bool().map(|b| (name.clone(), b)))
            .collect(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .map(|name| (name.to_string(), true))
            .collect(),
        _ => HashMap::new(),
    }
}
