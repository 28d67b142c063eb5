//! Detector protocol types and constants.
//!
//! This module defines the inbound conversation shape the guardrail reads and
//! the wire types exchanged with the external detector.

use std::collections::BTreeMap;

use promptgate_common::Role;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Default detector API base
pub const DEFAULT_API_BASE: &str = "https://api.lakera.ai";

/// Default prompt injection endpoint path
pub const DEFAULT_ENDPOINT: &str = "/v1/prompt_injection";

// ============================================================================
// Inbound conversation types
// ============================================================================

/// One chat message as received by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Role the message is attributed to
    pub role: Role,
    /// Message content; absent for assistant turns that only call tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    /// Tool calls attached to this message, in call order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ConversationTurn {
    /// Create a plain text turn
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
        }
    }

    /// Attach a tool call carrying the given function arguments
    pub fn with_tool_call(mut self, arguments: impl Into<String>) -> Self {
        self.tool_calls
            .get_or_insert_with(Vec::new)
            .push(ToolCall::function(arguments));
        self
    }

    /// Text content of the turn, empty when the turn has no content
    pub fn text(&self) -> String {
        self.content
            .as_ref()
            .map(MessageContent::text)
            .unwrap_or_default()
    }

    /// Tool calls of the turn, empty when there are none
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

impl From<DetectorMessage> for ConversationTurn {
    fn from(message: DetectorMessage) -> Self {
        ConversationTurn::new(message.role, message.content)
    }
}

/// Message content: plain text or an array of typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flatten the content to text. Non-text parts (images, audio) are skipped
    /// and text parts are joined with a single space.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One element of an array-valued message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A tool call attached to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCall>,
}

impl ToolCall {
    /// Function tool call with only arguments set
    pub fn function(arguments: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: None,
            function: Some(FunctionCall {
                name: None,
                arguments: arguments.into(),
            }),
        }
    }
}

/// Function invocation inside a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw argument text as produced by the model
    #[serde(default)]
    pub arguments: String,
}

// ============================================================================
// Detector wire types
// ============================================================================

/// One message as sent to the detector. Never carries tool calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorMessage {
    pub role: Role,
    pub content: String,
}

impl DetectorMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request body sent to the detector
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectorRequest {
    pub input: Vec<DetectorMessage>,
}

impl DetectorRequest {
    pub fn new(input: Vec<DetectorMessage>) -> Self {
        Self { input }
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }
}

/// Detector response.
///
/// Keeps the body exactly as the detector sent it, alongside a typed view of
/// the fields the guardrail interprets. Serializing a verdict yields the
/// original body, so it can be handed back to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct DetectorVerdict {
    view: VerdictView,
    raw: Value,
}

/// Fields of a verdict the guardrail reads. Everything else stays in `raw`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
struct VerdictView {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    results: Vec<DetectorResult>,
    /// Aggregate flag, reported by some detector API versions
    #[serde(default)]
    flagged: Option<bool>,
}

/// A single classification result
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DetectorResult {
    /// Category name to whether it fired
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
    /// Category name to confidence score (0.0 - 1.0)
    #[serde(default)]
    pub category_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub flagged: bool,
}

impl DetectorVerdict {
    /// Build a verdict from a detector response body.
    ///
    /// The body must be a JSON object; it is stored as is.
    pub fn from_raw(raw: Value) -> Result<Self, serde_json::Error> {
        if !raw.is_object() {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "detector verdict must be a JSON object",
            ));
        }
        let view = VerdictView::deserialize(&raw)?;
        Ok(Self { view, raw })
    }

    /// A verdict with one unflagged result
    pub fn clean() -> Self {
        Self {
            view: VerdictView {
                results: vec![DetectorResult::default()],
                ..Default::default()
            },
            raw: json!({"results": [{"categories": {}, "category_scores": {}, "flagged": false}]}),
        }
    }

    /// A verdict with one result flagged for `category`
    pub fn flagged_for(category: impl Into<String>, score: f64) -> Self {
        let category = category.into();
        let mut result = DetectorResult {
            flagged: true,
            ..Default::default()
        };
        result.categories.insert(category.clone(), true);
        result.category_scores.insert(category.clone(), score);

        let mut categories = Map::new();
        categories.insert(category.clone(), Value::Bool(true));
        let mut scores = Map::new();
        scores.insert(category, json!(score));

        Self {
            view: VerdictView {
                results: vec![result],
                ..Default::default()
            },
            raw: json!({"results": [{
                "categories": categories,
                "category_scores": scores,
                "flagged": true
            }]}),
        }
    }

    /// Model name reported by the detector
    pub fn model(&self) -> Option<&str> {
        self.view.model.as_deref()
    }

    /// Per-input classification results
    pub fn results(&self) -> &[DetectorResult] {
        &self.view.results
    }

    /// Whether the detector considers the input unsafe
    pub fn is_flagged(&self) -> bool {
        self.view.flagged.unwrap_or(false) || self.view.results.iter().any(|r| r.flagged)
    }

    /// Names of all categories that fired, across results, without duplicates
    pub fn flagged_categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self
            .view
            .results
            .iter()
            .flat_map(|r| r.categories.iter())
            .filter(|(_, fired)| **fired)
            .map(|(name, _)| name.as_str())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    /// The body as the detector sent it
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The body as the detector sent it, for diagnostics handed back to callers
    pub fn to_value(&self) -> Value {
        self.raw.clone()
    }
}

impl Default for DetectorVerdict {
    fn default() -> Self {
        Self {
            view: VerdictView::default(),
            raw: Value::Object(Map::new()),
        }
    }
}

impl TryFrom<Value> for DetectorVerdict {
    type Error = serde_json::Error;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl From<DetectorVerdict> for Value {
    fn from(verdict: DetectorVerdict) -> Self {
        verdict.raw
    }
}
