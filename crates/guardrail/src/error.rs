//! Errors surfaced to the gateway by the guardrail.

use http::StatusCode;
use promptgate_detector_protocol::{DetectorError, DetectorVerdict};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Message returned to callers whose request was blocked
pub const VIOLATION_MESSAGE: &str = "Violated content safety policy";

/// Detail key under which the raw detector verdict is returned
pub const DETECTOR_RESPONSE_KEY: &str = "lakera_ai_response";

/// The detector flagged the request content.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ViolationError {
    /// Human readable policy violation text
    pub message: String,
    /// Raw verdict, kept for auditing
    pub detector_response: DetectorVerdict,
    /// Status returned to the caller
    pub status: StatusCode,
}

impl ViolationError {
    pub fn new(detector_response: DetectorVerdict, status: StatusCode) -> Self {
        Self {
            message: VIOLATION_MESSAGE.to_string(),
            detector_response,
            status,
        }
    }

    /// Detail payload for the rejection response
    pub fn detail(&self) -> Value {
        let mut detail = Map::new();
        detail.insert("error".to_string(), Value::String(self.message.clone()));
        detail.insert(
            DETECTOR_RESPONSE_KEY.to_string(),
            self.detector_response.raw().clone(),
        );
        Value::Object(detail)
    }
}

/// Guardrail invocation errors
#[derive(Error, Debug)]
pub enum GuardrailError {
    /// The guardrail has no usable configuration entry
    #[error("Guardrail '{guardrail}' misconfigured: {reason}")]
    Configuration { guardrail: String, reason: String },

    /// The inbound request body could not be read
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The detector could not produce a verdict
    #[error("Detector '{detector}' unavailable: {source}")]
    Infrastructure {
        detector: String,
        #[source]
        source: DetectorError,
    },

    /// The detector flagged the content
    #[error(transparent)]
    Violation(#[from] ViolationError),
}

impl GuardrailError {
    /// HTTP status the gateway should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            GuardrailError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GuardrailError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GuardrailError::Infrastructure { source, .. } if source.is_timeout() => {
                StatusCode::GATEWAY_TIMEOUT
            }
            GuardrailError::Infrastructure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GuardrailError::Violation(violation) => violation.status,
        }
    }

    /// JSON detail payload for the rejection response
    pub fn detail(&self) -> Value {
        match self {
            GuardrailError::Violation(violation) => violation.detail(),
            other => json!({ "error": other.to_string() }),
        }
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, GuardrailError::Violation(_))
    }
}
