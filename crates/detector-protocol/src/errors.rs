//! Detector protocol errors.

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// Errors raised while talking to an external detector.
///
/// Every variant is a transport or protocol failure. A flagged verdict is
/// never an error at this layer.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Connection to detector failed: {0}")]
    ConnectionFailed(String),

    #[error("Detector call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Detector returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid detector response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode detector request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Detector client misconfigured: {0}")]
    Configuration(String),
}

impl DetectorError {
    /// Whether the failure was a timeout (as opposed to any other transport error)
    pub fn is_timeout(&self) -> bool {
        matches!(self, DetectorError::Timeout(_))
    }
}
