//! Detector protocol for promptgate
//!
//! This crate defines the wire protocol spoken between the guardrail and an
//! external prompt-injection / content-safety detector, and the client used
//! to reach it.
//!
//! # Architecture
//!
//! - [`ConversationTurn`]: one inbound chat message as the gateway received it
//! - [`DetectorRequest`]: the `{"input": [...]}` body sent to the detector
//! - [`DetectorVerdict`]: the detector's response, flagged or not, with diagnostics
//! - [`DetectorClient`]: narrow capability trait (submit turns, receive verdict)
//! - [`HttpDetectorClient`]: reqwest implementation for Lakera-style HTTP endpoints
//!
//! # Wire format
//!
//! Requests are JSON over HTTPS with bearer authentication:
//!
//! ```text
//! POST /v1/prompt_injection
//! {"input": [{"role": "system", "content": "..."}, {"role": "user", "content": "..."}]}
//! ```

mod client;
mod errors;
mod protocol;

// Re-export error types
pub use errors::DetectorError;

// Re-export client types
pub use client::{endpoint_url, DetectorClient, HttpDetectorClient};

// Re-export protocol types
pub use protocol::{
    ContentPart, ConversationTurn, DetectorMessage, DetectorRequest, DetectorResult,
    DetectorVerdict, FunctionCall, MessageContent, ToolCall, DEFAULT_API_BASE, DEFAULT_ENDPOINT,
};

pub use promptgate_common::Role;
