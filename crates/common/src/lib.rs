//! Common utilities and shared components for promptgate
//!
//! This crate provides functionality shared by the configuration, detector
//! protocol and guardrail crates: conversation roles, correlation IDs and
//! tracing initialisation.

pub mod observability;
pub mod types;

// Re-export commonly used items at the crate root
pub use observability::{init_tracing, LogFormat};

// Re-export common types
pub use types::{CorrelationId, OrderGroup, Role};
