//! Detector KDL parsing.

use anyhow::Result;
use tracing::trace;

use crate::guardrails::{DetectorConfig, FailureMode};

use super::helpers::{get_first_arg_string, get_int_entry, get_string_entry};

/// Parse a `detector "id" { ... }` node
pub fn parse_detector(node: &kdl::KdlNode) -> Result<DetectorConfig> {
    let id = get_first_arg_string(node).ok_or_else(|| {
        anyhow::anyhow!(
            "Detector requires an ID argument, e.g., detector \"lakera_prompt_injection\" {{ ... }}"
        )
    })?;

    trace!(detector = %id, "Parsing detector");

    let mut config = DetectorConfig::new(id.clone());

    if let Some(api_base) = get_string_entry(node, "api-base") {
        config.api_base = api_base;
    }
    if let Some(endpoint) = get_string_entry(node, "endpoint") {
        config.endpoint = endpoint;
    }
    if let Some(api_key) = get_string_entry(node, "api-key") {
        config.api_key = Some(api_key);
    }
    if let Some(api_key_env) = get_string_entry(node, "api-key-env") {
        config.api_key_env = api_key_env;
    }
    if let Some(timeout_ms) = get_int_entry(node, "timeout-ms") {
        config.timeout_ms = u64::try_from(timeout_ms).map_err(|_| {
            anyhow::anyhow!("Detector '{}' has an invalid timeout-ms: {}", id, timeout_ms)
        })?;
    }
    if let Some(mode) = get_string_entry(node, "failure-mode") {
        config.failure_mode = parse_failure_mode(&mode).ok_or_else(|| {
            anyhow::anyhow!(
                "Detector '{}' has unknown failure-mode '{}', expected \"open\" or \"closed\"",
                id,
                mode
            )
        })?;
    }
    if let Some(status) = get_int_entry(node, "block-status") {
        config.block_status = u16::try_from(status).map_err(|_| {
            anyhow::anyhow!("Detector '{}' has an invalid block-status: {}", id, status)
        })?;
    }

    trace!(
        detector = %id,
        api_base = %config.api_base,
        endpoint = %config.endpoint,
        timeout_ms = config.timeout_ms,
        failure_mode = ?config.failure_mode,
        "Parsed detector"
    );

    Ok(config)
}

/// Parse failure mode from string
fn parse_failure_mode(s: &str) -> Option<FailureMode> {
    match s.to_lowercase().as_str() {
        "open" | "fail-open" | "fail_open" => Some(FailureMode::Open),
        "closed" | "fail-closed" | "fail_closed" => Some(FailureMode::Closed),
        _ => None,
    }
}
