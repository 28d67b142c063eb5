//! Configuration for the promptgate guardrail
//!
//! Configuration is read once at startup from a KDL file, adjusted by
//! environment overrides, validated, and then handed to the guardrail as an
//! immutable value. Nothing here is consulted through global state at request
//! time.

pub mod guardrails;
pub mod kdl;
pub mod validate;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use guardrails::{
    DetectorConfig, FailureMode, GatewaySettings, GuardrailConfig, GuardrailConfigMap,
    DEFAULT_API_KEY_ENV, DEFAULT_DETECTOR_TIMEOUT_MS, DEFAULT_GUARDRAIL_NAME,
};
pub use validate::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};

/// Environment variable overriding every detector's API base
pub const ENV_DETECTOR_API_BASE: &str = "PROMPTGATE_DETECTOR_API_BASE";

/// Environment variable overriding every detector's timeout
pub const ENV_DETECTOR_TIMEOUT_MS: &str = "PROMPTGATE_DETECTOR_TIMEOUT_MS";

/// Complete guardrail configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Detectors by ID
    pub detectors: BTreeMap<String, DetectorConfig>,
    /// Guardrails by name
    pub guardrails: GuardrailConfigMap,
    /// Gateway-wide settings
    pub settings: GatewaySettings,
}

impl Config {
    /// Parse configuration from KDL text
    pub fn from_kdl(content: &str) -> Result<Self> {
        kdl::parse_config(content)
    }

    /// Load configuration from a KDL file and apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        let mut config = Self::from_kdl(&content)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply `PROMPTGATE_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        let api_base = std::env::var(ENV_DETECTOR_API_BASE).ok();
        let timeout_ms = std::env::var(ENV_DETECTOR_TIMEOUT_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok());
        self.apply_overrides(api_base, timeout_ms);
    }

    fn apply_overrides(&mut self, api_base: Option<String>, timeout_ms: Option<u64>) {
        for detector in self.detectors.values_mut() {
            if let Some(ref base) = api_base {
                debug!(detector = %detector.id, api_base = %base, "Overriding detector api-base");
                detector.api_base = base.clone();
            }
            if let Some(timeout) = timeout_ms {
                debug!(
                    detector = %detector.id,
                    timeout_ms = timeout,
                    "Overriding detector timeout"
                );
                detector.timeout_ms = timeout;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        validate::validate(self)
    }

    /// First configured detector among the guardrail's callbacks
    pub fn detector_for(&self, guardrail: &str) -> Option<&DetectorConfig> {
        self.guardrails
            .get(guardrail)?
            .callbacks
            .iter()
            .find_map(|callback| self.detectors.get(callback))
    }
}
