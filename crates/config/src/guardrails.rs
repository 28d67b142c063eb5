//! Guardrail and detector configuration types.

use std::collections::HashMap;

use promptgate_common::Role;
use serde::{Deserialize, Serialize};

/// Name the prompt injection guardrail registers under by default
pub const DEFAULT_GUARDRAIL_NAME: &str = "prompt_injection";

/// Environment variable holding the detector API key by default
pub const DEFAULT_API_KEY_ENV: &str = "LAKERA_API_KEY";

/// Default detector call timeout
pub const DEFAULT_DETECTOR_TIMEOUT_MS: u64 = 5000;

/// Per-guardrail settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Guardrail name (e.g. "prompt_injection")
    pub name: String,
    /// Detector identifiers this guardrail is wired to
    #[serde(default)]
    pub callbacks: Vec<String>,
    /// Run for every request unless the request opts out
    #[serde(default)]
    pub default_on: bool,
    /// Roles sent to the detector. `None` (or an empty list) means all roles.
    #[serde(default)]
    pub enabled_roles: Option<Vec<Role>>,
}

impl GuardrailConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callbacks: Vec::new(),
            default_on: false,
            enabled_roles: None,
        }
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callbacks.push(callback.into());
        self
    }

    pub fn with_default_on(mut self, default_on: bool) -> Self {
        self.default_on = default_on;
        self
    }

    pub fn with_enabled_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.enabled_roles = Some(roles.into_iter().collect());
        self
    }

    /// Role filter to apply, or `None` when every role is inspected
    pub fn role_filter(&self) -> Option<&[Role]> {
        match self.enabled_roles.as_deref() {
            Some([]) | None => None,
            Some(roles) => Some(roles),
        }
    }

    /// Whether turns of `role` are sent to the detector
    pub fn is_role_enabled(&self, role: &Role) -> bool {
        self.role_filter().is_none_or(|roles| roles.contains(role))
    }

    /// Whether the guardrail runs, given an optional per-request toggle.
    ///
    /// An explicit request toggle always wins over `default_on`.
    pub fn should_run(&self, request_toggle: Option<bool>) -> bool {
        request_toggle.unwrap_or(self.default_on)
    }
}

/// Guardrail name to settings, immutable once loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailConfigMap {
    guardrails: HashMap<String, GuardrailConfig>,
}

impl GuardrailConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, config: GuardrailConfig) -> Option<GuardrailConfig> {
        self.guardrails.insert(config.name.clone(), config)
    }

    pub fn get(&self, name: &str) -> Option<&GuardrailConfig> {
        self.guardrails.get(name)
    }

    pub fn len(&self) -> usize {
        self.guardrails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guardrails.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GuardrailConfig> {
        self.guardrails.values()
    }
}

impl FromIterator<GuardrailConfig> for GuardrailConfigMap {
    fn from_iter<I: IntoIterator<Item = GuardrailConfig>>(iter: I) -> Self {
        let mut map = Self::new();
        for config in iter {
            map.insert(config);
        }
        map
    }
}

/// Behavior when the detector cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Let the request through and log the failure
    Open,
    /// Reject the request
    #[default]
    Closed,
}

/// External detector endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Detector identifier, matched against guardrail callbacks
    pub id: String,
    pub api_base: String,
    pub endpoint: String,
    /// Inline API key. Prefer `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable the API key is read from
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub failure_mode: FailureMode,
    /// HTTP status returned to the caller when a request is blocked
    pub block_status: u16,
}

impl DetectorConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            api_base: "https://api.lakera.ai".to_string(),
            endpoint: "/v1/prompt_injection".to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_ms: DEFAULT_DETECTOR_TIMEOUT_MS,
            failure_mode: FailureMode::default(),
            block_status: 400,
        }
    }

    /// API key from the config, falling back to the configured environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Gateway-wide settings that change how the guardrail reads requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// The gateway already folds function definitions and arguments into the
    /// prompt, so tool-call arguments are not appended again.
    #[serde(default)]
    pub add_function_to_prompt: bool,
}
