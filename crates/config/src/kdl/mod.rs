//! KDL configuration parsing.
//!
//! ```kdl
//! detector "lakera_prompt_injection" {
//!     api-base "https://api.lakera.ai"
//!     timeout-ms 5000
//!     failure-mode "closed"
//! }
//! guardrails {
//!     guardrail "prompt_injection" {
//!         callbacks "lakera_prompt_injection"
//!         default-on #true
//!         enabled-roles "system" "user"
//!     }
//! }
//! settings {
//!     add-function-to-prompt #false
//! }
//! ```

mod detectors;
mod guardrails;
mod helpers;

use std::collections::BTreeMap;

use anyhow::Result;
use kdl::KdlDocument;
use tracing::{debug, trace};

use crate::guardrails::{GatewaySettings, GuardrailConfigMap};
use crate::Config;

pub use detectors::parse_detector;
pub use guardrails::parse_guardrails;

use helpers::get_bool_entry;

/// Parse a full configuration document
pub fn parse_config(content: &str) -> Result<Config> {
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid KDL configuration: {}", e))?;

    let mut detectors = BTreeMap::new();
    let mut guardrails: Option<GuardrailConfigMap> = None;
    let mut settings = GatewaySettings::default();

    for node in doc.nodes() {
        match node.name().value() {
            "detector" => {
                let detector = parse_detector(node)?;
                let id = detector.id.clone();
                if detectors.insert(id.clone(), detector).is_some() {
                    return Err(anyhow::anyhow!("Detector '{}' is defined more than once", id));
                }
            }
            "guardrails" => {
                if guardrails.is_some() {
                    return Err(anyhow::anyhow!("Only one guardrails block is allowed"));
                }
                guardrails = Some(parse_guardrails(node)?);
            }
            "settings" => {
                settings = parse_settings(node);
            }
            other => {
                return Err(anyhow::anyhow!(
                    "Unknown top-level node '{}', expected detector, guardrails or settings",
                    other
                ));
            }
        }
    }

    let config = Config {
        detectors,
        guardrails: guardrails.unwrap_or_default(),
        settings,
    };

    debug!(
        detector_count = config.detectors.len(),
        guardrail_count = config.guardrails.len(),
        add_function_to_prompt = config.settings.add_function_to_prompt,
        "Parsed KDL configuration"
    );

    Ok(config)
}

fn parse_settings(node: &kdl::KdlNode) -> GatewaySettings {
    trace!("Parsing settings block");
    GatewaySettings {
        add_function_to_prompt: get_bool_entry(node, "add-function-to-prompt").unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrails::FailureMode;
    use promptgate_common::Role;

    const FULL: &str = r#"
detector "lakera_prompt_injection" {
    api-base "http://localhost:9999"
    endpoint "/v2/guard"
    api-key-env "MY_DETECTOR_KEY"
    timeout-ms 1500
    failure-mode "open"
    block-status 403
}
guardrails {
    guardrail "prompt_injection" {
        callbacks "lakera_prompt_injection" "prompt_injection_api_2"
        default-on #true
        enabled-roles "system" "user"
    }
    guardrail "all_roles" {
        callbacks "lakera_prompt_injection"
    }
}
settings {
    add-function-to-prompt #true
}
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(FULL).unwrap();

        let detector = &config.detectors["lakera_prompt_injection"];
        assert_eq!(detector.api_base, "http://localhost:9999");
        assert_eq!(detector.endpoint, "/v2/guard");
        assert_eq!(detector.api_key_env, "MY_DETECTOR_KEY");
        assert_eq!(detector.timeout_ms, 1500);
        assert_eq!(detector.failure_mode, FailureMode::Open);
        assert_eq!(detector.block_status, 403);

        let guardrail = config.guardrails.get("prompt_injection").unwrap();
        assert_eq!(
            guardrail.callbacks,
            vec!["lakera_prompt_injection", "prompt_injection_api_2"]
        );
        assert!(guardrail.default_on);
        assert_eq!(guardrail.enabled_roles, Some(vec![Role::System, Role::User]));

        let all_roles = config.guardrails.get("all_roles").unwrap();
        assert!(!all_roles.default_on);
        assert_eq!(all_roles.enabled_roles, None);

        assert!(config.settings.add_function_to_prompt);
    }

    #[test]
    fn test_detector_defaults() {
        let config = parse_config(r#"detector "lakera" {}"#).unwrap();
        let detector = &config.detectors["lakera"];
        assert_eq!(detector.api_base, "https://api.lakera.ai");
        assert_eq!(detector.endpoint, "/v1/prompt_injection");
        assert_eq!(detector.api_key_env, "LAKERA_API_KEY");
        assert_eq!(detector.timeout_ms, 5000);
        assert_eq!(detector.failure_mode, FailureMode::Closed);
        assert!(config.guardrails.is_empty());
    }

    #[test]
    fn test_rejects_unknown_failure_mode() {
        let err = parse_config(r#"detector "d" { failure-mode "sometimes" }"#).unwrap_err();
        assert!(err.to_string().contains("unknown failure-mode"));
    }

    #[test]
    fn test_rejects_duplicate_guardrail() {
        let err = parse_config(
            r#"
guardrails {
    guardrail "prompt_injection" {}
    guardrail "prompt_injection" {}
}
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rejects_guardrail_without_name() {
        let err = parse_config("guardrails { guardrail {} }").unwrap_err();
        assert!(err.to_string().contains("requires a name"));
    }

    #[test]
    fn test_rejects_unknown_top_level_node() {
        let err = parse_config(r#"listener "http" {}"#).unwrap_err();
        assert!(err.to_string().contains("Unknown top-level node"));
    }

    #[test]
    fn test_rejects_invalid_kdl() {
        assert!(parse_config("detector \"unterminated {").is_err());
    }
}
