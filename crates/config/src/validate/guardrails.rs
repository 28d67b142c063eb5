//! Guardrail validation

use promptgate_common::Role;

use super::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};
use crate::Config;

/// Validate guardrail entries against the configured detectors
pub fn validate_guardrails(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.guardrails.is_empty() {
        result.add_warning(ValidationWarning::new(
            "No guardrails configured; every request will fail the guardrail lookup",
        ));
    }

    for guardrail in config.guardrails.iter() {
        if guardrail.name.trim().is_empty() {
            result.add_error(ValidationError::new(
                ErrorCategory::Guardrail,
                "Guardrail name must not be empty",
            ));
        }

        if guardrail.callbacks.is_empty() {
            result.add_warning(ValidationWarning::new(format!(
                "Guardrail '{}' has no callbacks",
                guardrail.name
            )));
        }

        for callback in &guardrail.callbacks {
            if !config.detectors.contains_key(callback) {
                result.add_warning(ValidationWarning::new(format!(
                    "Guardrail '{}' callback '{}' is not a configured detector",
                    guardrail.name, callback
                )));
            }
        }

        match guardrail.enabled_roles.as_deref() {
            Some([]) => result.add_warning(ValidationWarning::new(format!(
                "Guardrail '{}' has an empty enabled-roles list; all roles will be inspected",
                guardrail.name
            ))),
            Some(roles) => {
                for role in roles {
                    if let Role::Other(name) = role {
                        result.add_warning(ValidationWarning::new(format!(
                            "Guardrail '{}' enables unknown role '{}'",
                            guardrail.name, name
                        )));
                    }
                }
            }
            None => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrails::{DetectorConfig, GuardrailConfig};

    fn base_config() -> Config {
        let mut config = Config::default();
        config.detectors.insert(
            "lakera_prompt_injection".to_string(),
            DetectorConfig::new("lakera_prompt_injection"),
        );
        config
    }

    #[test]
    fn test_valid_guardrail() {
        let mut config = base_config();
        config.guardrails.insert(
            GuardrailConfig::new("prompt_injection")
                .with_callback("lakera_prompt_injection")
                .with_default_on(true)
                .with_enabled_roles([Role::System, Role::User]),
        );

        let result = validate_guardrails(&config);
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_guardrail_warnings() {
        let mut config = base_config();
        config.guardrails.insert(
            GuardrailConfig::new("prompt_injection")
                .with_callback("prompt_injection_api_2")
                .with_enabled_roles([Role::from("narrator")]),
        );
        config
            .guardrails
            .insert(GuardrailConfig::new("empty_roles").with_enabled_roles(Vec::new()));

        let result = validate_guardrails(&config);
        assert!(result.is_valid());

        let messages: Vec<&str> = result.warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages
            .iter()
            .any(|m| m.contains("'prompt_injection_api_2' is not a configured detector")));
        assert!(messages.iter().any(|m| m.contains("unknown role 'narrator'")));
        assert!(messages.iter().any(|m| m.contains("empty enabled-roles")));
        assert!(messages.iter().any(|m| m.contains("'empty_roles' has no callbacks")));
    }

    #[test]
    fn test_empty_name_is_error() {
        let mut config = base_config();
        config.guardrails.insert(GuardrailConfig::new(" "));

        let result = validate_guardrails(&config);
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].category, ErrorCategory::Guardrail);
    }

    #[test]
    fn test_no_guardrails_warns() {
        let result = validate_guardrails(&base_config());
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
    }
}
