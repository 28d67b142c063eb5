//! Guardrail KDL parsing.

use anyhow::Result;
use promptgate_common::Role;
use tracing::trace;

use crate::guardrails::{GuardrailConfig, GuardrailConfigMap};

use super::helpers::{get_arg_strings, get_bool_entry, get_child, get_first_arg_string};

/// Parse guardrails configuration block
pub fn parse_guardrails(node: &kdl::KdlNode) -> Result<GuardrailConfigMap> {
    trace!("Parsing guardrails configuration block");
    let mut guardrails = GuardrailConfigMap::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() != "guardrail" {
                return Err(anyhow::anyhow!(
                    "Unknown node '{}' in guardrails block, expected guardrail \"name\" {{ ... }}",
                    child.name().value()
                ));
            }

            let name = get_first_arg_string(child).ok_or_else(|| {
                anyhow::anyhow!(
                    "Guardrail requires a name argument, e.g., guardrail \"prompt_injection\" {{ ... }}"
                )
            })?;

            let callbacks = get_child(child, "callbacks")
                .map(get_arg_strings)
                .unwrap_or_default();

            let default_on = get_bool_entry(child, "default-on").unwrap_or(false);

            let enabled_roles = get_child(child, "enabled-roles").map(|n| {
                get_arg_strings(n)
                    .into_iter()
                    .map(Role::from)
                    .collect::<Vec<_>>()
            });

            trace!(
                guardrail = %name,
                callbacks = ?callbacks,
                default_on = default_on,
                enabled_roles = ?enabled_roles,
                "Parsed guardrail"
            );

            let config = GuardrailConfig {
                name: name.clone(),
                callbacks,
                default_on,
                enabled_roles,
            };

            if guardrails.insert(config).is_some() {
                return Err(anyhow::anyhow!("Guardrail '{}' is defined more than once", name));
            }
        }
    }

    trace!(guardrail_count = guardrails.len(), "Finished parsing guardrails");
    Ok(guardrails)
}
