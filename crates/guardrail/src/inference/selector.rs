//! Role-based turn selection.

use promptgate_config::GuardrailConfig;
use promptgate_detector_protocol::ConversationTurn;

/// Turns whose role the guardrail inspects, in conversation order.
pub fn select_turns<'a>(
    turns: &'a [ConversationTurn],
    config: &GuardrailConfig,
) -> Vec<&'a ConversationTurn> {
    turns
        .iter()
        .filter(|turn| config.is_role_enabled(&turn.role))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgate_common::Role;
    use proptest::prelude::*;

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::System),
            Just(Role::User),
            Just(Role::Assistant),
            Just(Role::Tool),
            Just(Role::Other("critic".to_string())),
        ]
    }

    #[test]
    fn test_disabled_roles_dropped() {
        let turns = vec![
            ConversationTurn::new(Role::Assistant, "This should be ignored."),
            ConversationTurn::new(Role::User, "corgi sploot"),
            ConversationTurn::new(Role::System, "Initial content."),
        ];
        let config = GuardrailConfig::new("prompt_injection")
            .with_enabled_roles([Role::User, Role::System]);

        let selected = select_turns(&turns, &config);
        assert_eq!(selected, vec![&turns[1], &turns[2]]);
    }

    #[test]
    fn test_no_filter_keeps_everything() {
        let turns = vec![
            ConversationTurn::new(Role::Assistant, "a"),
            ConversationTurn::new(Role::Tool, "t"),
        ];
        let config = GuardrailConfig::new("prompt_injection");
        assert_eq!(select_turns(&turns, &config).len(), 2);
    }

    proptest! {
        #[test]
        fn selection_is_filtered_subsequence(
            roles in proptest::collection::vec(role_strategy(), 0..24),
            enabled in proptest::collection::vec(role_strategy(), 1..4),
        ) {
            let turns: Vec<ConversationTurn> = roles
                .iter()
                .enumerate()
                .map(|(i, role)| ConversationTurn::new(role.clone(), format!("turn {}", i)))
                .collect();
            let config = GuardrailConfig::new("g").with_enabled_roles(enabled.clone());

            let selected = select_turns(&turns, &config);
            let expected: Vec<&ConversationTurn> =
                turns.iter().filter(|t| enabled.contains(&t.role)).collect();
            prop_assert_eq!(selected, expected);
        }
    }
}
