//! Turn normalization.
//!
//! Tool-call argument text is folded into the content of the turn that made
//! the calls, so the detector sees what the model was asked to execute. The
//! raw `tool_calls` never reach the detector payload.

use promptgate_detector_protocol::{ConversationTurn, DetectorMessage};

/// Literal placed between a turn's content and its function arguments
pub const FUNCTION_INPUT_SEPARATOR: &str = " Function Input: ";

/// Derive the detector message for one turn.
///
/// With `include_function_input` set and at least one function tool call, the
/// content becomes `content + " Function Input: " + args.join(" ")` in call
/// order. Otherwise the content passes through unchanged.
pub fn normalize_turn(turn: &ConversationTurn, include_function_input: bool) -> DetectorMessage {
    let mut content = turn.text();

    if include_function_input {
        let arguments: Vec<&str> = turn
            .tool_calls()
            .iter()
            .filter_map(|call| call.function.as_ref())
            .map(|function| function.arguments.as_str())
            .collect();

        if !arguments.is_empty() {
            content.push_str(FUNCTION_INPUT_SEPARATOR);
            content.push_str(&arguments.join(" "));
        }
    }

    DetectorMessage::new(turn.role.clone(), content)
}

/// Normalize every turn, preserving order
pub fn normalize_turns<'a>(
    turns: impl IntoIterator<Item = &'a ConversationTurn>,
    include_function_input: bool,
) -> Vec<DetectorMessage> {
    turns
        .into_iter()
        .map(|turn| normalize_turn(turn, include_function_input))
        .collect()
}
