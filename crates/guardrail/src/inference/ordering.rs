//! Canonical detector ordering.

use promptgate_detector_protocol::DetectorMessage;

/// Reorder messages as system, then user, then everything else.
///
/// The sort is stable, so each group keeps its conversation order. Group
/// membership comes from [`promptgate_common::Role::order_group`].
pub fn canonical_order(mut messages: Vec<DetectorMessage>) -> Vec<DetectorMessage> {
    messages.sort_by_key(|message| message.role.order_group());
    messages
}
