//! Transformed view - non-destructive projection of a message sequence
//!
//! Pruned messages are replaced with placeholders in a fresh Vec; the
//! backing messages are never touched. The view is what gets sent out,
//! the originals are what stays stored.

use dcp_foundation::{char_count, estimate_tokens, Message, MessagePart, SessionState, ViewMapEntry};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Size comparison between the raw sequence and its transformed view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSavings {
    pub raw_chars: usize,
    pub view_chars: usize,
    pub saved_chars: usize,
    pub saved_est_tokens: usize,
}

impl ViewSavings {
    pub fn savings_percent(&self) -> f64 {
        if self.raw_chars == 0 {
            0.0
        } else {
            (self.saved_chars as f64 / self.raw_chars as f64) * 100.0
        }
    }
}

/// Project the message sequence through the recorded prune decisions.
///
/// Unpruned messages are cloned unchanged. Pruned messages keep their
/// identity but have their parts collapsed to the placeholder text, the
/// call input dropped, and structured prune facts attached under
/// `meta["dcpPruned"]`. The only state touched is the diagnostic ID map.
pub fn transformed_view(messages: &[Message], state: &mut SessionState) -> Vec<Message> {
    let mut view = Vec::with_capacity(messages.len());
    state.view_map.clear();

    for message in messages {
        match state.prune.record(&message.id) {
            Some(record) => {
                let placeholder = record.placeholder(&message.id);
                let mut pruned = message.clone();
                pruned.parts = vec![MessagePart::Text {
                    text: placeholder,
                }];
                pruned.input = None;
                pruned.meta.insert(
                    "dcpPruned".to_string(),
                    json!({
                        "id": message.id,
                        "reason": record.reason,
                        "distillationId": record.distillation_id,
                    }),
                );
                state.view_map.insert(
                    message.id.clone(),
                    ViewMapEntry {
                        transformed_id: message.id.clone(),
                        pruned: true,
                    },
                );
                view.push(pruned);
            }
            None => {
                state.view_map.insert(
                    message.id.clone(),
                    ViewMapEntry {
                        transformed_id: message.id.clone(),
                        pruned: false,
                    },
                );
                view.push(message.clone());
            }
        }
    }

    debug!(
        total = view.len(),
        pruned = state.view_map.values().filter(|e| e.pruned).count(),
        "transformed view built"
    );
    view
}

/// Compare serialized sizes of the raw sequence and a view of it.
pub fn view_savings(messages: &[Message], view: &[Message]) -> ViewSavings {
    let raw_chars = serialized_chars(messages);
    let view_chars = serialized_chars(view);
    let saved_chars = raw_chars.saturating_sub(view_chars);
    ViewSavings {
        raw_chars,
        view_chars,
        saved_chars,
        saved_est_tokens: estimate_tokens(saved_chars),
    }
}

fn serialized_chars(messages: &[Message]) -> usize {
    serde_json::to_string(messages)
        .map(|s| char_count(&s))
        .unwrap_or(0)
}
