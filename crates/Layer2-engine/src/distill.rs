//! Distillation - attach caller-supplied summaries to pruned messages
//!
//! A distillation only stores the summary and the back-links. It does not
//! prune by itself; callers pair it with a prune pass that carries the
//! distillation ID as the reason tag.

use crate::prune::find_message;
use dcp_foundation::{DistillationRecord, Message, SessionState};
use tracing::debug;

/// Create the next distillation record for the given source messages.
///
/// IDs are sequential (`distill-1`, `distill-2`, ...) and never reused.
/// Source IDs are canonicalized to the stored message ID where the message
/// exists; unknown IDs are kept as given - validation happens at the
/// operation layer, where unresolved references are reported.
pub fn create_distillation(
    messages: &[Message],
    state: &mut SessionState,
    message_ids: &[String],
    summary: &str,
) -> DistillationRecord {
    let sources: Vec<String> = message_ids
        .iter()
        .map(|id| {
            find_message(messages, id)
                .map(|m| m.id.clone())
                .unwrap_or_else(|| id.clone())
        })
        .collect();

    let id = state.prune.next_distillation_id();
    let record = DistillationRecord::new(id, sources, summary);
    debug!(id = %record.id, sources = record.source_message_ids.len(), "distillation created");
    state.prune.add_distillation(record.clone());
    record
}
