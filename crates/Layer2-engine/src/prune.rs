//! Prune engine - record which messages are dropped from the working view
//!
//! Pruning never mutates messages. It records decisions into the session
//! state; the transformed view and the wire adapters apply them later.

use crate::extract::content_chars;
use crate::matcher::resolve_anchor;
use crate::protection::is_protected;
use dcp_foundation::{Message, PruneConfig, PrunedRecord, Result, SessionState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Result of a prune-by-ids request.
///
/// Missing and protected IDs are reported, not raised: a request may
/// partially succeed. Already-pruned IDs are silently skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneOutcome {
    pub pruned_ids: Vec<String>,
    pub protected_ids: Vec<String>,
    pub missing_ids: Vec<String>,
}

impl PruneOutcome {
    /// Total characters recorded as pruned by this call.
    pub fn chars_pruned(&self, state: &SessionState) -> usize {
        self.pruned_ids
            .iter()
            .filter_map(|id| state.prune.record(id))
            .map(|r| r.chars)
            .sum()
    }
}

/// Result of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    pub pruned_ids: Vec<String>,
    /// Eligible candidates before the limit was applied
    pub candidate_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_limit: Option<usize>,
}

/// Prune the given message IDs, classifying each as pruned, protected,
/// or missing. Statistics are updated for newly pruned messages only.
pub fn prune_by_ids(
    messages: &[Message],
    state: &mut SessionState,
    config: &PruneConfig,
    ids: &[String],
    reason: &str,
    distillation_id: Option<&str>,
) -> PruneOutcome {
    let mut outcome = PruneOutcome::default();

    for id in ids {
        let Some(message) = find_message(messages, id) else {
            outcome.missing_ids.push(id.clone());
            continue;
        };
        if state.prune.is_pruned(&message.id) {
            // idempotent: repeat prune is a no-op, not an error
            continue;
        }
        if is_protected(message, config) {
            outcome.protected_ids.push(message.id.clone());
            continue;
        }

        let chars = content_chars(message);
        let tool_name = message.effective_tool_name().map(str::to_string);
        let mut record = PrunedRecord::new(reason, tool_name, chars);
        let linked = distillation_id
            .map(str::to_string)
            .or_else(|| state.prune.distillation_for(&message.id).map(str::to_string));
        if let Some(linked) = linked {
            record = record.with_distillation(linked);
        }

        debug!(id = %message.id, chars, reason, "pruned message");
        state.stats.record_prune(chars);
        state.prune.insert(message.id.clone(), record);
        outcome.pruned_ids.push(message.id.clone());
    }

    if !outcome.pruned_ids.is_empty() {
        info!(
            pruned = outcome.pruned_ids.len(),
            protected = outcome.protected_ids.len(),
            missing = outcome.missing_ids.len(),
            reason,
            "prune request applied"
        );
    }
    outcome
}

/// Bulk-prune tool outputs that arrived after the last user turn.
///
/// With a limit, only the last `limit` candidates are pruned - the most
/// recent noise goes first and earlier candidates stay for a later sweep.
/// The sweep counter advances only when something was actually pruned.
pub fn sweep(
    messages: &[Message],
    state: &mut SessionState,
    config: &PruneConfig,
    limit: Option<usize>,
) -> SweepOutcome {
    let start = messages
        .iter()
        .rposition(|m| m.is_user())
        .map(|i| i + 1)
        .unwrap_or(0);
    sweep_range(messages, state, config, start, limit)
}

/// Bulk-prune tool outputs at or after a text-resolved anchor message.
///
/// The anchor replaces the last-user boundary: the caller named an explicit
/// starting point, so everything eligible from there on is in range.
/// Resolver failures (ambiguous, not found) surface unchanged.
pub fn sweep_from(
    messages: &[Message],
    state: &mut SessionState,
    config: &PruneConfig,
    query: &str,
    limit: Option<usize>,
) -> Result<SweepOutcome> {
    let anchor = resolve_anchor(messages, query, config)?;
    debug!(index = anchor.index, "sweeping from anchor");
    Ok(sweep_range(messages, state, config, anchor.index, limit))
}

fn sweep_range(
    messages: &[Message],
    state: &mut SessionState,
    config: &PruneConfig,
    start: usize,
    limit: Option<usize>,
) -> SweepOutcome {
    let candidates: Vec<&Message> = messages
        .iter()
        .skip(start)
        .filter(|m| m.is_tool_like())
        .filter(|m| !state.prune.is_pruned(&m.id))
        .filter(|m| !is_protected(m, config))
        .collect();
    let candidate_count = candidates.len();

    let selected: &[&Message] = match limit {
        Some(n) if n < candidates.len() => &candidates[candidates.len() - n..],
        _ => &candidates,
    };

    let ids: Vec<String> = selected.iter().map(|m| m.id.clone()).collect();
    let outcome = prune_by_ids(messages, state, config, &ids, "sweep", None);

    if !outcome.pruned_ids.is_empty() {
        state.stats.record_sweep();
    }

    SweepOutcome {
        pruned_ids: outcome.pruned_ids,
        candidate_count,
        used_limit: limit,
    }
}

/// Find a message by ID; falls back to a case-insensitive scan because
/// wire call IDs are lower-cased at some boundaries.
pub fn find_message<'a>(messages: &'a [Message], id: &str) -> Option<&'a Message> {
    messages
        .iter()
        .find(|m| m.id == id)
        .or_else(|| messages.iter().find(|m| m.id.eq_ignore_ascii_case(id)))
}
