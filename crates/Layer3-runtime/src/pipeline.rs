//! Request rewrite pipeline
//!
//! Runs on every outgoing provider request: caches tool-call metadata,
//! tracks newly seen tool results, injects the periodic nudge, and
//! swaps pruned outputs for their placeholder text. The body is
//! re-serialized only when something actually changed.

use crate::registry::SessionRegistry;
use dcp_adapter::{crossed_nudge_boundary, RequestBody, NUDGE_TEXT};
use dcp_foundation::{PruneConfig, SessionState};
use std::sync::Arc;
use tracing::{debug, warn};

/// What `process` did to a request body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Processed {
    /// The body was rewritten and re-serialized.
    pub changed: bool,
    /// Tool outputs replaced with placeholder text.
    pub replaced: usize,
    /// A nudge was appended this pass.
    pub nudged: bool,
}

/// Per-request entry point of the pruning layer.
pub struct RequestPipeline {
    registry: Arc<SessionRegistry>,
    config: PruneConfig,
}

impl RequestPipeline {
    pub fn new(registry: Arc<SessionRegistry>, config: PruneConfig) -> Self {
        Self { registry, config }
    }

    /// Rewrite `body` in place against the session's prune state.
    ///
    /// Unrecognized or malformed bodies pass through untouched, as does
    /// everything when pruning is disabled.
    pub async fn process(&self, session_id: &str, body: &mut serde_json::Value) -> Processed {
        if !self.config.enabled {
            return Processed::default();
        }
        let Some(mut parsed) = RequestBody::parse(body) else {
            return Processed::default();
        };

        let processed = self
            .registry
            .with_state(session_id, |state| {
                rewrite(&mut parsed, state, &self.config)
            })
            .await;

        if processed.changed {
            match parsed.to_value() {
                Ok(value) => *body = value,
                Err(err) => {
                    warn!(session_id, error = %err, "failed to re-serialize rewritten body");
                    return Processed::default();
                }
            }
        }
        processed
    }
}

fn rewrite(body: &mut RequestBody, state: &mut SessionState, config: &PruneConfig) -> Processed {
    let adapter = body.adapter_mut();

    adapter.cache_tool_parameters(state);

    let seen_before = state.tracker.count();
    adapter.track_new_tool_results(state, config);
    let seen_after = state.tracker.count();

    let mut nudged = false;
    if crossed_nudge_boundary(seen_before, seen_after, config.nudge_frequency) {
        nudged = adapter.inject_synth(None, Some(NUDGE_TEXT));
    }

    let mut replaced = 0;
    for output in adapter.extract_tool_outputs(state) {
        let Some(placeholder) = placeholder_for(state, &output.id) else {
            continue;
        };
        if adapter.replace_tool_output(&output.id, &placeholder) {
            replaced += 1;
        }
    }

    if replaced > 0 || nudged {
        debug!(
            new_results = seen_after - seen_before,
            replaced,
            nudged,
            metadata = %adapter.log_metadata(),
            "request body rewritten"
        );
    }

    Processed {
        changed: replaced > 0 || nudged,
        replaced,
        nudged,
    }
}

/// Placeholder text for a tool output that session state records as
/// pruned, or `None` when it was never pruned.
fn placeholder_for(state: &SessionState, tool_id: &str) -> Option<String> {
    let recorded = state
        .prune
        .pruned_ids()
        .iter()
        .find(|id| id.eq_ignore_ascii_case(tool_id))?;
    let record = state.prune.record(recorded)?;
    Some(record.placeholder(recorded))
}
