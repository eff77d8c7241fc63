//! Prune and distill operations
//!
//! The operation surface exposed to the model as tools. Both operations
//! resolve caller IDs against the inventory numerals first and fall back
//! to raw message IDs; unresolvable references and protected targets are
//! reported in the result, never raised.

use crate::registry::SessionRegistry;
use dcp_engine::{
    create_distillation, find_message, is_protected, prunable_inventory, prune_by_ids,
    resolve_inventory_ids, sweep, sweep_from, SweepOutcome,
};
use dcp_foundation::{
    estimate_tokens, Error, HostClient, Message, NotificationSink, PruneConfig, Result,
    SessionState,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

// ============================================================================
// Arguments
// ============================================================================

/// Arguments of the prune operation.
///
/// All fields are optional: `ids` wins over `query`, and an empty request
/// falls back to a sweep of everything after the last user turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneArgs {
    /// Inventory numerals ("1", "2", ...) or raw message IDs.
    #[serde(default)]
    pub ids: Vec<String>,

    /// Text anchor - sweeps from the message it resolves to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Reason tag recorded with each prune. Defaults to "manual".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One distill target: a message and its replacement summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistillTarget {
    /// Inventory numeral or raw message ID.
    pub id: String,

    /// Caller-supplied summary stored in place of the content.
    pub distillation: String,
}

/// Arguments of the distill operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistillArgs {
    #[serde(default)]
    pub targets: Vec<DistillTarget>,
}

// ============================================================================
// Reports
// ============================================================================

/// Outcome of a prune operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneReport {
    pub pruned_ids: Vec<String>,
    pub protected_ids: Vec<String>,
    pub missing_ids: Vec<String>,
    pub unresolved_inventory_ids: Vec<String>,
    pub chars_pruned: usize,
    pub est_tokens_saved: usize,
}

/// Outcome of a distill operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistillReport {
    pub distillation_ids: Vec<String>,
    pub pruned_ids: Vec<String>,
    pub protected_ids: Vec<String>,
    pub missing_ids: Vec<String>,
    pub unresolved_inventory_ids: Vec<String>,
    pub chars_pruned: usize,
    pub est_tokens_saved: usize,
}

// ============================================================================
// Prune
// ============================================================================

/// Run the prune operation against an already-fetched transcript.
pub fn run_prune(
    messages: &[Message],
    state: &mut SessionState,
    config: &PruneConfig,
    args: &PruneArgs,
) -> Result<PruneReport> {
    let reason = args.reason.as_deref().unwrap_or("manual");

    if !args.ids.is_empty() {
        return Ok(prune_listed(messages, state, config, &args.ids, reason));
    }

    if let Some(query) = args.query.as_deref() {
        let outcome = sweep_from(messages, state, config, query, config.default_sweep_limit)?;
        return Ok(sweep_report(&outcome, state));
    }

    let outcome = sweep(messages, state, config, config.default_sweep_limit);
    Ok(sweep_report(&outcome, state))
}

fn prune_listed(
    messages: &[Message],
    state: &mut SessionState,
    config: &PruneConfig,
    ids: &[String],
    reason: &str,
) -> PruneReport {
    // Numerals resolve against one inventory snapshot; anything the
    // inventory does not know is retried as a raw message ID.
    prunable_inventory(messages, state, config);
    let resolved = resolve_inventory_ids(state, ids);

    let mut targets = resolved.resolved_message_ids;
    targets.extend(resolved.missing_ids);

    let outcome = prune_by_ids(messages, state, config, &targets, reason, None);
    let chars = outcome.chars_pruned(state);

    let (unresolved_inventory_ids, missing_ids): (Vec<String>, Vec<String>) = outcome
        .missing_ids
        .into_iter()
        .partition(|id| looks_numeric(id));

    debug!(
        pruned = outcome.pruned_ids.len(),
        protected = outcome.protected_ids.len(),
        missing = missing_ids.len(),
        reason,
        "prune operation finished"
    );

    PruneReport {
        pruned_ids: outcome.pruned_ids,
        protected_ids: outcome.protected_ids,
        missing_ids,
        unresolved_inventory_ids,
        chars_pruned: chars,
        est_tokens_saved: estimate_tokens(chars),
    }
}

fn sweep_report(outcome: &SweepOutcome, state: &SessionState) -> PruneReport {
    let chars = chars_for(state, &outcome.pruned_ids);
    PruneReport {
        pruned_ids: outcome.pruned_ids.clone(),
        chars_pruned: chars,
        est_tokens_saved: estimate_tokens(chars),
        ..PruneReport::default()
    }
}

// ============================================================================
// Distill
// ============================================================================

/// Run the distill operation: store each target's summary, then prune the
/// source message with the distillation ID as its reason tag.
pub fn run_distill(
    messages: &[Message],
    state: &mut SessionState,
    config: &PruneConfig,
    args: &DistillArgs,
) -> Result<DistillReport> {
    if args.targets.is_empty() {
        return Err(Error::InvalidInput(
            "distill requires at least one target".into(),
        ));
    }

    let mut report = DistillReport::default();

    // All numerals resolve against the inventory as of the call start,
    // so earlier targets in the batch cannot renumber later ones.
    prunable_inventory(messages, state, config);

    for target in &args.targets {
        let lookup = [target.id.clone()];
        let resolved = resolve_inventory_ids(state, &lookup);
        let message_id = resolved
            .resolved_message_ids
            .into_iter()
            .next()
            .unwrap_or_else(|| target.id.clone());

        let Some(message) = find_message(messages, &message_id) else {
            if looks_numeric(&target.id) {
                report.unresolved_inventory_ids.push(target.id.clone());
            } else {
                report.missing_ids.push(target.id.clone());
            }
            continue;
        };
        let message_id = message.id.clone();

        if is_protected(message, config) {
            report.protected_ids.push(message_id);
            continue;
        }
        if state.prune.is_pruned(&message_id) {
            continue;
        }

        let sources = [message_id];
        let record = create_distillation(messages, state, &sources, &target.distillation);
        let outcome = prune_by_ids(messages, state, config, &sources, "distilled", Some(&record.id));
        report.chars_pruned += outcome.chars_pruned(state);
        report.pruned_ids.extend(outcome.pruned_ids);
        report.distillation_ids.push(record.id);
    }

    report.est_tokens_saved = estimate_tokens(report.chars_pruned);
    Ok(report)
}

// ============================================================================
// Session-level entry points
// ============================================================================

/// Fetch the session transcript, run the prune operation, persist the
/// state, and notify.
pub async fn prune_session(
    client: &dyn HostClient,
    registry: &SessionRegistry,
    sink: &dyn NotificationSink,
    config: &PruneConfig,
    session_id: &str,
    args: &PruneArgs,
) -> Result<PruneReport> {
    let messages = fetch_messages(client, session_id).await;
    let report = registry
        .with_state(session_id, |state| run_prune(&messages, state, config, args))
        .await?;
    registry.save(session_id).await;

    notify(sink, &prune_summary(&report), &report);
    Ok(report)
}

/// Fetch the session transcript, run the distill operation, persist the
/// state, and notify.
pub async fn distill_session(
    client: &dyn HostClient,
    registry: &SessionRegistry,
    sink: &dyn NotificationSink,
    config: &PruneConfig,
    session_id: &str,
    args: &DistillArgs,
) -> Result<DistillReport> {
    let messages = fetch_messages(client, session_id).await;
    let report = registry
        .with_state(session_id, |state| {
            run_distill(&messages, state, config, args)
        })
        .await?;
    registry.save(session_id).await;

    let text = format!(
        "distilled {} message(s) into {} summaries, ~{} tokens freed",
        report.pruned_ids.len(),
        report.distillation_ids.len(),
        report.est_tokens_saved
    );
    notify(sink, &text, &report);
    Ok(report)
}

fn prune_summary(report: &PruneReport) -> String {
    format!(
        "pruned {} message(s), ~{} tokens freed",
        report.pruned_ids.len(),
        report.est_tokens_saved
    )
}

fn notify<T: Serialize>(sink: &dyn NotificationSink, text: &str, report: &T) {
    let params = serde_json::to_value(report).unwrap_or(Value::Null);
    sink.notify(text, &params);
}

// ============================================================================
// Helpers
// ============================================================================

/// Best-effort transcript fetch. Transport failures degrade to an empty
/// transcript so operations still report instead of aborting.
pub(crate) async fn fetch_messages(client: &dyn HostClient, session_id: &str) -> Vec<Message> {
    match client.session_messages(session_id, None).await {
        Ok(messages) => messages,
        Err(err) => {
            warn!(session_id, error = %err, "message fetch failed, proceeding with empty transcript");
            Vec::new()
        }
    }
}

/// Inventory numerals are all-digit strings ("1", "42").
fn looks_numeric(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn chars_for(state: &SessionState, ids: &[String]) -> usize {
    ids.iter()
        .filter_map(|id| state.prune.record(id))
        .map(|r| r.chars)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<Message> {
        vec![
            Message::user("first question").with_id("u1"),
            Message::tool_output("t1", "grep", "early grep output"),
            Message::tool_output("t2", "bash", "early bash output"),
            Message::user("follow-up question").with_id("u2"),
            Message::tool_output("t3", "grep", "later grep output"),
            Message::tool_output("t4", "bash", "later bash output"),
            Message::tool_output("t5", "read", "later read output"),
        ]
    }

    #[test]
    fn test_prune_by_inventory_numeral() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig::default();

        // Inventory numbers prunable messages 1..=5 in document order,
        // so "1" is t1.
        let args = PruneArgs {
            ids: vec!["1".into()],
            ..Default::default()
        };
        let report = run_prune(&messages, &mut state, &config, &args).unwrap();

        assert_eq!(report.pruned_ids, vec!["t1"]);
        assert!(report.unresolved_inventory_ids.is_empty());
        assert!(report.chars_pruned > 0);
        assert!(state.prune.is_pruned("t1"));
    }

    #[test]
    fn test_prune_mixes_numerals_and_message_ids() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig::default();

        let args = PruneArgs {
            ids: vec!["2".into(), "t5".into(), "99".into(), "ghost".into()],
            ..Default::default()
        };
        let report = run_prune(&messages, &mut state, &config, &args).unwrap();

        assert_eq!(report.pruned_ids, vec!["t2", "t5"]);
        assert_eq!(report.unresolved_inventory_ids, vec!["99"]);
        assert_eq!(report.missing_ids, vec!["ghost"]);
    }

    #[test]
    fn test_prune_reason_defaults_to_manual() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig::default();

        let args = PruneArgs {
            ids: vec!["t1".into()],
            ..Default::default()
        };
        run_prune(&messages, &mut state, &config, &args).unwrap();
        assert_eq!(state.prune.record("t1").unwrap().reason, "manual");
    }

    #[test]
    fn test_empty_args_fall_back_to_sweep() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig::default();

        let report = run_prune(&messages, &mut state, &config, &PruneArgs::default()).unwrap();

        // Only the tail after the last user turn is swept.
        assert_eq!(report.pruned_ids, vec!["t3", "t4", "t5"]);
        assert!(!state.prune.is_pruned("t1"));
        assert_eq!(state.stats.sweeps, 1);
    }

    #[test]
    fn test_query_sweeps_from_anchor() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig::default();

        let args = PruneArgs {
            query: Some("first question".into()),
            ..Default::default()
        };
        let report = run_prune(&messages, &mut state, &config, &args).unwrap();

        // Anchored at u1, the sweep covers both tool clusters.
        assert_eq!(report.pruned_ids, vec!["t1", "t2", "t3", "t4", "t5"]);
    }

    #[test]
    fn test_query_miss_surfaces_not_found() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig::default();

        let args = PruneArgs {
            query: Some("nothing like this appears".into()),
            ..Default::default()
        };
        let err = run_prune(&messages, &mut state, &config, &args).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_distill_records_summary_and_prunes() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig::default();

        let args = DistillArgs {
            targets: vec![DistillTarget {
                id: "t1".into(),
                distillation: "grep found 3 hits in src/".into(),
            }],
        };
        let report = run_distill(&messages, &mut state, &config, &args).unwrap();

        assert_eq!(report.distillation_ids, vec!["distill-1"]);
        assert_eq!(report.pruned_ids, vec!["t1"]);
        assert_eq!(state.prune.record("t1").unwrap().reason, "distilled");
        assert_eq!(
            state.prune.record("t1").unwrap().distillation_id.as_deref(),
            Some("distill-1")
        );
        assert_eq!(
            state.prune.distillation("distill-1").unwrap().summary,
            "grep found 3 hits in src/"
        );
    }

    #[test]
    fn test_distill_by_inventory_numeral() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig::default();

        let args = DistillArgs {
            targets: vec![DistillTarget {
                id: "3".into(),
                distillation: "grep summary".into(),
            }],
        };
        let report = run_distill(&messages, &mut state, &config, &args).unwrap();
        assert_eq!(report.pruned_ids, vec!["t3"]);
    }

    #[test]
    fn test_distill_reports_unresolved_and_protected() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig {
            protected_tools: vec!["read".into()],
            ..Default::default()
        };

        let args = DistillArgs {
            targets: vec![
                DistillTarget {
                    id: "99".into(),
                    distillation: "stale numeral".into(),
                },
                DistillTarget {
                    id: "t5".into(),
                    distillation: "protected read".into(),
                },
            ],
        };
        let report = run_distill(&messages, &mut state, &config, &args).unwrap();

        assert_eq!(report.unresolved_inventory_ids, vec!["99"]);
        assert_eq!(report.protected_ids, vec!["t5"]);
        assert!(report.distillation_ids.is_empty());
        assert!(!state.prune.is_pruned("t5"));
    }

    #[test]
    fn test_distill_without_targets_is_invalid() {
        let messages = fixture();
        let mut state = SessionState::new("s1");
        let config = PruneConfig::default();

        let err = run_distill(&messages, &mut state, &config, &DistillArgs::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
