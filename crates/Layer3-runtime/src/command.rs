//! Text command surface
//!
//! Plain-text reports over the session's prune state. The report shapes
//! are an external contract: callers (and tests) match on literal
//! substrings like `prunable count=3 chars=120 estTokens=30` and
//! `#1 grep chars=40 estTokens=10`.

use crate::ops::{chars_for, fetch_messages};
use crate::registry::SessionRegistry;
use dcp_engine::{prunable_inventory, sweep};
use dcp_foundation::{
    estimate_tokens, Error, HostClient, Message, PruneConfig, Result, SessionState,
};
use tracing::warn;

// ============================================================================
// Command
// ============================================================================

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Inventory plus size report. The default when no subcommand is given.
    Context,
    /// Cumulative per-session counters.
    Stats,
    /// Bounded sweep of the post-user tail.
    Sweep { limit: Option<usize> },
}

impl Command {
    /// Parse the text after the command prefix. Unknown subcommands
    /// return `None` so the host can print usage.
    pub fn parse(input: &str) -> Option<Command> {
        let mut words = input.split_whitespace();
        match words.next() {
            None | Some("context") => Some(Command::Context),
            Some("stats") => Some(Command::Stats),
            Some("sweep") => {
                let limit = match words.next() {
                    Some(raw) => Some(raw.parse().ok()?),
                    None => None,
                };
                Some(Command::Sweep { limit })
            }
            Some(_) => None,
        }
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Pick the session a command applies to: the explicit ID when given,
/// otherwise the most recently updated session the host knows about.
pub async fn resolve_session(
    client: &dyn HostClient,
    explicit: Option<&str>,
) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }

    let sessions = match client.list_sessions().await {
        Ok(sessions) => sessions,
        Err(err) => {
            warn!(error = %err, "session listing failed");
            Vec::new()
        }
    };
    sessions
        .into_iter()
        .max_by_key(|s| s.updated_at)
        .map(|s| s.id)
        .ok_or_else(|| Error::InvalidInput("no sessions available".into()))
}

/// Execute a command against one session and render its report.
pub async fn run_command(
    client: &dyn HostClient,
    registry: &SessionRegistry,
    config: &PruneConfig,
    session_id: &str,
    command: Command,
) -> Result<String> {
    match command {
        Command::Context => {
            let messages = fetch_messages(client, session_id).await;
            let report = registry
                .with_state(session_id, |state| {
                    render_context(&messages, state, config)
                })
                .await;
            Ok(report)
        }
        Command::Stats => {
            let stats = registry.with_state(session_id, |state| state.stats).await;
            Ok(format!(
                "pruned messages={} chars={} estTokens={} sweeps={}",
                stats.pruned_messages,
                stats.pruned_chars,
                stats.est_tokens_saved(),
                stats.sweeps
            ))
        }
        Command::Sweep { limit } => {
            let messages = fetch_messages(client, session_id).await;
            let (count, chars) = registry
                .with_state(session_id, |state| {
                    let outcome = sweep(
                        &messages,
                        state,
                        config,
                        limit.or(config.default_sweep_limit),
                    );
                    let chars = chars_for(state, &outcome.pruned_ids);
                    (outcome.pruned_ids.len(), chars)
                })
                .await;
            registry.save(session_id).await;
            Ok(format!(
                "swept count={} chars={} estTokens={}",
                count,
                chars,
                estimate_tokens(chars)
            ))
        }
    }
}

fn render_context(
    messages: &[Message],
    state: &mut SessionState,
    config: &PruneConfig,
) -> String {
    let inventory = prunable_inventory(messages, state, config);
    let total_chars = inventory.total_chars();

    let mut lines = vec![format!(
        "prunable count={} chars={} estTokens={}",
        inventory.entries.len(),
        total_chars,
        estimate_tokens(total_chars)
    )];
    for entry in &inventory.entries {
        lines.push(format!(
            "#{} {} chars={} estTokens={}",
            entry.numeric_id,
            entry.tool_name.as_deref().unwrap_or("unknown"),
            entry.chars,
            estimate_tokens(entry.chars)
        ));
    }
    lines.join("\n")
}
