//! Protection policy - decide whether a message is exempt from pruning
//!
//! Protection is advisory at the engine boundary: protected candidates are
//! reported back to the caller, never silently dropped.

use dcp_foundation::{Message, PruneConfig};
use glob::{MatchOptions, Pattern};
use tracing::warn;

/// Tool names that are never prunable, so the pruning tools cannot
/// prune their own results out of the transcript.
pub const BUILTIN_PROTECTED_TOOLS: &[&str] = &["prune", "distill"];

/// Name-only protection check, for wire entries that carry a tool name
/// but no full message (no file path to test).
pub fn is_protected_tool_name(name: &str, config: &PruneConfig) -> bool {
    BUILTIN_PROTECTED_TOOLS
        .iter()
        .any(|t| t.eq_ignore_ascii_case(name))
        || config.is_protected_tool(name)
}

/// Returns true when the message must not be pruned.
///
/// A message is protected if its tool name is built-in protected, if its
/// tool name appears in the configured protected list (case-insensitive),
/// or if its inferred file path matches any configured glob pattern.
pub fn is_protected(message: &Message, config: &PruneConfig) -> bool {
    if let Some(name) = message.effective_tool_name() {
        if is_protected_tool_name(name, config) {
            return true;
        }
    }

    if let Some(path) = message.inferred_file_path() {
        if matches_any_pattern(path, &config.protected_file_patterns) {
            return true;
        }
    }

    false
}

/// Glob match with path-aware semantics: `*` stays within one path
/// segment, `**` crosses separators. Invalid patterns are skipped.
fn matches_any_pattern(path: &str, patterns: &[String]) -> bool {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    patterns.iter().any(|raw| match Pattern::new(raw) {
        Ok(pattern) => pattern.matches_with(path, options),
        Err(_) => {
            warn!(pattern = %raw, "invalid protected file pattern, skipping");
            false
        }
    })
}
