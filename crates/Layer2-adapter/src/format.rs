//! Format adapter trait and common types
//!
//! Every wire format implements the same capability set against its own
//! shape. Callers hold a [`crate::body::RequestBody`] and dispatch
//! through [`FormatAdapter`] without re-sniffing the JSON.

use crate::body::WireFormat;
use dcp_foundation::{PruneConfig, SessionState};
use serde::Serialize;
use serde_json::Value;

/// Marker prefix for content this layer injected itself.
///
/// Injection targets skip user turns whose text starts with this
/// prefix, so an appended nudge never becomes the target of the next
/// instruction injection.
pub const SYNTH_PREFIX: &str = "[dcp] ";

/// A tool output found in a request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutputRef {
    /// Call ID as carried on the wire, or a synthetic
    /// `{format}:{name}:{ordinal}` key for formats without native IDs.
    pub id: String,

    /// Resolved tool name, when the wire or the session cache knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ToolOutputRef {
    pub fn new(id: impl Into<String>, tool_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            tool_name,
        }
    }
}

/// Capability contract shared by every wire format.
///
/// Implement this trait to add support for a new provider body shape.
pub trait FormatAdapter {
    /// The wire format this adapter speaks.
    fn format(&self) -> WireFormat;

    /// Number of entries in the format's flat data array.
    fn data_len(&self) -> usize;

    /// Whether the body carries any tool outputs at all.
    fn has_tool_outputs(&self) -> bool;

    /// Cache tool-call metadata (name, arguments) keyed by call ID.
    ///
    /// Formats whose result entries carry no tool name rely on this
    /// cache to resolve names later.
    fn cache_tool_parameters(&self, state: &mut SessionState);

    /// Observe tool results against the session tracker.
    ///
    /// Returns how many results were seen for the first time. Results
    /// from protected tools are not counted; they are never pruning
    /// candidates, so they should not advance the nudge schedule.
    fn track_new_tool_results(&self, state: &mut SessionState, config: &PruneConfig) -> usize;

    /// All tool outputs present in the body, with resolved names.
    fn extract_tool_outputs(&self, state: &SessionState) -> Vec<ToolOutputRef>;

    /// Replace the output content of every entry matching `tool_id`
    /// with `placeholder` (IDs can legally repeat on some wires).
    ///
    /// Replacement keeps the entry's shape so the conversation stays
    /// protocol-valid. Returns whether anything changed, so callers can
    /// skip re-serializing untouched bodies.
    fn replace_tool_output(&mut self, tool_id: &str, placeholder: &str) -> bool;

    /// Inject synthetic content into the body.
    ///
    /// `instruction` goes into the latest non-synthetic user turn,
    /// guarded by textual inclusion so a second pass never duplicates
    /// it. `nudge` is appended as a new trailing user entry (appended,
    /// not inserted, so it is maximally recent in context). Returns
    /// whether the body changed.
    fn inject_synth(&mut self, instruction: Option<&str>, nudge: Option<&str>) -> bool;

    /// Guarded injection of a prunable-list report.
    fn inject_prunable_list(&mut self, injection: &str) -> bool {
        self.inject_synth(Some(injection), None)
    }

    /// Structured metadata for request logging.
    fn log_metadata(&self) -> Value;
}
