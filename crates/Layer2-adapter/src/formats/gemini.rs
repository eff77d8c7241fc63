//! Gemini request adapter
//!
//! Wire shape: `contents[].parts[]`. Tool calls are `functionCall`
//! parts, tool outputs are `functionResponse` parts. The wire carries
//! no call IDs, so identity is the synthetic key
//! `gemini:{name}:{ordinal}` where the ordinal counts occurrences of
//! that name in document order.

use crate::body::WireFormat;
use crate::format::{FormatAdapter, ToolOutputRef, SYNTH_PREFIX};
use dcp_engine::is_protected_tool_name;
use dcp_foundation::{PruneConfig, SessionState, ToolParameterEntry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

// ============================================================================
// Gemini Wire Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiBody {
    pub contents: Vec<GeminiContent>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A single content part.
///
/// Gemini parts are an open union (text, functionCall, functionResponse,
/// inlineData, ...); optional fields on one struct keep unrecognized
/// kinds intact instead of failing an untagged match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<GeminiFunctionResponse>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionCall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionResponse {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl GeminiContent {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![GeminiPart::text_part(text)],
            rest: Map::new(),
        }
    }

    fn is_user(&self) -> bool {
        self.role.as_deref() == Some("user")
    }

    /// Joined text of the turn's text parts.
    fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl GeminiPart {
    fn text_part(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            function_call: None,
            function_response: None,
            rest: Map::new(),
        }
    }
}

fn synthetic_id(name: &str, ordinal: usize) -> String {
    format!("gemini:{}:{}", name.to_lowercase(), ordinal)
}

/// Per-name occurrence counter for synthetic IDs.
#[derive(Default)]
struct Ordinals(HashMap<String, usize>);

impl Ordinals {
    fn next(&mut self, name: &str) -> usize {
        let counter = self.0.entry(name.to_lowercase()).or_insert(0);
        let ordinal = *counter;
        *counter += 1;
        ordinal
    }
}

// ============================================================================
// FormatAdapter
// ============================================================================

impl GeminiBody {
    /// All function responses with their synthetic IDs, in document order.
    fn response_refs(&self) -> Vec<ToolOutputRef> {
        let mut ordinals = Ordinals::default();
        let mut refs = Vec::new();
        for content in &self.contents {
            for part in &content.parts {
                if let Some(response) = &part.function_response {
                    let ordinal = ordinals.next(&response.name);
                    refs.push(ToolOutputRef::new(
                        synthetic_id(&response.name, ordinal),
                        Some(response.name.clone()),
                    ));
                }
            }
        }
        refs
    }

    fn latest_real_user_index(&self) -> Option<usize> {
        self.contents
            .iter()
            .rposition(|content| content.is_user() && !content.text().starts_with(SYNTH_PREFIX))
    }
}

impl FormatAdapter for GeminiBody {
    fn format(&self) -> WireFormat {
        WireFormat::Gemini
    }

    fn data_len(&self) -> usize {
        self.contents.len()
    }

    fn has_tool_outputs(&self) -> bool {
        self.contents
            .iter()
            .any(|content| content.parts.iter().any(|p| p.function_response.is_some()))
    }

    fn cache_tool_parameters(&self, state: &mut SessionState) {
        let mut ordinals = Ordinals::default();
        for content in &self.contents {
            for part in &content.parts {
                let Some(call) = &part.function_call else {
                    continue;
                };
                let ordinal = ordinals.next(&call.name);
                let mut entry = ToolParameterEntry::new(&call.name);
                if let Some(args) = &call.args {
                    entry = entry.with_parameters(args.clone());
                }
                state.cache_tool_parameter(&synthetic_id(&call.name, ordinal), entry);
            }
        }
    }

    fn track_new_tool_results(&self, state: &mut SessionState, config: &PruneConfig) -> usize {
        let mut new_results = 0;
        for output in self.response_refs() {
            if let Some(name) = &output.tool_name {
                if is_protected_tool_name(name, config) {
                    continue;
                }
            }
            if state.tracker.observe(&output.id) {
                new_results += 1;
            }
        }
        new_results
    }

    fn extract_tool_outputs(&self, _state: &SessionState) -> Vec<ToolOutputRef> {
        self.response_refs()
    }

    fn replace_tool_output(&mut self, tool_id: &str, placeholder: &str) -> bool {
        let mut ordinals = Ordinals::default();
        let mut changed = false;
        for content in &mut self.contents {
            for part in &mut content.parts {
                let Some(response) = &mut part.function_response else {
                    continue;
                };
                let ordinal = ordinals.next(&response.name);
                let id = synthetic_id(&response.name, ordinal);
                if id.eq_ignore_ascii_case(tool_id) {
                    response.response = Some(json!({"result": placeholder}));
                    changed = true;
                }
            }
        }
        changed
    }

    fn inject_synth(&mut self, instruction: Option<&str>, nudge: Option<&str>) -> bool {
        let mut changed = false;
        if let Some(instruction) = instruction {
            match self.latest_real_user_index() {
                Some(index) => {
                    let content = &mut self.contents[index];
                    if !content.text().contains(instruction) {
                        content.parts.push(GeminiPart::text_part(instruction));
                        changed = true;
                    }
                }
                None => {
                    self.contents.push(GeminiContent::user(instruction));
                    changed = true;
                }
            }
        }
        if let Some(nudge) = nudge {
            self.contents.push(GeminiContent::user(nudge));
            changed = true;
        }
        changed
    }

    fn log_metadata(&self) -> Value {
        json!({
            "format": self.format().as_str(),
            "entries": self.data_len(),
            "toolOutputs": self.response_refs().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Helper functions ===

    fn body(value: Value) -> GeminiBody {
        serde_json::from_value(value).unwrap()
    }

    fn body_with_tools() -> GeminiBody {
        body(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "scan the repo"}]},
                {"role": "model", "parts": [
                    {"functionCall": {"name": "grep", "args": {"pattern": "todo"}}}
                ]},
                {"role": "user", "parts": [
                    {"functionResponse": {"name": "grep", "response": {"output": "3 matches"}}}
                ]},
                {"role": "model", "parts": [
                    {"functionCall": {"name": "grep", "args": {"pattern": "fixme"}}}
                ]},
                {"role": "user", "parts": [
                    {"functionResponse": {"name": "grep", "response": {"output": "1 match"}}}
                ]},
                {"role": "model", "parts": [
                    {"functionCall": {"name": "read", "args": {"path": "src/lib.rs"}}}
                ]},
                {"role": "user", "parts": [
                    {"functionResponse": {"name": "read", "response": {"output": "file body"}}}
                ]}
            ],
            "generationConfig": {"temperature": 0.1}
        }))
    }

    // === Tests ===

    #[test]
    fn test_synthetic_ids_use_per_name_ordinals() {
        let gemini = body_with_tools();
        let state = SessionState::new("s1");

        let outputs = gemini.extract_tool_outputs(&state);
        let ids: Vec<&str> = outputs.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["gemini:grep:0", "gemini:grep:1", "gemini:read:0"]);
        assert_eq!(outputs[0].tool_name.as_deref(), Some("grep"));
    }

    #[test]
    fn test_cache_keys_mirror_call_ordinals() {
        let gemini = body_with_tools();
        let mut state = SessionState::new("s1");
        gemini.cache_tool_parameters(&mut state);

        let first = state.tool_parameter("gemini:grep:0").unwrap();
        assert_eq!(first.parameters, Some(json!({"pattern": "todo"})));
        let second = state.tool_parameter("gemini:grep:1").unwrap();
        assert_eq!(second.parameters, Some(json!({"pattern": "fixme"})));
        assert_eq!(state.tool_parameter("gemini:read:0").unwrap().tool_name, "read");
    }

    #[test]
    fn test_replace_targets_one_ordinal() {
        let mut gemini = body_with_tools();
        assert!(gemini.replace_tool_output("gemini:grep:1", "[pruned]"));

        let first = gemini.contents[2].parts[0].function_response.as_ref().unwrap();
        assert_eq!(first.response, Some(json!({"output": "3 matches"})));
        let second = gemini.contents[4].parts[0].function_response.as_ref().unwrap();
        assert_eq!(second.response, Some(json!({"result": "[pruned]"})));
    }

    #[test]
    fn test_replace_unknown_id_reports_no_change() {
        let mut gemini = body_with_tools();
        assert!(!gemini.replace_tool_output("gemini:grep:7", "[pruned]"));
    }

    #[test]
    fn test_track_counts_and_skips_protected() {
        let gemini = body_with_tools();
        let mut state = SessionState::new("s1");
        let config = PruneConfig {
            protected_tools: vec!["read".into()],
            ..Default::default()
        };

        assert_eq!(gemini.track_new_tool_results(&mut state, &config), 2);
        assert_eq!(gemini.track_new_tool_results(&mut state, &config), 0);
        assert!(!state.tracker.has_seen("gemini:read:0"));
    }

    #[test]
    fn test_replacement_keeps_symmetry() {
        let mut gemini = body_with_tools();
        let state = SessionState::new("s1");
        let before = gemini.data_len();

        for output in gemini.extract_tool_outputs(&state) {
            assert!(gemini.replace_tool_output(&output.id, "[pruned]"));
        }

        assert!(gemini.has_tool_outputs());
        assert_eq!(gemini.data_len(), before);
    }

    #[test]
    fn test_inject_targets_latest_user_turn() {
        let mut gemini = body_with_tools();
        assert!(gemini.inject_synth(Some("inventory: #1 grep"), None));
        assert!(!gemini.inject_synth(Some("inventory: #1 grep"), None));

        // Latest user turn carries the function response plus the new text.
        let target = &gemini.contents[6];
        assert_eq!(target.parts.len(), 2);
        assert_eq!(target.parts[1].text.as_deref(), Some("inventory: #1 grep"));
    }

    #[test]
    fn test_nudge_appended_as_trailing_user_turn() {
        let mut gemini = body_with_tools();
        gemini.inject_synth(None, Some("[dcp] consider pruning"));

        let last = gemini.contents.last().unwrap();
        assert!(last.is_user());
        assert_eq!(last.text(), "[dcp] consider pruning");
    }

    #[test]
    fn test_unknown_part_kinds_survive() {
        let gemini = body(json!({
            "contents": [
                {"role": "user", "parts": [
                    {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}
                ]}
            ]
        }));
        let back = serde_json::to_value(&gemini).unwrap();
        assert_eq!(back["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(back["generationConfig"], Value::Null);
    }
}
