//! Chat-completions request adapter
//!
//! Wire shape: a `messages` array of role-tagged turns. Tool outputs
//! are `role:"tool"` turns keyed by `tool_call_id`. The wire carries no
//! tool name on results, so names are resolved through the session's
//! cached tool-parameter map.

use crate::body::WireFormat;
use crate::format::{FormatAdapter, ToolOutputRef, SYNTH_PREFIX};
use dcp_engine::is_protected_tool_name;
use dcp_foundation::{PruneConfig, SessionState, ToolParameterEntry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ============================================================================
// Chat Wire Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBody {
    pub messages: Vec<ChatTurn>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ChatContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Content parts stay raw `Value`s: incoming bodies mix text with
/// image and vendor part kinds that must survive the round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<Value>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ChatFunctionCall>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatFunctionCall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ChatFunctionCall {
    /// Arguments decoded to JSON; the chat wire string-encodes them.
    fn arguments_parsed(&self) -> Option<Value> {
        match &self.arguments {
            Some(Value::String(raw)) => serde_json::from_str(raw).ok(),
            Some(other) => Some(other.clone()),
            None => None,
        }
    }
}

impl ChatTurn {
    fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(ChatContent::Text(text.to_string())),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            rest: Map::new(),
        }
    }

    fn is_tool_output(&self) -> bool {
        self.role == "tool" && self.tool_call_id.is_some()
    }

    /// Joined text content; non-text parts contribute nothing.
    fn text(&self) -> String {
        match &self.content {
            None => String::new(),
            Some(ChatContent::Text(text)) => text.clone(),
            Some(ChatContent::Parts(parts)) => parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn append_text(&mut self, text: &str) {
        match &mut self.content {
            None => self.content = Some(ChatContent::Text(text.to_string())),
            Some(ChatContent::Text(existing)) => {
                existing.push_str("\n\n");
                existing.push_str(text);
            }
            Some(ChatContent::Parts(parts)) => {
                parts.push(json!({"type": "text", "text": text}));
            }
        }
    }
}

// ============================================================================
// FormatAdapter
// ============================================================================

impl ChatBody {
    fn resolve_tool_name(&self, turn: &ChatTurn, state: &SessionState) -> Option<String> {
        let id = turn.tool_call_id.as_deref()?;
        state
            .tool_parameter(id)
            .map(|entry| entry.tool_name.clone())
            .or_else(|| turn.name.clone())
    }

    fn latest_real_user_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|turn| turn.role == "user" && !turn.text().starts_with(SYNTH_PREFIX))
    }
}

impl FormatAdapter for ChatBody {
    fn format(&self) -> WireFormat {
        WireFormat::Chat
    }

    fn data_len(&self) -> usize {
        self.messages.len()
    }

    fn has_tool_outputs(&self) -> bool {
        self.messages.iter().any(ChatTurn::is_tool_output)
    }

    fn cache_tool_parameters(&self, state: &mut SessionState) {
        for turn in &self.messages {
            let Some(calls) = &turn.tool_calls else {
                continue;
            };
            for call in calls {
                let Some(function) = &call.function else {
                    continue;
                };
                if call.id.is_empty() {
                    continue;
                }
                let mut entry = ToolParameterEntry::new(&function.name);
                if let Some(parameters) = function.arguments_parsed() {
                    entry = entry.with_parameters(parameters);
                }
                state.cache_tool_parameter(&call.id, entry);
            }
        }
    }

    fn track_new_tool_results(&self, state: &mut SessionState, config: &PruneConfig) -> usize {
        let mut new_results = 0;
        for turn in &self.messages {
            if !turn.is_tool_output() {
                continue;
            }
            let Some(id) = turn.tool_call_id.as_deref() else {
                continue;
            };
            let resolved = self.resolve_tool_name(turn, state);
            if let Some(name) = &resolved {
                if is_protected_tool_name(name, config) {
                    continue;
                }
            }
            if state.tracker.observe(id) {
                new_results += 1;
            }
        }
        new_results
    }

    fn extract_tool_outputs(&self, state: &SessionState) -> Vec<ToolOutputRef> {
        self.messages
            .iter()
            .filter(|turn| turn.is_tool_output())
            .filter_map(|turn| {
                let id = turn.tool_call_id.clone()?;
                Some(ToolOutputRef::new(id, self.resolve_tool_name(turn, state)))
            })
            .collect()
    }

    fn replace_tool_output(&mut self, tool_id: &str, placeholder: &str) -> bool {
        let mut changed = false;
        for turn in &mut self.messages {
            if !turn.is_tool_output() {
                continue;
            }
            let matches = turn
                .tool_call_id
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(tool_id));
            if matches {
                turn.content = Some(ChatContent::Text(placeholder.to_string()));
                changed = true;
            }
        }
        changed
    }

    fn inject_synth(&mut self, instruction: Option<&str>, nudge: Option<&str>) -> bool {
        let mut changed = false;
        if let Some(instruction) = instruction {
            match self.latest_real_user_index() {
                Some(index) => {
                    let turn = &mut self.messages[index];
                    if !turn.text().contains(instruction) {
                        turn.append_text(instruction);
                        changed = true;
                    }
                }
                None => {
                    self.messages.push(ChatTurn::user(instruction));
                    changed = true;
                }
            }
        }
        if let Some(nudge) = nudge {
            self.messages.push(ChatTurn::user(nudge));
            changed = true;
        }
        changed
    }

    fn log_metadata(&self) -> Value {
        json!({
            "format": self.format().as_str(),
            "entries": self.data_len(),
            "toolOutputs": self.messages.iter().filter(|t| t.is_tool_output()).count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Helper functions ===

    fn body(value: Value) -> ChatBody {
        serde_json::from_value(value).unwrap()
    }

    fn body_with_tools() -> ChatBody {
        body(json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "user", "content": "search the repo"},
                {"role": "assistant", "content": null, "tool_calls": [
                    {"id": "call_1", "type": "function",
                     "function": {"name": "grep", "arguments": "{\"pattern\": \"foo\"}"}},
                    {"id": "call_2", "type": "function",
                     "function": {"name": "read", "arguments": "{\"path\": \"src/lib.rs\"}"}}
                ]},
                {"role": "tool", "tool_call_id": "call_1", "content": "match at line 3"},
                {"role": "tool", "tool_call_id": "call_2", "content": "file contents here"}
            ]
        }))
    }

    fn cached_state(chat: &ChatBody) -> SessionState {
        let mut state = SessionState::new("s1");
        chat.cache_tool_parameters(&mut state);
        state
    }

    // === Tests ===

    #[test]
    fn test_cache_tool_parameters_decodes_arguments() {
        let chat = body_with_tools();
        let state = cached_state(&chat);

        let entry = state.tool_parameter("call_1").unwrap();
        assert_eq!(entry.tool_name, "grep");
        assert_eq!(entry.parameters, Some(json!({"pattern": "foo"})));
    }

    #[test]
    fn test_track_counts_first_seen_only() {
        let chat = body_with_tools();
        let mut state = cached_state(&chat);
        let config = PruneConfig::default();

        assert_eq!(chat.track_new_tool_results(&mut state, &config), 2);
        // Same body again: nothing new.
        assert_eq!(chat.track_new_tool_results(&mut state, &config), 0);
        assert_eq!(state.tracker.count(), 2);
    }

    #[test]
    fn test_track_skips_protected_tools() {
        let chat = body_with_tools();
        let mut state = cached_state(&chat);
        let config = PruneConfig {
            protected_tools: vec!["read".into()],
            ..Default::default()
        };

        assert_eq!(chat.track_new_tool_results(&mut state, &config), 1);
        assert!(state.tracker.has_seen("call_1"));
        assert!(!state.tracker.has_seen("call_2"));
    }

    #[test]
    fn test_extract_resolves_names_from_cache() {
        let chat = body_with_tools();
        let state = cached_state(&chat);

        let outputs = chat.extract_tool_outputs(&state);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].id, "call_1");
        assert_eq!(outputs[0].tool_name.as_deref(), Some("grep"));
        assert_eq!(outputs[1].tool_name.as_deref(), Some("read"));
    }

    #[test]
    fn test_extract_without_cache_has_no_names() {
        let chat = body_with_tools();
        let state = SessionState::new("s1");

        let outputs = chat.extract_tool_outputs(&state);
        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].tool_name.is_none());
    }

    #[test]
    fn test_replace_all_matching_entries() {
        // The same call ID twice, with different casing.
        let mut chat = body(json!({
            "messages": [
                {"role": "tool", "tool_call_id": "call_1", "content": "first copy"},
                {"role": "tool", "tool_call_id": "CALL_1", "content": "second copy"}
            ]
        }));

        assert!(chat.replace_tool_output("call_1", "[pruned]"));
        for turn in &chat.messages {
            assert_eq!(turn.text(), "[pruned]");
        }
    }

    #[test]
    fn test_replace_unknown_id_reports_no_change() {
        let mut chat = body_with_tools();
        assert!(!chat.replace_tool_output("call_9", "[pruned]"));
    }

    #[test]
    fn test_replacement_keeps_symmetry() {
        let mut chat = body_with_tools();
        let state = cached_state(&chat);
        let before = chat.data_len();

        for output in chat.extract_tool_outputs(&state) {
            assert!(chat.replace_tool_output(&output.id, "[pruned]"));
        }

        // Replacement, not deletion.
        assert!(chat.has_tool_outputs());
        assert_eq!(chat.data_len(), before);
    }

    #[test]
    fn test_inject_instruction_is_idempotent() {
        let mut chat = body_with_tools();
        assert!(chat.inject_synth(Some("use the prune tool"), None));
        assert!(!chat.inject_synth(Some("use the prune tool"), None));
        assert_eq!(chat.data_len(), 4);
        assert!(chat.messages[0].text().contains("use the prune tool"));
    }

    #[test]
    fn test_nudge_appended_as_trailing_user_turn() {
        let mut chat = body_with_tools();
        assert!(chat.inject_synth(None, Some("[dcp] consider pruning")));

        let last = chat.messages.last().unwrap();
        assert_eq!(last.role, "user");
        assert_eq!(last.text(), "[dcp] consider pruning");
    }

    #[test]
    fn test_instruction_skips_synthetic_user_turns() {
        let mut chat = body_with_tools();
        chat.inject_synth(None, Some("[dcp] consider pruning"));
        chat.inject_synth(Some("inventory: #1 grep"), None);

        // The injected instruction lands on the real user turn, not the nudge.
        assert!(chat.messages[0].text().contains("inventory: #1 grep"));
        assert_eq!(chat.messages.last().unwrap().text(), "[dcp] consider pruning");
    }

    #[test]
    fn test_turn_level_unknown_fields_survive() {
        let chat = body(json!({
            "messages": [
                {"role": "tool", "tool_call_id": "c1", "content": "out", "cache_control": {"type": "ephemeral"}}
            ]
        }));
        let back = serde_json::to_value(&chat).unwrap();
        assert_eq!(back["messages"][0]["cache_control"]["type"], "ephemeral");
    }
}
