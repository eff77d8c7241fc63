//! Responses-style request adapter
//!
//! Wire shape: a flat `input` array of typed items. Tool calls are
//! `function_call` items, tool outputs are `function_call_output` items,
//! both keyed by `call_id`. Output names are resolved from the sibling
//! call item in the same body, falling back to the session cache.

use crate::body::WireFormat;
use crate::format::{FormatAdapter, ToolOutputRef, SYNTH_PREFIX};
use dcp_engine::is_protected_tool_name;
use dcp_foundation::{PruneConfig, SessionState, ToolParameterEntry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ============================================================================
// Responses Wire Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesBody {
    pub input: Vec<ResponseItem>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One entry in the flat `input` array.
///
/// The wire mixes several item kinds in one array; a single permissive
/// struct keeps unrecognized kinds and fields intact across the round
/// trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseItem {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ResponseItem {
    fn user(text: &str) -> Self {
        Self {
            kind: Some("message".to_string()),
            role: Some("user".to_string()),
            content: Some(Value::String(text.to_string())),
            call_id: None,
            name: None,
            arguments: None,
            output: None,
            rest: Map::new(),
        }
    }

    fn is_function_call(&self) -> bool {
        self.kind.as_deref() == Some("function_call") && self.call_id.is_some()
    }

    fn is_function_call_output(&self) -> bool {
        self.kind.as_deref() == Some("function_call_output") && self.call_id.is_some()
    }

    fn is_user_message(&self) -> bool {
        self.role.as_deref() == Some("user")
            && self.kind.as_deref().map_or(true, |kind| kind == "message")
    }

    fn arguments_parsed(&self) -> Option<Value> {
        match &self.arguments {
            Some(Value::String(raw)) => serde_json::from_str(raw).ok(),
            Some(other) => Some(other.clone()),
            None => None,
        }
    }

    /// Joined text content; non-text parts contribute nothing.
    fn text(&self) -> String {
        match &self.content {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Array(parts)) => parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }

    fn append_text(&mut self, text: &str) -> bool {
        match &mut self.content {
            None => {
                self.content = Some(Value::String(text.to_string()));
                true
            }
            Some(Value::String(existing)) => {
                existing.push_str("\n\n");
                existing.push_str(text);
                true
            }
            Some(Value::Array(parts)) => {
                parts.push(json!({"type": "input_text", "text": text}));
                true
            }
            Some(_) => false,
        }
    }
}

// ============================================================================
// FormatAdapter
// ============================================================================

impl ResponsesBody {
    /// Tool name for a call ID, from the sibling `function_call` item.
    fn sibling_call_name(&self, call_id: &str) -> Option<String> {
        self.input
            .iter()
            .filter(|item| item.is_function_call())
            .find(|item| {
                item.call_id
                    .as_deref()
                    .is_some_and(|id| id.eq_ignore_ascii_case(call_id))
            })
            .and_then(|item| item.name.clone())
    }

    fn resolve_tool_name(&self, call_id: &str, state: &SessionState) -> Option<String> {
        self.sibling_call_name(call_id)
            .or_else(|| state.tool_parameter(call_id).map(|e| e.tool_name.clone()))
    }

    fn latest_real_user_index(&self) -> Option<usize> {
        self.input
            .iter()
            .rposition(|item| item.is_user_message() && !item.text().starts_with(SYNTH_PREFIX))
    }
}

impl FormatAdapter for ResponsesBody {
    fn format(&self) -> WireFormat {
        WireFormat::Responses
    }

    fn data_len(&self) -> usize {
        self.input.len()
    }

    fn has_tool_outputs(&self) -> bool {
        self.input.iter().any(ResponseItem::is_function_call_output)
    }

    fn cache_tool_parameters(&self, state: &mut SessionState) {
        for item in &self.input {
            if !item.is_function_call() {
                continue;
            }
            let (Some(call_id), Some(name)) = (item.call_id.as_deref(), item.name.as_deref())
            else {
                continue;
            };
            let mut entry = ToolParameterEntry::new(name);
            if let Some(parameters) = item.arguments_parsed() {
                entry = entry.with_parameters(parameters);
            }
            state.cache_tool_parameter(call_id, entry);
        }
    }

    fn track_new_tool_results(&self, state: &mut SessionState, config: &PruneConfig) -> usize {
        let mut new_results = 0;
        for item in &self.input {
            if !item.is_function_call_output() {
                continue;
            }
            let Some(call_id) = item.call_id.as_deref() else {
                continue;
            };
            let resolved = self.resolve_tool_name(call_id, state);
            if let Some(name) = &resolved {
                if is_protected_tool_name(name, config) {
                    continue;
                }
            }
            if state.tracker.observe(call_id) {
                new_results += 1;
            }
        }
        new_results
    }

    fn extract_tool_outputs(&self, state: &SessionState) -> Vec<ToolOutputRef> {
        self.input
            .iter()
            .filter(|item| item.is_function_call_output())
            .filter_map(|item| {
                let call_id = item.call_id.clone()?;
                let name = self.resolve_tool_name(&call_id, state);
                Some(ToolOutputRef::new(call_id, name))
            })
            .collect()
    }

    fn replace_tool_output(&mut self, tool_id: &str, placeholder: &str) -> bool {
        let mut changed = false;
        for item in &mut self.input {
            if !item.is_function_call_output() {
                continue;
            }
            let matches = item
                .call_id
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(tool_id));
            if matches {
                item.output = Some(Value::String(placeholder.to_string()));
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
                    let item = &mut self.input[index];
                    if !item.text().contains(instruction) && item.append_text(instruction) {
                        changed = true;
                    }
                }
                None => {
                    self.input.push(ResponseItem::user(instruction));
                    changed = true;
                }
            }
        }
        if let Some(nudge) = nudge {
            self.input.push(ResponseItem::user(nudge));
            changed = true;
        }
        changed
    }

    fn log_metadata(&self) -> Value {
        json!({
            "format": self.format().as_str(),
            "entries": self.data_len(),
            "toolOutputs": self.input.iter().filter(|i| i.is_function_call_output()).count(),
        })
    }
}
