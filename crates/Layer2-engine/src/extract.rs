//! Message content extraction - flatten heterogeneous parts into searchable text
//!
//! The output is a matching corpus, not display text. Nothing is truncated:
//! match quality depends on the complete content being present.

use dcp_foundation::{char_count, Message, MessagePart, ToolStatus};
use serde_json::Value;

/// Flatten a message's parts into a single space-joined string.
///
/// Per part type: `text`/`reasoning` contribute their text; `tool` contributes
/// the completed output or the error text plus the stringified call input;
/// `compaction` contributes its summary; `subtask` its summary and result.
/// Unknown parts contribute nothing.
pub fn searchable_text(message: &Message) -> String {
    let mut chunks: Vec<String> = Vec::new();

    for part in &message.parts {
        match part {
            MessagePart::Text { text } | MessagePart::Reasoning { text } => {
                chunks.push(text.clone());
            }
            MessagePart::Tool {
                status,
                output,
                error,
                input,
                ..
            } => {
                match status {
                    ToolStatus::Completed => {
                        if let Some(output) = output {
                            chunks.push(output.clone());
                        }
                    }
                    ToolStatus::Error => {
                        if let Some(error) = error {
                            chunks.push(error.clone());
                        }
                    }
                    // pending/running results have no content yet
                    ToolStatus::Pending | ToolStatus::Running => {}
                }
                if let Some(input) = input {
                    chunks.push(stringify_input(input));
                }
            }
            MessagePart::Compaction { summary } => chunks.push(summary.clone()),
            MessagePart::Subtask { summary, result } => {
                chunks.push(summary.clone());
                if let Some(result) = result {
                    chunks.push(result.clone());
                }
            }
            MessagePart::Unknown => {}
        }
    }

    chunks.join(" ")
}

/// Content size of a message in characters, measured on the extracted text.
pub fn content_chars(message: &Message) -> usize {
    char_count(&searchable_text(message))
}

fn stringify_input(input: &Value) -> String {
    match input {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
