//! Request body detection and parsing
//!
//! An outgoing request body is shape-sniffed exactly once: `detect`
//! decides which wire format the body speaks, `parse` deserializes it
//! into the matching typed body. Every later operation dispatches on
//! the resulting variant instead of re-probing the JSON.

use crate::format::FormatAdapter;
use crate::formats::chat::ChatBody;
use crate::formats::gemini::GeminiBody;
use crate::formats::responses::ResponsesBody;
use dcp_foundation::Result;
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Wire formats the adapter layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// Chat-completions style: a `messages` array of role-tagged turns.
    Chat,

    /// Responses style: a flat `input` array of typed items.
    Responses,

    /// Gemini style: `contents[].parts[]`.
    Gemini,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Chat => "chat",
            WireFormat::Responses => "responses",
            WireFormat::Gemini => "gemini",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed request body, tagged with its wire format.
///
/// Unknown fields survive the round trip: every typed body keeps a
/// flattened extras map at each level, so rewriting touches only the
/// entries it means to touch.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Chat(ChatBody),
    Responses(ResponsesBody),
    Gemini(GeminiBody),
}

impl RequestBody {
    /// Decide which wire format a raw body speaks, if any.
    pub fn detect(value: &Value) -> Option<WireFormat> {
        let obj = value.as_object()?;
        if obj.get("messages").is_some_and(Value::is_array) {
            return Some(WireFormat::Chat);
        }
        if obj.get("input").is_some_and(Value::is_array) {
            return Some(WireFormat::Responses);
        }
        if obj.get("contents").is_some_and(Value::is_array) {
            return Some(WireFormat::Gemini);
        }
        None
    }

    /// Parse a raw body into its typed form.
    ///
    /// Returns `None` when the shape is unrecognized or a recognized
    /// shape fails to deserialize. Malformed bodies pass through the
    /// pipeline untouched rather than failing the request.
    pub fn parse(value: &Value) -> Option<RequestBody> {
        let format = Self::detect(value)?;
        let parsed = match format {
            WireFormat::Chat => serde_json::from_value(value.clone()).map(RequestBody::Chat),
            WireFormat::Responses => {
                serde_json::from_value(value.clone()).map(RequestBody::Responses)
            }
            WireFormat::Gemini => serde_json::from_value(value.clone()).map(RequestBody::Gemini),
        };
        match parsed {
            Ok(body) => Some(body),
            Err(err) => {
                warn!(format = %format, error = %err, "request body failed to parse, leaving untouched");
                None
            }
        }
    }

    pub fn format(&self) -> WireFormat {
        match self {
            RequestBody::Chat(_) => WireFormat::Chat,
            RequestBody::Responses(_) => WireFormat::Responses,
            RequestBody::Gemini(_) => WireFormat::Gemini,
        }
    }

    /// Serialize the (possibly rewritten) body back to JSON.
    pub fn to_value(&self) -> Result<Value> {
        let value = match self {
            RequestBody::Chat(body) => serde_json::to_value(body)?,
            RequestBody::Responses(body) => serde_json::to_value(body)?,
            RequestBody::Gemini(body) => serde_json::to_value(body)?,
        };
        Ok(value)
    }

    pub fn adapter(&self) -> &dyn FormatAdapter {
        match self {
            RequestBody::Chat(body) => body,
            RequestBody::Responses(body) => body,
            RequestBody::Gemini(body) => body,
        }
    }

    pub fn adapter_mut(&mut self) -> &mut dyn FormatAdapter {
        match self {
            RequestBody::Chat(body) => body,
            RequestBody::Responses(body) => body,
            RequestBody::Gemini(body) => body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_chat() {
        let body = json!({"model": "gpt-4o", "messages": [{"role": "user", "content": "hi"}]});
        assert_eq!(RequestBody::detect(&body), Some(WireFormat::Chat));
    }

    #[test]
    fn test_detect_responses() {
        let body = json!({"model": "o4", "input": [{"type": "message", "role": "user", "content": "hi"}]});
        assert_eq!(RequestBody::detect(&body), Some(WireFormat::Responses));
    }

    #[test]
    fn test_detect_gemini() {
        let body = json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]});
        assert_eq!(RequestBody::detect(&body), Some(WireFormat::Gemini));
    }

    #[test]
    fn test_detect_rejects_non_arrays() {
        assert_eq!(RequestBody::detect(&json!({"messages": "not an array"})), None);
        assert_eq!(RequestBody::detect(&json!({"input": "plain string prompt"})), None);
        assert_eq!(RequestBody::detect(&json!("just text")), None);
        assert_eq!(RequestBody::detect(&json!({"prompt": "legacy"})), None);
    }

    #[test]
    fn test_parse_malformed_detected_body_is_none() {
        // Detected as chat, but the turns are not objects.
        let body = json!({"messages": [42, "nope"]});
        assert_eq!(RequestBody::detect(&body), Some(WireFormat::Chat));
        assert!(RequestBody::parse(&body).is_none());
    }

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let raw = json!({
            "model": "gpt-4o",
            "temperature": 0.2,
            "messages": [
                {"role": "user", "content": "hi", "metadata": {"trace": "abc"}}
            ],
            "vendor_extension": {"キー": "値"}
        });
        let body = RequestBody::parse(&raw).unwrap();
        assert_eq!(body.format(), WireFormat::Chat);
        let back = body.to_value().unwrap();
        assert_eq!(back["temperature"], json!(0.2));
        assert_eq!(back["vendor_extension"], json!({"キー": "値"}));
        assert_eq!(back["messages"][0]["metadata"]["trace"], "abc");
    }
}
