//! Pipeline integration tests - request rewriting across the wire formats
//!
//! `cargo test -p dcp-runtime --test pipeline`

use dcp_adapter::{RequestBody, NUDGE_TEXT};
use dcp_foundation::{
    MemoryStateStore, PersistedPrune, PersistedState, PruneConfig, PruneStats, PrunedRecord,
    StateStore,
};
use dcp_runtime::{RequestPipeline, SessionRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

fn chat_body() -> Value {
    json!({
        "model": "gpt-4o",
        "messages": [
            {"role": "user", "content": "find the bug"},
            {"role": "assistant", "tool_calls": [
                {"id": "call_1", "type": "function",
                 "function": {"name": "grep", "arguments": "{\"pattern\": \"panic\"}"}}
            ]},
            {"role": "tool", "tool_call_id": "call_1", "content": "src/main.rs:42: panic!(...)"}
        ]
    })
}

async fn registry_with_pruned(id: &str, reason: &str) -> Arc<SessionRegistry> {
    let registry = Arc::new(SessionRegistry::new());
    let record = PrunedRecord::new(reason, Some("grep".into()), 30);
    registry
        .with_state("s1", |state| {
            state.prune.insert(id, record);
        })
        .await;
    registry
}

#[tokio::test]
async fn test_chat_output_replaced_end_to_end() {
    let registry = registry_with_pruned("call_1", "manual").await;
    let pipeline = RequestPipeline::new(registry, PruneConfig::default());

    let mut body = chat_body();
    let processed = pipeline.process("s1", &mut body).await;

    assert!(processed.changed);
    assert_eq!(processed.replaced, 1);
    assert_eq!(
        body["messages"][2]["content"],
        "[dcp-pruned id=call_1 reason=manual]"
    );
    // Sibling fields and the unrelated turns survive the rewrite.
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0]["content"], "find the bug");
    assert_eq!(body["messages"][1]["tool_calls"][0]["id"], "call_1");
}

#[tokio::test]
async fn test_responses_output_replaced_end_to_end() {
    let registry = registry_with_pruned("call_1", "sweep").await;
    let pipeline = RequestPipeline::new(registry, PruneConfig::default());

    let mut body = json!({
        "model": "gpt-4o",
        "input": [
            {"type": "message", "role": "user", "content": "find the bug"},
            {"type": "function_call", "call_id": "call_1", "name": "grep", "arguments": "{}"},
            {"type": "function_call_output", "call_id": "call_1", "output": "src/main.rs:42"}
        ]
    });
    let processed = pipeline.process("s1", &mut body).await;

    assert_eq!(processed.replaced, 1);
    assert_eq!(
        body["input"][2]["output"],
        "[dcp-pruned id=call_1 reason=sweep]"
    );
    assert_eq!(body["input"][1]["name"], "grep");
}

#[tokio::test]
async fn test_gemini_output_replaced_by_synthetic_id() {
    // Gemini has no native call IDs; pruned state records the
    // {format}:{name}:{ordinal} identity instead.
    let registry = registry_with_pruned("gemini:grep:0", "sweep").await;
    let pipeline = RequestPipeline::new(registry, PruneConfig::default());

    let mut body = json!({
        "contents": [
            {"role": "user", "parts": [{"text": "find the bug"}]},
            {"role": "model", "parts": [{"functionCall": {"name": "grep", "args": {}}}]},
            {"role": "user", "parts": [{"functionResponse": {
                "name": "grep", "response": {"output": "src/main.rs:42"}
            }}]}
        ]
    });
    let processed = pipeline.process("s1", &mut body).await;

    assert_eq!(processed.replaced, 1);
    assert_eq!(
        body["contents"][2]["parts"][0]["functionResponse"]["response"]["result"],
        "[dcp-pruned id=gemini:grep:0 reason=sweep]"
    );
}

#[tokio::test]
async fn test_nudge_appended_once_per_boundary() {
    let config = PruneConfig {
        nudge_frequency: 2,
        ..Default::default()
    };
    let pipeline = RequestPipeline::new(Arc::new(SessionRegistry::new()), config);

    let mut body = json!({
        "messages": [
            {"role": "user", "content": "scan the repo"},
            {"role": "assistant", "tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": "grep", "arguments": "{}"}},
                {"id": "call_2", "type": "function", "function": {"name": "bash", "arguments": "{}"}}
            ]},
            {"role": "tool", "tool_call_id": "call_1", "content": "hits"},
            {"role": "tool", "tool_call_id": "call_2", "content": "done"}
        ]
    });

    // Two new results cross the freq=2 boundary: one trailing nudge.
    let processed = pipeline.process("s1", &mut body).await;
    assert!(processed.nudged);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[4]["role"], "user");
    assert_eq!(messages[4]["content"], NUDGE_TEXT);

    // Same results again: already tracked, no second nudge, no rewrite.
    let processed = pipeline.process("s1", &mut body).await;
    assert!(!processed.nudged);
    assert!(!processed.changed);
    assert_eq!(body["messages"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_protected_results_do_not_advance_nudge() {
    let config = PruneConfig {
        nudge_frequency: 2,
        protected_tools: vec!["bash".into()],
        ..Default::default()
    };
    let pipeline = RequestPipeline::new(Arc::new(SessionRegistry::new()), config);

    let mut body = json!({
        "messages": [
            {"role": "user", "content": "scan"},
            {"role": "assistant", "tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": "grep", "arguments": "{}"}},
                {"id": "call_2", "type": "function", "function": {"name": "bash", "arguments": "{}"}}
            ]},
            {"role": "tool", "tool_call_id": "call_1", "content": "hits"},
            {"role": "tool", "tool_call_id": "call_2", "content": "done"}
        ]
    });

    // Only the grep result counts; one of two does not cross freq=2.
    let processed = pipeline.process("s1", &mut body).await;
    assert!(!processed.nudged);
    assert!(!processed.changed);
}

#[tokio::test]
async fn test_rehydrated_state_replaces_on_first_request() {
    let store = Arc::new(MemoryStateStore::new());
    store
        .save_session_state(
            "s1",
            &PersistedState {
                prune: PersistedPrune {
                    tool_ids: vec!["call_1".into()],
                },
                stats: PruneStats::default(),
            },
        )
        .await
        .unwrap();

    let registry = Arc::new(SessionRegistry::with_store(store));
    let pipeline = RequestPipeline::new(registry, PruneConfig::default());

    let mut body = chat_body();
    let processed = pipeline.process("s1", &mut body).await;

    assert_eq!(processed.replaced, 1);
    assert_eq!(
        body["messages"][2]["content"],
        "[dcp-pruned id=call_1 reason=restored]"
    );
}

#[tokio::test]
async fn test_prunable_list_injection_is_guarded() {
    // The list injector targets the latest real user turn and refuses to
    // append the same text twice.
    let mut parsed = RequestBody::parse(&chat_body()).unwrap();
    let injection = "[dcp] prunable: #1 grep chars=27 estTokens=6";

    assert!(parsed.adapter_mut().inject_prunable_list(injection));
    assert!(!parsed.adapter_mut().inject_prunable_list(injection));

    let value = parsed.to_value().unwrap();
    let content = value["messages"][0]["content"].as_str().unwrap();
    assert_eq!(content.matches("prunable:").count(), 1);
    assert!(content.starts_with("find the bug"));
}
