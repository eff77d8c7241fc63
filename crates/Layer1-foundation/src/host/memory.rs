//! 인메모리 참조 구현 (테스트/개발용)

use super::traits::{HostClient, NotificationSink, SessionInfo, StateStore};
use crate::message::Message;
use crate::state::PersistedState;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::RwLock;

// ============================================================================
// MemoryStateStore
// ============================================================================

/// 인메모리 세션 상태 저장소
#[derive(Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, PersistedState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_session_state(&self, session_id: &str) -> Result<Option<PersistedState>> {
        let states = self.states.read().await;
        Ok(states.get(session_id).cloned())
    }

    async fn save_session_state(&self, session_id: &str, state: &PersistedState) -> Result<()> {
        let mut states = self.states.write().await;
        states.insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

// ============================================================================
// StaticHostClient
// ============================================================================

/// 고정된 세션/메시지를 돌려주는 호스트 클라이언트
#[derive(Default)]
pub struct StaticHostClient {
    sessions: Vec<SessionInfo>,
    messages: HashMap<String, Vec<Message>>,
}

impl StaticHostClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, info: SessionInfo, messages: Vec<Message>) -> Self {
        self.messages.insert(info.id.clone(), messages);
        self.sessions.push(info);
        self
    }
}

#[async_trait]
impl HostClient for StaticHostClient {
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        Ok(self.sessions.clone())
    }

    async fn session_messages(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>> {
        let messages = self.messages.get(session_id).cloned().unwrap_or_default();
        match limit {
            Some(n) if n < messages.len() => {
                // 최근 n개
                Ok(messages[messages.len() - n..].to_vec())
            }
            _ => Ok(messages),
        }
    }
}

// ============================================================================
// RecordingSink
// ============================================================================

/// 알림을 기록만 하는 싱크
#[derive(Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, text: &str, _params: &Value) {
        self.notifications.lock().unwrap().push(text.to_string());
    }
}
