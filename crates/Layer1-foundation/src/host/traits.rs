//! 호스트 경계 trait 정의

use crate::message::Message;
use crate::state::PersistedState;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// StateStore - 세션 상태 저장소
// ============================================================================

/// 세션 상태 스냅샷 저장소
///
/// Layer3 이상에서 실제 저장 방식(파일, DB 등)을 구현합니다.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// 세션 스냅샷 로드 - 없으면 `Ok(None)`
    async fn load_session_state(&self, session_id: &str) -> Result<Option<PersistedState>>;

    /// 세션 스냅샷 저장
    async fn save_session_state(&self, session_id: &str, state: &PersistedState) -> Result<()>;
}

// ============================================================================
// HostClient - 호스트 전송 클라이언트
// ============================================================================

/// 세션 요약 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            updated_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// 호스트 런타임과의 통신 클라이언트
#[async_trait]
pub trait HostClient: Send + Sync {
    /// 세션 목록 조회
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>>;

    /// 세션의 메시지 조회 (limit이 있으면 최근 limit개)
    async fn session_messages(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>>;
}

// ============================================================================
// NotificationSink - 알림 싱크
// ============================================================================

/// 사용자 알림 싱크 (fire-and-forget)
pub trait NotificationSink: Send + Sync {
    /// 미리 포맷된 텍스트와 현재 요청 파라미터를 전달
    fn notify(&self, text: &str, params: &Value);
}
