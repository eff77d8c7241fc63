//! Message - 대화 메시지 모델
//!
//! 메시지는 호스트 에이전트 런타임이 생성합니다.
//! 이 레이어는 읽기와 주석(메타데이터) 추가만 합니다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ============================================================================
// Message Role - 메시지 역할
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
    System,
}

// ============================================================================
// Message Part - 메시지 내용 조각
// ============================================================================

/// 도구 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Running,
    Completed,
    Error,
}

/// 메시지 내용 조각
///
/// 호스트마다 part 구성이 다르므로 알 수 없는 타입은 `Unknown`으로 받습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessagePart {
    /// 일반 텍스트
    Text { text: String },

    /// 추론 텍스트
    Reasoning { text: String },

    /// 도구 호출 결과
    Tool {
        #[serde(skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
        status: ToolStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        input: Option<Value>,
    },

    /// 이전 대화 압축 요약
    Compaction { summary: String },

    /// 하위 태스크 요약
    Subtask {
        summary: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },

    /// 알 수 없는 part 타입 (무시됨)
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Message - 대화 메시지
// ============================================================================

/// 대화 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// 세션 내 고유 ID (도구 결과는 소문자화된 call ID를 그대로 사용)
    pub id: String,

    /// 역할
    pub role: MessageRole,

    /// 도구 이름 (도구 결과 메시지에만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// 내용 조각들
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,

    /// 도구 호출 인자 (파일 경로를 담을 수 있음)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    /// 직접 지정된 파일 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// 자유 형식 주석 (프루닝 메타데이터 포함)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Message {
    pub fn new(role: MessageRole) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4().simple()),
            role,
            tool_name: None,
            parts: Vec::new(),
            input: None,
            file_path: None,
            meta: Map::new(),
        }
    }

    /// user 메시지 생성
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User).with_part(MessagePart::Text { text: text.into() })
    }

    /// assistant 메시지 생성
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant).with_part(MessagePart::Text { text: text.into() })
    }

    /// 완료된 도구 결과 메시지 생성
    pub fn tool_output(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        let tool_name = tool_name.into();
        Self::new(MessageRole::Tool)
            .with_id(id)
            .with_tool_name(tool_name.clone())
            .with_part(MessagePart::Tool {
                tool: Some(tool_name),
                status: ToolStatus::Completed,
                output: Some(output.into()),
                error: None,
                input: None,
            })
    }

    /// 실패한 도구 결과 메시지 생성
    pub fn tool_error(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let tool_name = tool_name.into();
        Self::new(MessageRole::Tool)
            .with_id(id)
            .with_tool_name(tool_name.clone())
            .with_part(MessagePart::Tool {
                tool: Some(tool_name),
                status: ToolStatus::Error,
                output: None,
                error: Some(error.into()),
                input: None,
            })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    pub fn with_part(mut self, part: MessagePart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// user 역할 여부
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    /// 도구 결과 성격의 메시지 여부
    ///
    /// role이 tool이거나, 도구 이름이 붙어 있거나, tool part를 담고 있으면 해당.
    pub fn is_tool_like(&self) -> bool {
        self.role == MessageRole::Tool
            || self.tool_name.is_some()
            || self
                .parts
                .iter()
                .any(|p| matches!(p, MessagePart::Tool { .. }))
    }

    /// 메시지의 도구 이름 (직접 필드 → tool part 순서)
    pub fn effective_tool_name(&self) -> Option<&str> {
        if let Some(name) = self.tool_name.as_deref() {
            return Some(name);
        }
        self.parts.iter().find_map(|p| match p {
            MessagePart::Tool { tool, .. } => tool.as_deref(),
            _ => None,
        })
    }

    /// 메시지에서 추론한 파일 경로
    ///
    /// 직접 필드 → `input.filePath` → `input.path` 순서로 확인합니다.
    pub fn inferred_file_path(&self) -> Option<&str> {
        if let Some(path) = self.file_path.as_deref() {
            return Some(path);
        }
        let input = self.input.as_ref()?;
        input
            .get("filePath")
            .and_then(Value::as_str)
            .or_else(|| input.get("path").and_then(Value::as_str))
    }
}
