//! Error types for DCP
//!
//! 모든 에러를 중앙에서 관리
//!
//! 매칭 실패(AmbiguousMatch/NotFound)만 사용자에게 행동을 요구하는 에러입니다.
//! 미해결 ID나 보호된 대상은 에러가 아니라 결과 필드로 보고됩니다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// DCP 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 매칭 관련
    // ========================================================================
    /// 검색어가 두 개 이상의 메시지에 일치 - 호출자가 더 구체적인 문맥을 줘야 함
    #[error("Ambiguous match for \"{query}\": {n} candidates, add more context", n = .candidates.len())]
    AmbiguousMatch {
        query: String,
        /// 일치한 메시지 ID들 (점수 내림차순)
        candidates: Vec<String>,
    },

    /// 검색어가 어떤 메시지에도 일치하지 않음
    #[error("No message matches \"{query}\"")]
    NotFound { query: String },

    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 호스트 통신 관련
    // ========================================================================
    #[error("Transport error: {0}")]
    Transport(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::AmbiguousMatch { .. } | Error::NotFound { .. } | Error::InvalidInput(_)
        )
    }

    /// 호출자가 무시하고 빈 결과로 진행해도 되는 에러인지 확인
    ///
    /// 전송/저장 실패는 프루닝 결정을 막지 않습니다.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Storage(_))
    }

    /// AmbiguousMatch 생성 헬퍼
    pub fn ambiguous(query: impl Into<String>, candidates: Vec<String>) -> Self {
        Error::AmbiguousMatch {
            query: query.into(),
            candidates,
        }
    }

    /// NotFound 생성 헬퍼
    pub fn not_found(query: impl Into<String>) -> Self {
        Error::NotFound {
            query: query.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
