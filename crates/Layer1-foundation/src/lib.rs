//! # dcp-foundation
//!
//! Foundation layer for DCP:
//! - Message: 대화 메시지 모델 (호스트가 생성, 여기서는 읽기만)
//! - State: 세션별 프루닝 기록, 증류, 통계, 인벤토리 캐시
//! - Config: 프루닝 설정 (형식이 잘못된 값은 기본값으로 흡수)
//! - Host: 저장소/전송/알림 경계 trait + 인메모리 구현
//! - Tokens: chars/4 토큰 추정 휴리스틱
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Layer3-runtime (세션 레지스트리, 요청 파이프라인)        │
//! │          │                          │                   │
//! │          ▼                          ▼                   │
//! │  Layer2-engine              Layer2-adapter              │
//! │  (매칭/보호/프루닝/뷰)      (와이어 형식별 어댑터)        │
//! │          │                          │                   │
//! │          └──────────┬───────────────┘                   │
//! │                     ▼                                   │
//! │  Layer1-foundation (이 레이어)                           │
//! │  (메시지 모델, 세션 상태, 설정, 호스트 경계)              │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod message;
pub mod state;
pub mod tokens;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Message (대화 메시지 모델)
// ============================================================================
pub use message::{Message, MessagePart, MessageRole, ToolStatus};

// ============================================================================
// State (세션 프루닝 상태)
// ============================================================================
pub use state::{
    // Records (records.rs)
    DistillationRecord,
    PrunedRecord,
    // Session state (session.rs)
    Inventory,
    InventoryEntry,
    PersistedPrune,
    PersistedState,
    PruneState,
    PruneStats,
    SessionState,
    ToolParameterEntry,
    ToolTracker,
    ViewMapEntry,
};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::PruneConfig;

// ============================================================================
// Host (호스트 경계)
// ============================================================================
pub use host::{
    // Traits (traits.rs)
    HostClient,
    NotificationSink,
    SessionInfo,
    StateStore,
    // 인메모리 구현 (memory.rs)
    MemoryStateStore,
    RecordingSink,
    StaticHostClient,
};

// ============================================================================
// Tokens (토큰 추정)
// ============================================================================
pub use tokens::{char_count, estimate_tokens, estimate_tokens_for};
