//! Host - 호스트 런타임 경계 인터페이스
//!
//! 세션 저장소, 호스트 전송 클라이언트, 알림 싱크는 외부 협력자입니다.
//! 여기서는 trait만 정의하고, 테스트용 인메모리 구현을 함께 제공합니다.
//!
//! 호출자 규약: 전송/저장 실패는 치명적 에러로 전파하지 않고
//! "이전 상태 없음" / "빈 결과"로 격하해서 진행합니다.

mod memory;
mod traits;

pub use memory::{MemoryStateStore, RecordingSink, StaticHostClient};
pub use traits::{HostClient, NotificationSink, SessionInfo, StateStore};
