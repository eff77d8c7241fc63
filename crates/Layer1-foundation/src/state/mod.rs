//! State - 세션 프루닝 상태
//!
//! - `records.rs` - 프루닝/증류 기록
//! - `session.rs` - 세션 상태, 통계, 인벤토리, 추적기

mod records;
mod session;

pub use records::{DistillationRecord, PrunedRecord};
pub use session::{
    Inventory, InventoryEntry, PersistedPrune, PersistedState, PruneState, PruneStats,
    SessionState, ToolParameterEntry, ToolTracker, ViewMapEntry,
};
