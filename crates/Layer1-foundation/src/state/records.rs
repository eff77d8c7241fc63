//! 프루닝/증류 기록 타입

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// PrunedRecord - 프루닝 기록
// ============================================================================

/// 프루닝된 메시지 하나에 대한 기록
///
/// 메시지 ID를 키로 [`PruneState`](super::PruneState)에 저장됩니다.
/// 같은 ID를 다시 프루닝해도 기록은 덮어쓰지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrunedRecord {
    /// 프루닝 사유 ("manual", "sweep", "distilled" 등 자유 텍스트)
    pub reason: String,

    /// 프루닝 시점의 도구 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// 프루닝 시점의 내용 크기 (문자 수)
    pub chars: usize,

    /// 프루닝 시각
    pub at: DateTime<Utc>,

    /// 연결된 증류 기록 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distillation_id: Option<String>,
}

impl PrunedRecord {
    pub fn new(reason: impl Into<String>, tool_name: Option<String>, chars: usize) -> Self {
        Self {
            reason: reason.into(),
            tool_name,
            chars,
            at: Utc::now(),
            distillation_id: None,
        }
    }

    pub fn with_distillation(mut self, distillation_id: impl Into<String>) -> Self {
        self.distillation_id = Some(distillation_id.into());
        self
    }

    /// 프루닝된 내용을 대신하는 placeholder 문자열
    ///
    /// 형식은 외부 계약입니다: `[dcp-pruned id=<id> reason=<reason>]`,
    /// 증류가 연결되어 있으면 ` distilled=<id>`가 붙습니다.
    pub fn placeholder(&self, message_id: &str) -> String {
        match &self.distillation_id {
            Some(distillation_id) => format!(
                "[dcp-pruned id={} reason={} distilled={}]",
                message_id, self.reason, distillation_id
            ),
            None => format!("[dcp-pruned id={} reason={}]", message_id, self.reason),
        }
    }
}

// ============================================================================
// DistillationRecord - 증류 기록
// ============================================================================

/// 호출자가 제공한 요약 기록
///
/// 요약 텍스트는 이 레이어에서 생성하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistillationRecord {
    /// 생성 순서대로 부여되는 ID (`distill-1`, `distill-2`, ...) - 재사용 없음
    pub id: String,

    /// 요약의 출처 메시지 ID들
    pub source_message_ids: Vec<String>,

    /// 호출자 제공 요약 텍스트
    pub summary: String,

    /// 생성 시각
    pub at: DateTime<Utc>,
}

impl DistillationRecord {
    pub fn new(
        id: impl Into<String>,
        source_message_ids: Vec<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_message_ids,
            summary: summary.into(),
            at: Utc::now(),
        }
    }
}
