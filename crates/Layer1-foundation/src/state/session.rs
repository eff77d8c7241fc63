//! 세션 단위 프루닝 상태

use super::records::{DistillationRecord, PrunedRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

// ============================================================================
// PruneState - 프루닝 기록 모음
// ============================================================================

/// 한 세션의 프루닝/증류 기록
///
/// 기록은 삽입 순서를 유지합니다. 같은 메시지 ID는 한 번만 기록됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneState {
    /// 메시지 ID → 프루닝 기록
    #[serde(default)]
    records: HashMap<String, PrunedRecord>,

    /// 프루닝된 순서
    #[serde(default)]
    order: Vec<String>,

    /// 증류 기록 (생성 순서)
    #[serde(default)]
    distillations: Vec<DistillationRecord>,

    /// 메시지 ID → 증류 ID 역링크
    #[serde(default)]
    distilled_by: HashMap<String, String>,

    /// 지금까지 만든 증류 개수 (ID는 재사용하지 않음)
    #[serde(default)]
    distillation_counter: u64,
}

impl PruneState {
    pub fn is_pruned(&self, message_id: &str) -> bool {
        self.records.contains_key(message_id)
    }

    pub fn record(&self, message_id: &str) -> Option<&PrunedRecord> {
        self.records.get(message_id)
    }

    /// 프루닝 기록 삽입
    ///
    /// 이미 기록된 ID면 `false`를 반환하고 기존 기록을 유지합니다.
    pub fn insert(&mut self, message_id: impl Into<String>, record: PrunedRecord) -> bool {
        let message_id = message_id.into();
        if self.records.contains_key(&message_id) {
            return false;
        }
        self.order.push(message_id.clone());
        self.records.insert(message_id, record);
        true
    }

    /// 프루닝된 메시지 ID들 (삽입 순서)
    pub fn pruned_ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 다음 증류 ID를 발급 (`distill-1`부터 시작, 단조 증가)
    pub fn next_distillation_id(&mut self) -> String {
        self.distillation_counter += 1;
        format!("distill-{}", self.distillation_counter)
    }

    /// 증류 기록 추가 + 출처 메시지 역링크 기록
    pub fn add_distillation(&mut self, record: DistillationRecord) {
        for source in &record.source_message_ids {
            self.distilled_by
                .insert(source.clone(), record.id.clone());
        }
        self.distillations.push(record);
    }

    pub fn distillation(&self, id: &str) -> Option<&DistillationRecord> {
        self.distillations.iter().find(|d| d.id == id)
    }

    /// 메시지가 어느 증류에 속하는지 조회
    pub fn distillation_for(&self, message_id: &str) -> Option<&str> {
        self.distilled_by.get(message_id).map(String::as_str)
    }

    pub fn distillations(&self) -> &[DistillationRecord] {
        &self.distillations
    }
}

// ============================================================================
// PruneStats - 누적 통계
// ============================================================================

/// 세션 누적 프루닝 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneStats {
    /// 프루닝된 메시지 수
    pub pruned_messages: u64,

    /// 프루닝된 문자 수
    pub pruned_chars: u64,

    /// 실행된 sweep 횟수 (실제로 뭔가 프루닝된 경우만)
    pub sweeps: u64,
}

impl PruneStats {
    pub fn record_prune(&mut self, chars: usize) {
        self.pruned_messages += 1;
        self.pruned_chars += chars as u64;
    }

    pub fn record_sweep(&mut self) {
        self.sweeps += 1;
    }

    /// 절약된 토큰 추정치
    pub fn est_tokens_saved(&self) -> u64 {
        crate::tokens::estimate_tokens(self.pruned_chars as usize) as u64
    }
}

// ============================================================================
// ToolParameterEntry - 도구 호출 메타데이터 캐시
// ============================================================================

/// 도구 호출 하나의 메타데이터
///
/// chat-completions 형식은 결과 메시지에 도구 이름이 없어서,
/// 호출 시점에 캐시해 둔 이 항목으로 이름을 복원합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolParameterEntry {
    /// 도구 이름
    pub tool_name: String,

    /// 호출 인자
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    /// 실행 상태
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// 에러 메시지 (실패 시)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolParameterEntry {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters: None,
            status: None,
            error: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

// ============================================================================
// Inventory - 프루닝 가능 목록 캐시
// ============================================================================

/// 프루닝 가능 목록의 항목 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    /// 호출자에게 노출되는 번호 ("1", "2", ...)
    pub numeric_id: String,

    /// 실제 메시지 ID
    pub message_id: String,

    /// 도구 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// 내용 크기 (문자 수)
    pub chars: usize,
}

/// 번호 붙은 프루닝 가능 목록
///
/// signature가 같으면 번호는 안정적으로 유지됩니다. 목록이 바뀌면
/// 전체를 "1"부터 다시 매깁니다 - 이전 번호를 들고 있던 호출자는
/// 번호가 달라질 수 있습니다. 의도된 단순화입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub entries: Vec<InventoryEntry>,

    /// `messageID:chars` 쌍을 이어 붙인 변경 감지용 서명
    pub signature: String,
}

impl Inventory {
    /// 번호로 항목 조회
    pub fn lookup(&self, numeric_id: &str) -> Option<&InventoryEntry> {
        self.entries.iter().find(|e| e.numeric_id == numeric_id)
    }

    pub fn total_chars(&self) -> usize {
        self.entries.iter().map(|e| e.chars).sum()
    }
}

// ============================================================================
// ToolTracker - 도구 결과 관측 추적
// ============================================================================

/// 요청을 가로질러 처음 보는 도구 결과를 세는 추적기
///
/// ID는 소문자로 정규화해 저장합니다. 네이티브 call ID가 없는 형식은
/// `{format}:{name}:{ordinal}` 형태의 합성 ID를 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolTracker {
    /// 지금까지 본 도구 결과 ID들
    seen: HashSet<String>,

    /// 누적 관측 수 (단조 증가)
    count: u64,
}

impl ToolTracker {
    /// 도구 결과 ID 관측 - 처음 보는 ID면 `true`
    pub fn observe(&mut self, id: &str) -> bool {
        if self.seen.insert(id.to_lowercase()) {
            self.count += 1;
            true
        } else {
            false
        }
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(&id.to_lowercase())
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

// ============================================================================
// SessionState - 세션 상태
// ============================================================================

/// 변환된 뷰의 진단용 ID 매핑 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMapEntry {
    /// 변환된 뷰에서의 메시지 ID (현재 구현은 원본과 동일)
    pub transformed_id: String,

    /// 프루닝 여부
    pub pruned: bool,
}

/// 한 채팅 세션의 전체 프루닝 상태
///
/// 활성 세션이 바뀌면 새로 만들어지고, 저장소에 스냅샷이 있으면
/// 거기서 복원됩니다. reset 시 세션 ID만 남기고 비웁니다.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// 세션 ID
    pub session_id: String,

    /// 프루닝/증류 기록
    pub prune: PruneState,

    /// 누적 통계
    pub stats: PruneStats,

    /// 소문자화된 도구 호출 ID → 메타데이터
    pub tool_parameters: HashMap<String, ToolParameterEntry>,

    /// 프루닝 가능 목록 캐시
    pub inventory: Option<Inventory>,

    /// 도구 결과 추적기
    pub tracker: ToolTracker,

    /// 원본 ID → 변환 뷰 정보 (진단용)
    pub view_map: HashMap<String, ViewMapEntry>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            prune: PruneState::default(),
            stats: PruneStats::default(),
            tool_parameters: HashMap::new(),
            inventory: None,
            tracker: ToolTracker::default(),
            view_map: HashMap::new(),
        }
    }

    /// 저장된 스냅샷에서 복원
    ///
    /// 스냅샷은 프루닝된 ID 목록과 통계만 담으므로, 복원된 기록의
    /// 사유는 "restored"가 됩니다.
    pub fn from_persisted(session_id: impl Into<String>, persisted: PersistedState) -> Self {
        let mut state = Self::new(session_id);
        for tool_id in persisted.prune.tool_ids {
            state
                .prune
                .insert(tool_id, PrunedRecord::new("restored", None, 0));
        }
        state.stats = persisted.stats;
        state
    }

    /// 저장용 스냅샷 생성
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            prune: PersistedPrune {
                tool_ids: self.prune.pruned_ids().to_vec(),
            },
            stats: self.stats,
        }
    }

    /// 세션 ID만 남기고 전부 초기화
    pub fn reset(&mut self) {
        let session_id = std::mem::take(&mut self.session_id);
        *self = Self::new(session_id);
    }

    /// 도구 호출 메타데이터 캐시 (키는 소문자로 정규화)
    pub fn cache_tool_parameter(&mut self, call_id: &str, entry: ToolParameterEntry) {
        self.tool_parameters.insert(call_id.to_lowercase(), entry);
    }

    pub fn tool_parameter(&self, call_id: &str) -> Option<&ToolParameterEntry> {
        self.tool_parameters.get(&call_id.to_lowercase())
    }
}

// ============================================================================
// PersistedState - 저장소 스냅샷
// ============================================================================

/// 저장소에 기록되는 프루닝 ID 목록
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPrune {
    #[serde(default)]
    pub tool_ids: Vec<String>,
}

/// 세션 상태의 저장용 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub prune: PersistedPrune,

    #[serde(default)]
    pub stats: PruneStats,
}
