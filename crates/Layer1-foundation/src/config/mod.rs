//! Config - 프루닝 설정 관리
//!
//! 잘못된 설정 값은 거부하지 않고 기본값으로 흡수합니다.
//! 설정 파싱 실패가 요청 파이프라인을 멈추는 일은 없어야 합니다.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

// ============================================================================
// PruneConfig - 프루닝 설정
// ============================================================================

/// DCP 프루닝 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneConfig {
    // ========================================================================
    // 일반 설정
    // ========================================================================
    /// 프루닝 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,

    // ========================================================================
    // Nudge 설정
    // ========================================================================
    /// 새 도구 결과 N개마다 정리 리마인더 삽입 (0이면 비활성화)
    #[serde(default = "default_nudge_frequency")]
    pub nudge_frequency: u64,

    // ========================================================================
    // 매칭 설정
    // ========================================================================
    /// fuzzy 매칭 최소 점수 (0-100)
    #[serde(default = "default_min_match_score")]
    pub min_match_score: u32,

    /// 1위 매칭이 2위를 앞서야 하는 최소 점수 차
    #[serde(default = "default_min_score_gap")]
    pub min_score_gap: u32,

    // ========================================================================
    // 보호 설정
    // ========================================================================
    /// 프루닝 대상에서 제외할 도구 이름들 (대소문자 무시)
    #[serde(default)]
    pub protected_tools: Vec<String>,

    /// 프루닝 대상에서 제외할 파일 경로 glob 패턴들
    #[serde(default)]
    pub protected_file_patterns: Vec<String>,

    // ========================================================================
    // Sweep 설정
    // ========================================================================
    /// sweep 시 기본 개수 제한 (없으면 전부)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sweep_limit: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_nudge_frequency() -> u64 {
    5
}

fn default_min_match_score() -> u32 {
    95
}

fn default_min_score_gap() -> u32 {
    15
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            nudge_frequency: default_nudge_frequency(),
            min_match_score: default_min_match_score(),
            min_score_gap: default_min_score_gap(),
            protected_tools: Vec::new(),
            protected_file_patterns: Vec::new(),
            default_sweep_limit: None,
        }
    }
}

impl PruneConfig {
    /// JSON 값에서 설정을 복원
    ///
    /// 필드 단위로 복원하며, 형식이 잘못된 필드는 경고 후 기본값을 사용합니다.
    /// 알 수 없는 필드는 무시합니다.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            if !value.is_null() {
                warn!("prune config is not an object, using defaults");
            }
            return Self::default();
        };

        Self {
            enabled: field_or(obj, "enabled", default_true()),
            nudge_frequency: field_or(obj, "nudgeFrequency", default_nudge_frequency()),
            min_match_score: field_or(obj, "minMatchScore", default_min_match_score()),
            min_score_gap: field_or(obj, "minScoreGap", default_min_score_gap()),
            protected_tools: field_or(obj, "protectedTools", Vec::new()),
            protected_file_patterns: field_or(obj, "protectedFilePatterns", Vec::new()),
            default_sweep_limit: field_or(obj, "defaultSweepLimit", None),
        }
    }

    /// 도구 이름이 보호 목록에 있는지 확인 (대소문자 무시)
    pub fn is_protected_tool(&self, name: &str) -> bool {
        self.protected_tools
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }
}

/// 단일 필드 복원 - 실패 시 경고 후 기본값 유지
fn field_or<T: serde::de::DeserializeOwned>(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    default: T,
) -> T {
    match obj.get(key) {
        None | Some(Value::Null) => default,
        Some(v) => match serde_json::from_value(v.clone()) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(field = key, "malformed config field, using default");
                default
            }
        },
    }
}
