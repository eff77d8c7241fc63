//! Token estimation - 문자 수 기반 토큰 추정
//!
//! 토크나이저가 아닙니다. 결정적인 chars/4 휴리스틱으로,
//! 리포트와 통계의 추정치는 전부 이 함수를 거칩니다.

/// 문자 수 → 토큰 추정치
pub fn estimate_tokens(chars: usize) -> usize {
    chars / 4
}

/// 텍스트의 문자 수 (바이트 수 아님)
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// 텍스트 → 토큰 추정치
pub fn estimate_tokens_for(text: &str) -> usize {
    estimate_tokens(char_count(text))
}
