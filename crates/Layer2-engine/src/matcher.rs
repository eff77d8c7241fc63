//! Match resolver - find exactly one anchor message for a search string
//!
//! Two-stage exact-then-fuzzy search with a winner-must-dominate rule.
//! The final message of the sequence is held back as a last-resort pool so
//! that the text the agent just produced does not shadow earlier anchors.

use crate::extract::searchable_text;
use dcp_foundation::{Error, Message, PruneConfig, Result};
use tracing::debug;

/// How the anchor was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Unique exact substring hit
    Exact,
    /// Fuzzy score winner with sufficient lead
    Fuzzy,
    /// Exact hit in the held-back final message
    LastResort,
}

/// A uniquely resolved anchor message
#[derive(Debug, Clone, Copy)]
pub struct MatchResolution<'a> {
    pub message: &'a Message,
    pub index: usize,
    /// 0-100; exact hits score 100
    pub score: u32,
    pub strategy: MatchStrategy,
}

/// Resolve a search string to exactly one message.
///
/// Exact substring search runs first over every message except the last.
/// One hit wins outright; several hits fail with [`Error::AmbiguousMatch`].
/// With no exact hit, fuzzy partial-ratio scores are computed and the top
/// score must both clear `min_match_score` and lead the runner-up by
/// `min_score_gap`. The last message is only consulted once everything
/// else has failed, and only for an exact hit.
pub fn resolve_anchor<'a>(
    messages: &'a [Message],
    query: &str,
    config: &PruneConfig,
) -> Result<MatchResolution<'a>> {
    if query.is_empty() {
        return Err(Error::InvalidInput("empty search string".into()));
    }
    if messages.is_empty() {
        return Err(Error::not_found(query));
    }

    let searchable_len = messages.len() - 1;
    let texts: Vec<String> = messages[..searchable_len]
        .iter()
        .map(searchable_text)
        .collect();

    // Stage 1: exact substring over the searchable pool
    let exact_hits: Vec<usize> = texts
        .iter()
        .enumerate()
        .filter(|(_, text)| text.contains(query))
        .map(|(i, _)| i)
        .collect();

    match exact_hits.len() {
        1 => {
            let index = exact_hits[0];
            debug!(index, "anchor resolved by exact match");
            return Ok(MatchResolution {
                message: &messages[index],
                index,
                score: 100,
                strategy: MatchStrategy::Exact,
            });
        }
        n if n > 1 => {
            let candidates = exact_hits
                .iter()
                .map(|&i| messages[i].id.clone())
                .collect();
            return Err(Error::ambiguous(query, candidates));
        }
        _ => {}
    }

    // Stage 2: fuzzy scoring, keep everything at or above the threshold
    let mut scored: Vec<(usize, u32)> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| (i, partial_ratio(query, text)))
        .filter(|&(_, score)| score >= config.min_match_score)
        .collect();

    if scored.is_empty() {
        // Stage 3: last-resort exact check against the held-back final message
        let last_index = messages.len() - 1;
        if searchable_text(&messages[last_index]).contains(query) {
            debug!(index = last_index, "anchor resolved in last-resort pool");
            return Ok(MatchResolution {
                message: &messages[last_index],
                index: last_index,
                score: 100,
                strategy: MatchStrategy::LastResort,
            });
        }
        return Err(Error::not_found(query));
    }

    scored.sort_by(|a, b| b.1.cmp(&a.1));

    if scored.len() > 1 {
        let lead = scored[0].1 - scored[1].1;
        if lead < config.min_score_gap {
            let candidates = scored.iter().map(|&(i, _)| messages[i].id.clone()).collect();
            return Err(Error::ambiguous(query, candidates));
        }
    }

    let (index, score) = scored[0];
    debug!(index, score, "anchor resolved by fuzzy match");
    Ok(MatchResolution {
        message: &messages[index],
        index,
        score,
        strategy: MatchStrategy::Fuzzy,
    })
}

/// Substring-aware fuzzy similarity in 0-100.
///
/// Scoring is case-insensitive. A needle contained verbatim in the haystack
/// scores 100; otherwise the best needle-sized window of the haystack is
/// scored by normalized edit distance, so the score decreases monotonically
/// with edit distance from the closest alignment.
pub fn partial_ratio(needle: &str, haystack: &str) -> u32 {
    if needle.is_empty() || haystack.is_empty() {
        return 0;
    }
    let needle = needle.to_lowercase();
    let haystack = haystack.to_lowercase();

    if haystack.contains(&needle) {
        return 100;
    }

    let needle_chars: Vec<char> = needle.chars().collect();
    let haystack_chars: Vec<char> = haystack.chars().collect();

    if needle_chars.len() >= haystack_chars.len() {
        return to_score(strsim::normalized_levenshtein(&needle, &haystack));
    }

    let window = needle_chars.len();
    let mut best = 0.0_f64;
    for start in 0..=(haystack_chars.len() - window) {
        let slice: String = haystack_chars[start..start + window].iter().collect();
        let similarity = strsim::normalized_levenshtein(&needle, &slice);
        if similarity > best {
            best = similarity;
            if best >= 1.0 {
                break;
            }
        }
    }
    to_score(best)
}

fn to_score(similarity: f64) -> u32 {
    (similarity * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(texts: &[&str]) -> Vec<Message> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Message::user(*text).with_id(format!("m{}", i + 1)))
            .collect()
    }

    #[test]
    fn test_partial_ratio_contained_is_100() {
        assert_eq!(partial_ratio("needle", "hay needle stack"), 100);
        assert_eq!(partial_ratio("NEEDLE", "hay needle stack"), 100);
    }

    #[test]
    fn test_partial_ratio_decreases_with_distance() {
        let close = partial_ratio("needle", "hay neexle stack");
        let far = partial_ratio("needle", "hay nxxxle stack");
        assert!(close < 100);
        assert!(far < close);
    }

    #[test]
    fn test_partial_ratio_empty_is_zero() {
        assert_eq!(partial_ratio("", "text"), 0);
        assert_eq!(partial_ratio("text", ""), 0);
    }

    #[test]
    fn test_exact_unique_hit_wins() {
        let messages = transcript(&[
            "the quick brown fox",
            "unique marker here",
            "something else",
            "last message",
        ]);
        let config = PruneConfig::default();
        let resolution = resolve_anchor(&messages, "unique marker", &config).unwrap();
        assert_eq!(resolution.index, 1);
        assert_eq!(resolution.strategy, MatchStrategy::Exact);
        assert_eq!(resolution.score, 100);
    }

    #[test]
    fn test_two_exact_hits_are_ambiguous() {
        let messages = transcript(&[
            "shared marker alpha",
            "shared marker beta",
            "noise",
            "last",
        ]);
        let config = PruneConfig::default();
        let err = resolve_anchor(&messages, "shared marker", &config).unwrap_err();
        match err {
            Error::AmbiguousMatch { candidates, .. } => {
                assert_eq!(candidates, vec!["m1", "m2"]);
            }
            other => panic!("expected AmbiguousMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_fuzzy_winner_with_clear_lead() {
        let messages = transcript(&[
            "cargo build finished with warnings in profile dev",
            "completely unrelated text about databases",
            "last message",
        ]);
        let config = PruneConfig::default();
        // one character off from an exact substring
        let resolution =
            resolve_anchor(&messages, "cargo build finixhed with warnings", &config).unwrap();
        assert_eq!(resolution.index, 0);
        assert_eq!(resolution.strategy, MatchStrategy::Fuzzy);
        assert!(resolution.score >= 95);
    }

    #[test]
    fn test_fuzzy_near_tie_is_ambiguous() {
        let messages = transcript(&[
            "grep result: 14 matches in src/lib.rs",
            "grep result: 14 matches in src/lib2.rs",
            "last message",
        ]);
        let config = PruneConfig::default();
        let err = resolve_anchor(&messages, "grep result: 14 matches in src/libX.rs", &config)
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousMatch { .. }));
    }

    #[test]
    fn test_last_message_is_last_resort_only() {
        let messages = transcript(&["alpha text", "beta text", "the target lives here"]);
        let config = PruneConfig::default();
        let resolution = resolve_anchor(&messages, "target lives", &config).unwrap();
        assert_eq!(resolution.index, 2);
        assert_eq!(resolution.strategy, MatchStrategy::LastResort);
    }

    #[test]
    fn test_not_found_anywhere() {
        let messages = transcript(&["alpha", "beta", "gamma"]);
        let config = PruneConfig::default();
        let err = resolve_anchor(&messages, "zzz does not exist zzz", &config).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_single_message_checked_as_last_resort() {
        let messages = transcript(&["only one message with a marker"]);
        let config = PruneConfig::default();
        let resolution = resolve_anchor(&messages, "a marker", &config).unwrap();
        assert_eq!(resolution.index, 0);
        assert_eq!(resolution.strategy, MatchStrategy::LastResort);
    }

    #[test]
    fn test_empty_inputs() {
        let config = PruneConfig::default();
        assert!(resolve_anchor(&[], "query", &config).is_err());
        let messages = transcript(&["text", "more"]);
        assert!(matches!(
            resolve_anchor(&messages, "", &config),
            Err(Error::InvalidInput(_))
        ));
    }
}
