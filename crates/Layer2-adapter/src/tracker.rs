//! Nudge scheduling
//!
//! The session's tool tracker counts first-seen tool results. Every
//! `frequency` results, the pipeline appends a reminder to the request
//! so the model considers pruning what it no longer needs. The check is
//! a bucket comparison, so a burst of results that jumps several
//! buckets at once still yields a single nudge.

/// Reminder appended when a nudge threshold is crossed.
///
/// Starts with the synthetic-content prefix so injection passes never
/// treat a nudge turn as a real user turn.
pub const NUDGE_TEXT: &str = "[dcp] Several tool outputs have accumulated. Prune the ones you no \
                              longer need, or distill related outputs into a summary, to keep the \
                              context small.";

/// Whether the count advanced into a new nudge bucket.
///
/// `frequency` of zero disables nudging.
pub fn crossed_nudge_boundary(previous: u64, current: u64, frequency: u64) -> bool {
    frequency > 0 && current / frequency > previous / frequency
}
