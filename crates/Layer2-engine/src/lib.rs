//! # dcp-engine
//!
//! Pruning decision engine for DCP:
//! - Extract: flatten message parts into a searchable corpus
//! - Matcher: exact-then-fuzzy anchor resolution with ambiguity detection
//! - Protection: tool-name and file-glob exemptions
//! - Prune: idempotent prune-by-ids, last-user-boundary sweep, anchored sweep
//! - Inventory: numbered prunable list with signature-based caching
//! - Distill: caller-supplied summaries linked to their source messages
//! - View: non-destructive placeholder projection of the transcript
//!
//! The engine only records and projects decisions. Request-body rewriting
//! for the individual wire formats lives in `dcp-adapter`.

pub mod distill;
pub mod extract;
pub mod inventory;
pub mod matcher;
pub mod protection;
pub mod prune;
pub mod view;

// ============================================================================
// Extract
// ============================================================================
pub use extract::{content_chars, searchable_text};

// ============================================================================
// Matcher
// ============================================================================
pub use matcher::{partial_ratio, resolve_anchor, MatchResolution, MatchStrategy};

// ============================================================================
// Protection
// ============================================================================
pub use protection::{is_protected, is_protected_tool_name, BUILTIN_PROTECTED_TOOLS};

// ============================================================================
// Prune / Inventory / Distill
// ============================================================================
pub use distill::create_distillation;
pub use inventory::{prunable_inventory, resolve_inventory_ids, ResolvedInventoryIds};
pub use prune::{find_message, prune_by_ids, sweep, sweep_from, PruneOutcome, SweepOutcome};

// ============================================================================
// View
// ============================================================================
pub use view::{transformed_view, view_savings, ViewSavings};
