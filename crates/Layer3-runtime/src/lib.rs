//! # dcp-runtime
//!
//! Runtime layer for DCP:
//! - Registry: session-keyed prune state with snapshot rehydration
//! - Pipeline: per-request body rewrite (cache, track, nudge, replace)
//! - Ops: prune/distill operations exposed to the model as tools
//! - Command: plain-text command surface (context / stats / sweep)
//!
//! This layer owns all mutable state. The engine and the adapters stay
//! pure; everything session-scoped flows through [`SessionRegistry`].

pub mod command;
pub mod ops;
pub mod pipeline;
pub mod registry;

// ============================================================================
// Registry
// ============================================================================
pub use registry::SessionRegistry;

// ============================================================================
// Pipeline
// ============================================================================
pub use pipeline::{Processed, RequestPipeline};

// ============================================================================
// Ops
// ============================================================================
pub use ops::{
    distill_session, prune_session, run_distill, run_prune, DistillArgs, DistillReport,
    DistillTarget, PruneArgs, PruneReport,
};

// ============================================================================
// Command
// ============================================================================
pub use command::{resolve_session, run_command, Command};
