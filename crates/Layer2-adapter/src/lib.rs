//! # dcp-adapter
//!
//! Per-provider request body rewriting for DCP.
//! One capability contract, three wire formats.
//!
//! ## Features
//! - Shape detection decided once, dispatch on the tagged body after
//! - Typed bodies with flattened extras (unknown fields round-trip)
//! - In-place tool output replacement (all matches for an ID)
//! - Nudge and instruction injection with duplicate guards

pub mod body;
pub mod format;
pub mod formats;
pub mod tracker;

// Core types
pub use body::{RequestBody, WireFormat};
pub use format::{FormatAdapter, ToolOutputRef, SYNTH_PREFIX};

// Format implementations
pub use formats::chat::ChatBody;
pub use formats::gemini::GeminiBody;
pub use formats::responses::ResponsesBody;

// Nudge scheduling
pub use tracker::{crossed_nudge_boundary, NUDGE_TEXT};
