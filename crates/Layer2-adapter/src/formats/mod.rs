//! Wire format implementations

pub mod chat;
pub mod gemini;
pub mod responses;
