//! Core generation pipeline: domain types, error classification, retry
//! policy, the per-panel image pipeline and the orchestrator that owns the
//! run state machine.

pub mod classify;
pub mod comic;
pub mod gemini;
pub mod orchestrator;
pub mod pipeline;
pub mod retry;
pub mod run;

#[cfg(test)]
pub(crate) mod testing;
