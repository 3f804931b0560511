//! warmtoon turns a short personal narrative into a four-panel healing comic
//! by orchestrating Gemini: one script-synthesis call that plots the panels,
//! then one rate-limited image-synthesis call per panel, retried and published
//! incrementally.
//!
//! The interesting part lives in [`core`]: the run state machine
//! ([`core::orchestrator`]), the sequential per-panel retry pipeline
//! ([`core::pipeline`]), the error classifier ([`core::classify`]) and the
//! backoff policy ([`core::retry`]). The CLI in [`cli`] is a thin front end
//! that renders run snapshots and writes finished panels to disk.

pub mod cli;
pub mod core;
pub mod logging;
