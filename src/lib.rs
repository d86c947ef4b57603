//! tracescope: a terminal viewer for autonomous agent execution traces.
//!
//! A trace records one task execution of an agent: the main message history,
//! any sub-agent sessions it spawned, a step log of lifecycle events, and the
//! final outcome. Traces live as JSON files in a benchmark → configuration →
//! task directory hierarchy. This crate discovers them, normalizes one into a
//! typed model, reconstructs a single interleaved timeline across the main
//! session and its sub-agents, and derives analytics for display.

pub mod app;
pub mod events;
pub mod loader;
pub mod store;
pub mod trace;
