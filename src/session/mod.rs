//! Streaming sessions against the orchestration runtime.
//!
//! This module provides the event model, the external call seam, the
//! aggregator that folds a stream into one response, and the runner that
//! ties a call to the interaction log.

pub mod aggregator;
pub mod events;
pub mod orchestrator;
pub mod runner;

pub use orchestrator::{ClaudeCli, Orchestrator, OrchestratorError, QueryOptions, QueryRequest};
pub use runner::SessionRunner;
