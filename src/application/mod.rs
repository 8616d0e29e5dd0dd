//! Application layer - orchestration over the domain and ports.
//!
//! Coordinates module execution: the bounded-pool execution service and the
//! runner that resolves stored prompt-test runs into analysis invocations.

pub mod analysis;

pub use analysis::{
    serialize_result, AnalysisReport, AnalysisRunner, ExecutionService, RunAnalysisError,
    ScheduledAnalysis, DEFAULT_WORKER_COUNT,
};
