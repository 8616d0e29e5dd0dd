//! Analysis orchestration - execution service and run resolution.

pub mod execution;
pub mod runner;

pub use execution::{ExecutionService, ScheduledAnalysis, DEFAULT_WORKER_COUNT};
pub use runner::{serialize_result, AnalysisReport, AnalysisRunner, RunAnalysisError};
