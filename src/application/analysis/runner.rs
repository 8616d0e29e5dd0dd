//! Analysis runner - resolves a transport request into an executed module.
//!
//! The HTTP layer hands over an [`ExecutionRequest`] whose `task_id` names a
//! prompt-test run. The runner parses the id, loads run metadata and results
//! through the [`RunResultStore`] port, builds the invocation context, and
//! executes via the [`ExecutionService`]. [`serialize_result`] shapes the
//! outcome for transport.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::execution::ExecutionService;
use crate::domain::analysis::{
    AnalysisContext, AnalysisError, AnalysisResult, ColumnMeta, ExecutionRequest, JsonMap, Row,
};
use crate::ports::{RunResultStore, RunStoreError};

/// Failures of the run-resolution pipeline.
///
/// Keeps run lookup and data loading distinguishable from module errors so
/// the transport layer can map each to its own status code.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunAnalysisError {
    /// Registry, validation, or handler failure.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// The referenced run does not exist.
    #[error("test run {task_id} does not exist")]
    TaskNotFound {
        /// Parsed run identifier.
        task_id: i64,
    },

    /// The task id is unparseable or the data could not be loaded.
    #[error("cannot load analysis data: {reason}")]
    DataLoad {
        /// What went wrong.
        reason: String,
    },
}

impl From<RunStoreError> for RunAnalysisError {
    fn from(err: RunStoreError) -> Self {
        RunAnalysisError::DataLoad {
            reason: err.to_string(),
        }
    }
}

/// Executes analysis modules against stored prompt-test runs.
pub struct AnalysisRunner {
    store: Arc<dyn RunResultStore>,
    execution: Arc<ExecutionService>,
}

impl AnalysisRunner {
    /// Creates a runner over a store and an execution service.
    pub fn new(store: Arc<dyn RunResultStore>, execution: Arc<ExecutionService>) -> Self {
        Self { store, execution }
    }

    /// Resolves the request's task id and executes the module against the
    /// run's result table.
    pub async fn execute_for_run(
        &self,
        request: &ExecutionRequest,
        user_id: Option<i64>,
    ) -> Result<AnalysisResult, RunAnalysisError> {
        let task_id = parse_task_id(&request.task_id)?;
        let run = self
            .store
            .get_run(task_id)
            .await?
            .ok_or(RunAnalysisError::TaskNotFound { task_id })?;
        let table = self.store.load_results(task_id).await?;

        debug!(
            task_id,
            module_id = %request.module_id,
            rows = table.len(),
            "resolved run for analysis"
        );

        let mut context = AnalysisContext::new(task_id.to_string())
            .with_metadata("test_run_id", json!(task_id))
            .with_metadata("module_id", json!(request.module_id))
            .with_metadata("row_count", json!(table.len()))
            .with_metadata("status", json!(run.status.as_str()));
        if let Some(user_id) = user_id {
            context = context.with_user_id(user_id);
        }

        Ok(self.execution.execute_now(&table, &context, request).await?)
    }
}

fn parse_task_id(raw: &str) -> Result<i64, RunAnalysisError> {
    raw.trim()
        .parse()
        .map_err(|_| RunAnalysisError::DataLoad {
            reason: format!("task id '{}' is not a valid run identifier", raw),
        })
}

/// Transport payload of an executed analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Module that produced the result.
    pub module_id: String,
    /// Result rows, nulls preserved.
    pub data: Vec<Row>,
    /// Display metadata of the result columns.
    pub columns_meta: Vec<ColumnMeta>,
    /// Insight sentences.
    pub insights: Vec<String>,
    /// Model usage, when the module called one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_usage: Option<JsonMap>,
    /// Protocol version of the result shape.
    pub protocol_version: String,
    /// Module-specific extension payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<JsonMap>,
}

/// Shapes an analysis result for the transport layer.
pub fn serialize_result(module_id: impl Into<String>, result: &AnalysisResult) -> AnalysisReport {
    AnalysisReport {
        module_id: module_id.into(),
        data: result.table.rows.clone(),
        columns_meta: result.columns_meta.clone(),
        insights: result.insights.clone(),
        llm_usage: result.llm_usage.clone(),
        protocol_version: result.protocol_version.clone(),
        extra: result.extra.clone(),
    }
}
