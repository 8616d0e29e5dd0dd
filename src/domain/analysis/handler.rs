//! The capability interface implemented by analysis modules.

use async_trait::async_trait;

use super::context::AnalysisContext;
use super::dataset::{DataTable, JsonMap};
use super::errors::AnalysisError;
use super::result::AnalysisResult;

/// Executable logic bound to a module definition.
///
/// Implementations are pure with respect to their inputs: the dataset and
/// context are owned by the caller for the duration of the call and must be
/// copied before any reshaping. A handler must not hold shared mutable state
/// across invocations; concurrent executions of the same handler are the
/// norm.
///
/// Failures propagate to the caller unchanged; the execution service performs
/// no retries and no classification of handler errors.
#[async_trait]
pub trait AnalysisHandler: Send + Sync {
    /// Runs the module against a validated parameter map.
    ///
    /// `params` has already passed coercion against the module's declared
    /// specs; `table` has already been checked for the module's required
    /// columns.
    async fn execute(
        &self,
        table: &DataTable,
        params: &JsonMap,
        context: &AnalysisContext,
    ) -> Result<AnalysisResult, AnalysisError>;
}
