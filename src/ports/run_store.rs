//! Run Result Store Port - Interface for loading prompt-test run data.
//!
//! The persistence layer (ORM, migrations, connection pooling) is an external
//! collaborator; this port is the seam through which the analysis runner
//! resolves a task id into run metadata and a result table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::analysis::DataTable;

/// Canonical columns of a run's result table, in load order. Stores may
/// append further columns (e.g. `unit_id`, `unit_name`) after these.
pub const RESULT_COLUMNS: &[&str] = &[
    "result_id",
    "test_run_id",
    "run_index",
    "latency_ms",
    "tokens_used",
    "created_at",
];

/// Lifecycle state of a prompt-test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Queued, not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Finished with results.
    Completed,
    /// Aborted by an error.
    Failed,
}

impl RunStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Metadata of one prompt-test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunRecord {
    /// Numeric run identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Lifecycle state.
    pub status: RunStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TestRunRecord {
    /// Creates a run record.
    pub fn new(id: i64, name: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id,
            name: name.into(),
            status,
            created_at: Utc::now(),
        }
    }
}

/// Errors raised by run stores.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunStoreError {
    /// The storage backend failed.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Port for resolving runs and loading their execution records.
#[async_trait]
pub trait RunResultStore: Send + Sync {
    /// Looks up run metadata; `None` when the run does not exist.
    async fn get_run(&self, run_id: i64) -> Result<Option<TestRunRecord>, RunStoreError>;

    /// Loads the run's execution records as a table.
    ///
    /// A run without records yields an empty table that still declares the
    /// canonical columns.
    async fn load_results(&self, run_id: i64) -> Result<DataTable, RunStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(RunStatus::Pending.as_str(), "pending");
        assert_eq!(RunStatus::Completed.as_str(), "completed");
        assert_eq!(
            serde_json::to_string(&RunStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn run_record_constructor() {
        let record = TestRunRecord::new(7, "baseline", RunStatus::Running);
        assert_eq!(record.id, 7);
        assert_eq!(record.status, RunStatus::Running);
    }
}
