//! Per-invocation analysis context.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::dataset::JsonMap;
use crate::ports::ModelClient;

/// Ephemeral context handed to a handler for one invocation.
///
/// Carries the task identity, optional caller identity, free-form metadata,
/// and optionally injected collaborators. Never persisted; handlers own it
/// only for the duration of the call.
#[derive(Clone, Default)]
pub struct AnalysisContext {
    /// Test run the analysis refers to.
    pub task_id: String,
    /// User who triggered the analysis, when known.
    pub user_id: Option<i64>,
    /// Supplementary task information (row counts, run status, ...).
    pub metadata: JsonMap,
    /// Platform model client, injected only for `allow_llm` modules.
    pub model_client: Option<Arc<dyn ModelClient>>,
}

impl AnalysisContext {
    /// Creates a context for a task.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            user_id: None,
            metadata: JsonMap::new(),
            model_client: None,
        }
    }

    /// Sets the triggering user.
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Adds one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Injects the model client collaborator.
    pub fn with_model_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.model_client = Some(client);
        self
    }
}

impl fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("task_id", &self.task_id)
            .field("user_id", &self.user_id)
            .field("metadata", &self.metadata)
            .field("model_client", &self.model_client.is_some())
            .finish()
    }
}
