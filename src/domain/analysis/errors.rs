//! Error types for the analysis module subsystem.

use thiserror::Error;

/// Errors raised by the analysis registry, parameter validation, and module
/// execution.
///
/// Registry errors (duplicate or unknown modules) are programmer/configuration
/// mistakes; parameter and column errors are expected user-input failures and
/// always name the offending key or columns. Module failures propagate from
/// handler internals unchanged.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// A module with the same id is already in the registry.
    #[error("module '{module_id}' is already registered")]
    AlreadyRegistered {
        /// Identifier of the conflicting module.
        module_id: String,
    },

    /// No module with this id is registered.
    #[error("module '{module_id}' is not registered")]
    UnknownModule {
        /// Identifier that failed the lookup.
        module_id: String,
    },

    /// A required parameter was omitted and has no default.
    #[error("missing required parameter '{key}'")]
    MissingParameter {
        /// Key of the missing parameter.
        key: String,
    },

    /// A supplied parameter value does not match its declared type.
    #[error("parameter '{key}' expects {expected}")]
    InvalidParameter {
        /// Key of the offending parameter.
        key: String,
        /// Human-readable description of the expected shape.
        expected: String,
    },

    /// The dataset lacks columns the module declared as required.
    #[error("dataset is missing required columns: {columns}")]
    MissingColumns {
        /// Comma-joined list of every missing column.
        columns: String,
    },

    /// A module definition failed construction-time validation.
    #[error("invalid module definition: {reason}")]
    InvalidDefinition {
        /// What was wrong with the definition.
        reason: String,
    },

    /// A handler failed while computing its result.
    #[error("module '{module_id}' failed: {message}")]
    ModuleFailed {
        /// Module whose handler raised the failure.
        module_id: String,
        /// Handler-supplied failure description.
        message: String,
    },

    /// A result payload could not be serialized.
    #[error("failed to serialize analysis payload: {0}")]
    Serialization(String),

    /// The execution service has been shut down.
    #[error("analysis execution service is stopped")]
    ServiceStopped,

    /// A scheduled job's worker terminated without delivering a result.
    #[error("analysis job '{job_id}' terminated without a result")]
    JobTerminated {
        /// Identifier of the lost job.
        job_id: String,
    },
}

impl AnalysisError {
    /// Creates an already-registered error.
    pub fn already_registered(module_id: impl Into<String>) -> Self {
        AnalysisError::AlreadyRegistered {
            module_id: module_id.into(),
        }
    }

    /// Creates an unknown-module error.
    pub fn unknown_module(module_id: impl Into<String>) -> Self {
        AnalysisError::UnknownModule {
            module_id: module_id.into(),
        }
    }

    /// Creates a missing-parameter error.
    pub fn missing_parameter(key: impl Into<String>) -> Self {
        AnalysisError::MissingParameter { key: key.into() }
    }

    /// Creates an invalid-parameter error.
    pub fn invalid_parameter(key: impl Into<String>, expected: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter {
            key: key.into(),
            expected: expected.into(),
        }
    }

    /// Creates a missing-columns error from the list of absent column names.
    pub fn missing_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let joined = columns
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>()
            .join(", ");
        AnalysisError::MissingColumns { columns: joined }
    }

    /// Creates an invalid-definition error.
    pub fn invalid_definition(reason: impl Into<String>) -> Self {
        AnalysisError::InvalidDefinition {
            reason: reason.into(),
        }
    }

    /// Creates a module-failed error.
    pub fn module_failed(module_id: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::ModuleFailed {
            module_id: module_id.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error stems from caller input rather than
    /// registry state or handler internals.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingParameter { .. }
                | AnalysisError::InvalidParameter { .. }
                | AnalysisError::MissingColumns { .. }
        )
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Serialization(err.to_string())
    }
}
