//! Module definitions and execution requests.

use serde::{Deserialize, Serialize};

use super::dataset::JsonMap;
use super::errors::AnalysisError;
use super::parameters::ParameterSpec;

/// Protocol version stamped on definitions and results for forward
/// compatibility with the transport layer.
pub const PROTOCOL_VERSION: &str = "v1";

/// Registration-time description of an analysis module.
///
/// Definitions are immutable once registered; re-registering under the same
/// id installs a fresh definition rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Stable module identifier, `[A-Za-z0-9_-]+`.
    pub module_id: String,
    /// Display name.
    pub name: String,
    /// What the module computes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared user parameters, keys unique, in declaration order.
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Dataset columns that must exist before the handler runs.
    #[serde(default)]
    pub required_columns: Vec<String>,
    /// Tags for discovery and filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Protocol version the module speaks.
    pub protocol_version: String,
    /// Whether the module intends to call the platform model client.
    #[serde(default)]
    pub allow_llm: bool,
}

impl ModuleDefinition {
    /// Creates a definition, validating the module id.
    ///
    /// # Errors
    /// Returns [`AnalysisError::InvalidDefinition`] when the id is empty or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(module_id: impl Into<String>, name: impl Into<String>) -> Result<Self, AnalysisError> {
        let module_id = module_id.into();
        if !is_valid_module_id(&module_id) {
            return Err(AnalysisError::invalid_definition(format!(
                "module id '{}' must match [A-Za-z0-9_-]+",
                module_id
            )));
        }
        Ok(Self {
            module_id,
            name: name.into(),
            description: None,
            parameters: Vec::new(),
            required_columns: Vec::new(),
            tags: Vec::new(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            allow_llm: false,
        })
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the parameter specs, enforcing unique keys.
    ///
    /// # Errors
    /// Returns [`AnalysisError::InvalidDefinition`] when two specs share a key.
    pub fn with_parameters(mut self, parameters: Vec<ParameterSpec>) -> Result<Self, AnalysisError> {
        for (index, spec) in parameters.iter().enumerate() {
            if parameters[..index].iter().any(|other| other.key == spec.key) {
                return Err(AnalysisError::invalid_definition(format!(
                    "duplicate parameter key '{}'",
                    spec.key
                )));
            }
        }
        self.parameters = parameters;
        Ok(self)
    }

    /// Sets the required dataset columns.
    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the discovery tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the module as a model-client consumer.
    pub fn with_allow_llm(mut self, allow_llm: bool) -> Self {
        self.allow_llm = allow_llm;
        self
    }
}

fn is_valid_module_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Transport request to execute one module against one test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Target module id.
    pub module_id: String,
    /// Test run the analysis refers to, as supplied by the caller.
    pub task_id: String,
    /// Raw user-supplied parameters.
    #[serde(default)]
    pub parameters: JsonMap,
}

impl ExecutionRequest {
    /// Creates a request without parameters.
    pub fn new(module_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            task_id: task_id.into(),
            parameters: JsonMap::new(),
        }
    }

    /// Adds one raw parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}
