//! Parameter specifications and coercion for analysis modules.
//!
//! Modules declare the parameters they accept as [`ParameterSpec`] entries;
//! [`validate_parameters`] turns a raw, loosely typed parameter map into a
//! validated map matching those declarations. Unknown keys pass through
//! unchanged so older callers keep working against newer modules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dataset::JsonMap;
use super::definition::ModuleDefinition;
use super::errors::AnalysisError;

/// Declared type of a module parameter, used for form generation and
/// coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Free-form string.
    Text,
    /// Numeric value; numeric strings are parsed.
    Number,
    /// One of the declared `options`.
    Select,
    /// A regular-expression string.
    Regex,
}

/// Describes one user-supplied parameter of an analysis module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Key, unique within a module's parameter list.
    pub key: String,
    /// Display label for form rendering.
    pub label: String,
    /// Declared type driving coercion.
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    /// Whether the caller must supply a value (or a default must exist).
    pub required: bool,
    /// Default applied when the caller omits the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values for `Select` parameters; also usable as example values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    /// Hint text shown next to the form field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    /// Preset pattern for `Regex` parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_pattern: Option<String>,
}

impl ParameterSpec {
    /// Creates a spec of the given type; required by default.
    pub fn new(key: impl Into<String>, label: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            param_type,
            required: true,
            default: None,
            options: None,
            help_text: None,
            regex_pattern: None,
        }
    }

    /// Creates a text parameter.
    pub fn text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, ParameterType::Text)
    }

    /// Creates a number parameter.
    pub fn number(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, ParameterType::Number)
    }

    /// Creates a select parameter with its options.
    pub fn select(
        key: impl Into<String>,
        label: impl Into<String>,
        options: Vec<Value>,
    ) -> Self {
        let mut spec = Self::new(key, label, ParameterType::Select);
        spec.options = Some(options);
        spec
    }

    /// Creates a regex parameter.
    pub fn regex(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, ParameterType::Regex)
    }

    /// Marks the parameter optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets the help text.
    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    /// Sets the preset regex pattern.
    pub fn with_regex_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.regex_pattern = Some(pattern.into());
        self
    }
}

/// Validates a raw parameter map against a module's declared specs.
///
/// Declared keys come first in the output, in declaration order; keys the
/// module does not declare pass through unchanged after them. Missing
/// required parameters without defaults, and values that fail type coercion,
/// are rejected with an error naming the key.
pub fn validate_parameters(
    definition: &ModuleDefinition,
    raw: &JsonMap,
) -> Result<JsonMap, AnalysisError> {
    let mut validated = JsonMap::new();

    for spec in &definition.parameters {
        match raw.get(&spec.key).filter(|value| !value.is_null()) {
            None => {
                if let Some(default) = &spec.default {
                    validated.insert(spec.key.clone(), default.clone());
                } else if spec.required {
                    return Err(AnalysisError::missing_parameter(&spec.key));
                }
            }
            Some(value) => {
                validated.insert(spec.key.clone(), coerce(spec, value)?);
            }
        }
    }

    // Undeclared keys pass through for forward compatibility; declared keys
    // that resolved to "absent" stay absent.
    for (key, value) in raw {
        let declared = definition.parameters.iter().any(|spec| &spec.key == key);
        if !declared && !validated.contains_key(key) {
            validated.insert(key.clone(), value.clone());
        }
    }

    Ok(validated)
}

fn coerce(spec: &ParameterSpec, value: &Value) -> Result<Value, AnalysisError> {
    match spec.param_type {
        ParameterType::Number => coerce_number(spec, value),
        ParameterType::Regex => {
            if value.is_string() {
                Ok(value.clone())
            } else {
                Err(AnalysisError::invalid_parameter(
                    &spec.key,
                    "a regular-expression string",
                ))
            }
        }
        ParameterType::Select => {
            match spec.options.as_deref() {
                Some(options) if !options.is_empty() => {
                    if options.contains(value) {
                        Ok(value.clone())
                    } else {
                        Err(AnalysisError::invalid_parameter(
                            &spec.key,
                            "one of the declared options",
                        ))
                    }
                }
                // No options declared: nothing to check against.
                _ => Ok(value.clone()),
            }
        }
        ParameterType::Text => {
            if value.is_string() {
                Ok(value.clone())
            } else {
                Err(AnalysisError::invalid_parameter(&spec.key, "a string"))
            }
        }
    }
}

fn coerce_number(spec: &ParameterSpec, value: &Value) -> Result<Value, AnalysisError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) if !s.trim().is_empty() => {
            let parsed: f64 = s
                .trim()
                .parse()
                .map_err(|_| AnalysisError::invalid_parameter(&spec.key, "a numeric value"))?;
            if !parsed.is_finite() {
                return Err(AnalysisError::invalid_parameter(&spec.key, "a numeric value"));
            }
            serde_json::Number::from_f64(parsed)
                .map(Value::Number)
                .ok_or_else(|| AnalysisError::invalid_parameter(&spec.key, "a numeric value"))
        }
        _ => Err(AnalysisError::invalid_parameter(&spec.key, "a numeric value")),
    }
}
