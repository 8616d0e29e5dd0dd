//! Analysis results and column display metadata.

use serde::{Deserialize, Serialize};

use super::dataset::{DataTable, JsonMap};
use super::definition::PROTOCOL_VERSION;

/// Display metadata for one column of a result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name; must match a column of the result table.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Extra explanation shown to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Chart kinds this column can drive, e.g. `["bar"]`.
    #[serde(default)]
    pub visualizable: Vec<String>,
    /// Renderer-specific extras.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<JsonMap>,
}

impl ColumnMeta {
    /// Creates metadata with no description and no chart kinds.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            description: None,
            visualizable: Vec::new(),
            extra: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares the chart kinds this column supports.
    pub fn visualizable_as<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visualizable = kinds.into_iter().map(Into::into).collect();
        self
    }
}

/// Output of one module invocation.
///
/// Built fresh per call; nothing here is shared between invocations. `extra`
/// is an open-ended string-keyed payload for module-specific data (chart
/// configs, structured insight details, ...) that downstream consumers read
/// without the core knowing its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Result data table.
    pub table: DataTable,
    /// Display metadata for the table's columns.
    #[serde(default)]
    pub columns_meta: Vec<ColumnMeta>,
    /// Natural-language findings, in emission order.
    #[serde(default)]
    pub insights: Vec<String>,
    /// Model-client resource usage, when the module called one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_usage: Option<JsonMap>,
    /// Protocol version of the result shape.
    pub protocol_version: String,
    /// Module-specific extension payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<JsonMap>,
}

impl AnalysisResult {
    /// Creates a result around a table, with the current protocol version.
    pub fn new(table: DataTable) -> Self {
        Self {
            table,
            columns_meta: Vec::new(),
            insights: Vec::new(),
            llm_usage: None,
            protocol_version: PROTOCOL_VERSION.to_string(),
            extra: None,
        }
    }

    /// Sets the column metadata.
    pub fn with_columns_meta(mut self, columns_meta: Vec<ColumnMeta>) -> Self {
        self.columns_meta = columns_meta;
        self
    }

    /// Sets the insight sentences.
    pub fn with_insights(mut self, insights: Vec<String>) -> Self {
        self.insights = insights;
        self
    }

    /// Sets the model usage report.
    pub fn with_llm_usage(mut self, usage: JsonMap) -> Self {
        self.llm_usage = Some(usage);
        self
    }

    /// Sets the extension payload.
    pub fn with_extra(mut self, extra: JsonMap) -> Self {
        self.extra = Some(extra);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_meta_builder() {
        let meta = ColumnMeta::new("avg_latency_ms", "Average latency (ms)")
            .with_description("Mean request latency")
            .visualizable_as(["bar"]);

        assert_eq!(meta.name, "avg_latency_ms");
        assert_eq!(meta.visualizable, vec!["bar".to_string()]);
    }

    #[test]
    fn result_defaults_to_current_protocol() {
        let result = AnalysisResult::new(DataTable::default());
        assert_eq!(result.protocol_version, PROTOCOL_VERSION);
        assert!(result.insights.is_empty());
        assert!(result.extra.is_none());
    }

    #[test]
    fn result_serializes_skipping_empty_options() {
        let result = AnalysisResult::new(DataTable::default());
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("llm_usage").is_none());
        assert!(value.get("extra").is_none());
        assert_eq!(value["protocol_version"], json!("v1"));
    }
}
