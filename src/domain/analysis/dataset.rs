//! Tabular result data passed into analysis modules.
//!
//! A [`DataTable`] is a plain ordered-column table with JSON-valued cells.
//! Modules treat the table as read-only input; anything they want to reshape
//! they copy first.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single row: column name to cell value, in column order.
pub type Row = serde_json::Map<String, Value>;

/// An open-ended string-keyed payload (result `extra`, context metadata).
pub type JsonMap = serde_json::Map<String, Value>;

/// Tabular dataset handed to analysis handlers.
///
/// Columns carry the declared order; rows may omit columns (missing cells read
/// as null). Cells are loosely typed JSON values so upstream storage can feed
/// numbers, strings, or nulls without a schema round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    /// Column names in declared order.
    pub columns: Vec<String>,
    /// Data rows; each row maps column names to cell values.
    pub rows: Vec<Row>,
}

impl DataTable {
    /// Creates an empty table with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Creates a table from pre-built rows.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Row>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true when a column with this name is declared.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// Appends a row.
    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Cell value at (row, column); `None` when the row omits the column.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

/// Parses a cell as a finite number.
///
/// JSON numbers pass through; strings are trimmed and parsed. Everything else
/// (null, booleans, containers, unparseable or non-finite text) is `None`,
/// mirroring a coercing numeric conversion that drops bad values.
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn new_table_is_empty() {
        let table = DataTable::new(["latency_ms", "tokens_used"]);
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert!(table.has_column("latency_ms"));
        assert!(!table.has_column("unit_id"));
    }

    #[test]
    fn cell_reads_by_position_and_name() {
        let mut table = DataTable::new(["latency_ms"]);
        table.push_row(row(&[("latency_ms", json!(120))]));

        assert_eq!(table.cell(0, "latency_ms"), Some(&json!(120)));
        assert_eq!(table.cell(0, "tokens_used"), None);
        assert_eq!(table.cell(1, "latency_ms"), None);
    }

    #[test]
    fn numeric_parses_numbers_and_numeric_strings() {
        assert_eq!(numeric(&json!(42)), Some(42.0));
        assert_eq!(numeric(&json!(1.5)), Some(1.5));
        assert_eq!(numeric(&json!("  120.5 ")), Some(120.5));
        assert_eq!(numeric(&json!("1e3")), Some(1000.0));
    }

    #[test]
    fn numeric_rejects_everything_else() {
        assert_eq!(numeric(&Value::Null), None);
        assert_eq!(numeric(&json!("")), None);
        assert_eq!(numeric(&json!("   ")), None);
        assert_eq!(numeric(&json!("abc")), None);
        assert_eq!(numeric(&json!("inf")), None);
        assert_eq!(numeric(&json!(true)), None);
        assert_eq!(numeric(&json!([1, 2])), None);
    }
}
