//! Test-unit identification and grouping.
//!
//! A "unit" is the grouping dimension for per-configuration statistics,
//! typically one model/parameter combination under test. Raw `unit_id` cells
//! arrive in whatever shape upstream storage produced (ints, floats, numeric
//! strings, free text, blanks); [`UnitKey::normalize`] collapses them to a
//! canonical key so equal identities land in the same group.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use super::super::dataset::DataTable;

/// Canonical unit identity.
///
/// Finite integral numbers collapse to `Int`; non-integral finite numbers
/// stay `Float`; everything textual that does not normalize to a number stays
/// `Text`. NaN and infinities never appear here, they fall back to the
/// caller-supplied default identity first.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitKey {
    /// Integral identity.
    Int(i64),
    /// Non-integral finite numeric identity.
    Float(f64),
    /// Textual identity, trimmed.
    Text(String),
}

// Float keys are always finite (NaN falls back before construction), so
// bit-pattern equality and hashing are sound.
impl Eq for UnitKey {}

impl Hash for UnitKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            UnitKey::Int(v) => {
                state.write_u8(0);
                v.hash(state);
            }
            UnitKey::Float(v) => {
                state.write_u8(1);
                v.to_bits().hash(state);
            }
            UnitKey::Text(v) => {
                state.write_u8(2);
                v.hash(state);
            }
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKey::Int(v) => write!(f, "{}", v),
            UnitKey::Float(v) => write!(f, "{}", v),
            UnitKey::Text(v) => write!(f, "{}", v),
        }
    }
}

impl UnitKey {
    /// Normalizes a raw grouping-key cell.
    ///
    /// Rules: integers pass through; NaN/infinite floats fall back to
    /// `fallback`; finite integral floats collapse to int; other finite
    /// floats stay floats; numeric strings parse and follow the float rules
    /// except that a non-integral parse keeps the original trimmed text;
    /// blank or missing values fall back. Non-scalar cells use their JSON
    /// rendering as text.
    pub fn normalize(value: Option<&Value>, fallback: i64) -> UnitKey {
        match value {
            None | Some(Value::Null) => UnitKey::Int(fallback),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    UnitKey::Int(i)
                } else {
                    Self::from_f64(n.as_f64().unwrap_or(f64::NAN), fallback)
                }
            }
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return UnitKey::Int(fallback);
                }
                match trimmed.parse::<f64>() {
                    Ok(parsed) if !parsed.is_finite() => UnitKey::Int(fallback),
                    Ok(parsed) if parsed.fract() == 0.0 && in_i64_range(parsed) => {
                        UnitKey::Int(parsed as i64)
                    }
                    // Numeric but non-integral: keep the caller's spelling.
                    Ok(_) => UnitKey::Text(trimmed.to_string()),
                    Err(_) => UnitKey::Text(trimmed.to_string()),
                }
            }
            Some(other) => UnitKey::Text(other.to_string()),
        }
    }

    fn from_f64(value: f64, fallback: i64) -> UnitKey {
        if !value.is_finite() {
            UnitKey::Int(fallback)
        } else if value.fract() == 0.0 && in_i64_range(value) {
            UnitKey::Int(value as i64)
        } else {
            UnitKey::Float(value)
        }
    }

    /// The key as a JSON value, for result rows and chart metadata.
    pub fn to_value(&self) -> Value {
        match self {
            UnitKey::Int(v) => Value::from(*v),
            UnitKey::Float(v) => {
                serde_json::Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null)
            }
            UnitKey::Text(v) => Value::from(v.clone()),
        }
    }
}

fn in_i64_range(value: f64) -> bool {
    value >= i64::MIN as f64 && value <= i64::MAX as f64
}

/// Trims a display cell; blank or missing cells yield the fallback.
pub fn display_text(value: Option<&Value>, fallback: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(Value::String(_)) => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}

/// One group of rows sharing a unit identity.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitGroup {
    /// Canonical identity.
    pub key: UnitKey,
    /// Display name: first-seen non-blank `unit_name`, else the key's text.
    pub name: String,
    /// Short positional label, `unit{N}` by first-encountered order.
    pub label: String,
    /// Indices of the group's rows in the source table.
    pub row_indices: Vec<usize>,
}

/// Groups a dataset's rows by test unit in first-encountered order.
///
/// `unit_id` drives grouping when present; with only `unit_name` the name
/// value is the identity; with neither, the whole dataset forms one implicit
/// unit (`unit_id = 1`, name `overall`). Rows whose id normalizes to the
/// fallback use their 1-based position, so unidentifiable rows become their
/// own positional units. Labels are assigned after grouping, purely by
/// enumeration order.
pub fn group_by_unit(table: &DataTable) -> Vec<UnitGroup> {
    let has_id = table.has_column("unit_id");
    let has_name = table.has_column("unit_name");

    let mut groups: Vec<UnitGroup> = Vec::new();
    let mut index_of: HashMap<UnitKey, usize> = HashMap::new();

    for (row_index, row) in table.rows.iter().enumerate() {
        let key = if has_id {
            UnitKey::normalize(row.get("unit_id"), row_index as i64 + 1)
        } else if has_name {
            UnitKey::normalize(row.get("unit_name"), row_index as i64 + 1)
        } else {
            UnitKey::Int(1)
        };

        match index_of.get(&key) {
            Some(&slot) => groups[slot].row_indices.push(row_index),
            None => {
                let name = if has_name {
                    display_text(row.get("unit_name"), &key.to_string())
                } else if has_id {
                    key.to_string()
                } else {
                    "overall".to_string()
                };
                index_of.insert(key.clone(), groups.len());
                groups.push(UnitGroup {
                    key,
                    name,
                    label: String::new(),
                    row_indices: vec![row_index],
                });
            }
        }
    }

    for (position, group) in groups.iter_mut().enumerate() {
        group.label = format!("unit{}", position + 1);
    }

    groups
}
