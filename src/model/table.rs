//! Cell values and raw table storage

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reserved marker for a value that is not applicable (mandatory attributes)
pub const INAPPLICABLE: &str = ".";

/// Reserved marker for a value that is unknown (optional attributes)
pub const UNKNOWN: &str = "?";

/// One field of a tabular record.
///
/// Cells start life as `Text` (or `Null` when the field is absent) and are
/// rewritten in place by the typing pass. The reserved markers '.' and '?'
/// stay `Text` cells even in integer and float columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            // Cross-type numeric comparison
            (CellValue::Int(a), CellValue::Float(b)) => (*a as f64) == *b,
            (CellValue::Float(a), CellValue::Int(b)) => *a == (*b as f64),
            _ => false,
        }
    }
}

impl CellValue {
    /// Build a cell from one raw text field; `None` models an absent field
    pub fn from_text(raw: Option<&str>) -> Self {
        match raw {
            Some(s) => CellValue::Text(s.to_string()),
            None => CellValue::Null,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Check if the cell holds one of the reserved markers '.' or '?'
    pub fn is_reserved_marker(&self) -> bool {
        matches!(self, CellValue::Text(s) if s == INAPPLICABLE || s == UNKNOWN)
    }

    /// Ordering helper for order-insensitive value-list comparison.
    ///
    /// Total within a typed column (one variant plus substitutes); incomparable
    /// variants fall back to a stable discriminant order.
    pub fn sort_cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Float(a), CellValue::Float(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (CellValue::Null, CellValue::Null) => Ordering::Equal,
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Int(_) => 1,
            CellValue::Float(_) => 2,
            CellValue::Text(_) => 3,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => write!(f, "{}", UNKNOWN),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

/// One tabular category: a name, an ordered unique attribute list, and rows
/// aligned positionally with the attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Category name, e.g. `atom_site`
    pub name: String,
    /// Attribute (column) names in declaration order
    pub attributes: Vec<String>,
    /// Row storage; every row has exactly `attributes.len()` cells
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Create an empty table, rejecting duplicate attribute names
    pub fn new(name: impl Into<String>, attributes: Vec<String>) -> Result<Self> {
        for (i, at_name) in attributes.iter().enumerate() {
            if attributes[..i].contains(at_name) {
                return Err(Error::DuplicateAttribute {
                    name: at_name.clone(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            attributes,
            rows: Vec::new(),
        })
    }

    /// Append a row, enforcing the attribute-count invariant
    pub fn push_row(&mut self, cells: Vec<CellValue>) -> Result<()> {
        if cells.len() != self.attributes.len() {
            return Err(Error::RowLength {
                expected: self.attributes.len(),
                got: cells.len(),
            });
        }
        self.rows.push(cells);
        Ok(())
    }

    /// Append a row of raw text fields; `None` entries become null cells
    pub fn push_text_row(&mut self, fields: Vec<Option<&str>>) -> Result<()> {
        self.push_row(fields.into_iter().map(CellValue::from_text).collect())
    }

    /// Get attribute index by name
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == name)
    }

    /// Check whether the table declares an attribute
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_index(name).is_some()
    }

    /// Full value list for one attribute, in row order
    pub fn attribute_values(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.attribute_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of attributes
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}
