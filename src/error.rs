//! Error types for typing and comparison operations

use thiserror::Error;

use crate::model::CellValue;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by table construction, typing, and comparison
#[derive(Debug, Error)]
pub enum Error {
    /// A typing operation needs dictionary metadata but no resolver was injected
    #[error("no schema resolver available for category '{category}'")]
    MissingResolver { category: String },

    /// The schema resolver could not classify an attribute
    #[error("dictionary lookup failed for item '_{category}.{attribute}'")]
    UnknownItem { category: String, attribute: String },

    /// A row does not match the table's attribute count
    #[error("row has {got} cells, expected {expected}")]
    RowLength { expected: usize, got: usize },

    /// An attribute name appears more than once in a table definition
    #[error("duplicate attribute '{name}'")]
    DuplicateAttribute { name: String },

    /// The closeness predicate was invoked on an incomparable pair of values.
    /// Deliberately distinct from "not equal": conflating the two would mask
    /// corrupted data as a plain mismatch.
    #[error("cannot compare {left} with {right}")]
    Incomparable { left: CellValue, right: CellValue },
}
