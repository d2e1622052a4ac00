//! cifcast - Dictionary-driven typing for mmCIF tabular records
//!
//! Tabular data extracted from mmCIF/PDBx documents arrives as untyped text cells.
//! A dictionary declares, per category and attribute, the logical type (string,
//! integer, float) and whether a value is mandatory. This crate casts every cell
//! to its declared type in place, normalizes the format's reserved missing-value
//! markers ('.' and '?'), and compares two typed tables with configurable
//! floating-point tolerances.

pub mod config;
pub mod error;
pub mod model;
pub mod typed;

pub use config::{CastOptions, CompareOptions};
pub use error::{Error, Result};
pub use model::{CellValue, DataType, SchemaResolver, Table};
pub use typed::TypedTable;
