//! Data model for mmCIF tabular records

mod schema;
mod table;

pub use schema::{ColumnMeta, DataType, DictionaryResolver, ItemDef, SchemaResolver};
pub use table::{CellValue, Table, INAPPLICABLE, UNKNOWN};
