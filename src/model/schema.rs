//! Dictionary-declared types and the schema resolver interface

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Logical data type declared by the dictionary for one attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Float,
}

impl DataType {
    /// Classify a dictionary type code and primitive code.
    ///
    /// An integer-family type code (anything containing "int") wins over the
    /// primitive; a numeric primitive ("numb") without an integer code is a
    /// float; everything else is a string.
    pub fn classify(type_code: &str, primitive_code: &str) -> DataType {
        if type_code.contains("int") {
            DataType::Integer
        } else if primitive_code == "numb" {
            DataType::Float
        } else {
            DataType::String
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::String => write!(f, "string"),
            DataType::Integer => write!(f, "integer"),
            DataType::Float => write!(f, "float"),
        }
    }
}

/// Mandatory codes that make an attribute mandatory
const MANDATORY_CODES: &[&str] = &["yes", "implicit", "implicit-ordinal"];

/// Resolved type metadata for one attribute, cached per typing pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub data_type: DataType,
    pub mandatory: bool,
}

/// Dictionary lookup service consumed by the typing layer.
///
/// Implementations resolve per-item metadata for `_category.attribute` items;
/// `None` means the item is not defined. The typing layer never constructs a
/// resolver, it is injected by the caller.
pub trait SchemaResolver {
    /// Dictionary type code for an item, e.g. "int", "float", "code"
    fn type_code(&self, category: &str, attribute: &str) -> Option<&str>;

    /// Coarse primitive code for an item, e.g. "numb" or "char"
    fn type_primitive(&self, category: &str, attribute: &str) -> Option<&str>;

    /// Mandatory code for an item, e.g. "yes", "no", "implicit"
    fn mandatory_code(&self, category: &str, attribute: &str) -> Option<&str>;

    /// Whether the mandatory code classifies the item as mandatory
    fn is_mandatory(&self, category: &str, attribute: &str) -> bool {
        self.mandatory_code(category, attribute)
            .map(|code| MANDATORY_CODES.contains(&code))
            .unwrap_or(false)
    }
}

/// Per-item definition held by [`DictionaryResolver`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub type_code: String,
    pub primitive_code: String,
    pub mandatory_code: String,
}

impl ItemDef {
    pub fn new(
        type_code: impl Into<String>,
        primitive_code: impl Into<String>,
        mandatory_code: impl Into<String>,
    ) -> Self {
        Self {
            type_code: type_code.into(),
            primitive_code: primitive_code.into(),
            mandatory_code: mandatory_code.into(),
        }
    }
}

/// In-memory schema resolver backed by a map of item definitions.
///
/// Stands in for a full dictionary API: callers register the items their
/// tables use and inject the resolver into [`crate::TypedTable`].
#[derive(Debug, Default)]
pub struct DictionaryResolver {
    items: FxHashMap<(String, String), ItemDef>,
}

impl DictionaryResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item definition, replacing any previous one
    pub fn with_item(
        mut self,
        category: impl Into<String>,
        attribute: impl Into<String>,
        def: ItemDef,
    ) -> Self {
        self.items
            .insert((category.into(), attribute.into()), def);
        self
    }

    fn get(&self, category: &str, attribute: &str) -> Option<&ItemDef> {
        self.items
            .get(&(category.to_string(), attribute.to_string()))
    }
}

impl SchemaResolver for DictionaryResolver {
    fn type_code(&self, category: &str, attribute: &str) -> Option<&str> {
        self.get(category, attribute).map(|d| d.type_code.as_str())
    }

    fn type_primitive(&self, category: &str, attribute: &str) -> Option<&str> {
        self.get(category, attribute)
            .map(|d| d.primitive_code.as_str())
    }

    fn mandatory_code(&self, category: &str, attribute: &str) -> Option<&str> {
        self.get(category, attribute)
            .map(|d| d.mandatory_code.as_str())
    }
}
