//! Typed table: dictionary-driven casting over raw table storage

pub mod compare;

use std::sync::LazyLock;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::{CastOptions, CompareOptions};
use crate::error::{Error, Result};
use crate::model::{CellValue, ColumnMeta, DataType, SchemaResolver, Table, INAPPLICABLE, UNKNOWN};

pub use compare::ValueComparator;

/// Attributes known to defeat dictionary-declared casting, either because the
/// type code mentions "int" without the values being integers (point_symmetry)
/// or because the values are ranges (pdb_chain_residue_range). Always typed as
/// strings, whatever the dictionary says.
const DIFFICULT_ATTRIBUTES: &[&str] = &[
    "concentration_range",
    "pdb_chain_residue_range",
    "axial_symmetry",
    "point_symmetry",
    "used_frames_per_image",
    "temperature",
    "pH",
];

static DIFFICULT_SET: LazyLock<FxHashSet<&'static str>> =
    LazyLock::new(|| DIFFICULT_ATTRIBUTES.iter().copied().collect());

/// Comparison outcome for one shared attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeComparison {
    /// Attribute name
    pub attribute: String,
    /// Whether both value lists are equal (or close, for float attributes)
    pub equal: bool,
}

/// A table whose cells have been cast to their dictionary-declared types.
///
/// Composition over a raw [`Table`] plus an injected [`SchemaResolver`]:
/// construction immediately runs a full casting pass, after which every cell
/// is either a value of its attribute's declared type or that attribute's
/// missing-value substitute. Resolved metadata is cached per attribute for
/// the table's lifetime.
pub struct TypedTable<'a> {
    table: Table,
    resolver: Option<&'a dyn SchemaResolver>,
    attribute_types: IndexMap<String, ColumnMeta>,
}

impl std::fmt::Debug for TypedTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The resolver handle is an opaque trait object; elide it.
        f.debug_struct("TypedTable")
            .field("table", &self.table)
            .field("attribute_types", &self.attribute_types)
            .finish_non_exhaustive()
    }
}

impl<'a> TypedTable<'a> {
    /// Build a typed table from a copy of `table`, leaving the source
    /// untouched. Fails on structural errors (missing resolver, failed
    /// dictionary lookup); per-cell cast failures only substitute.
    pub fn new(
        table: &Table,
        resolver: Option<&'a dyn SchemaResolver>,
        options: &CastOptions,
    ) -> Result<Self> {
        Self::from_owned(table.clone(), resolver, options)
    }

    /// Build a typed table taking ownership of the source storage. No copy is
    /// made; the casting pass rewrites the given rows directly.
    pub fn from_owned(
        table: Table,
        resolver: Option<&'a dyn SchemaResolver>,
        options: &CastOptions,
    ) -> Result<Self> {
        let mut typed = Self {
            table,
            resolver,
            attribute_types: IndexMap::new(),
        };
        typed.cast_all(options)?;
        Ok(typed)
    }

    /// Category name
    pub fn name(&self) -> &str {
        &self.table.name
    }

    /// Attribute names in declaration order
    pub fn attributes(&self) -> &[String] {
        &self.table.attributes
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Full value list for one attribute, in row order
    pub fn attribute_values(&self, name: &str) -> Option<Vec<&CellValue>> {
        self.table.attribute_values(name)
    }

    /// Borrow the underlying storage
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Release the underlying storage
    pub fn into_table(self) -> Table {
        self.table
    }

    /// Cast every cell to its dictionary-declared type, in place.
    ///
    /// Attributes are processed in declaration order. Absent cells, reserved
    /// markers, and cells that fail to cast are rewritten with the attribute's
    /// missing-value substitute (see [`CastOptions`]). Cast failures are
    /// logged unless `ignore_cast_errors` is set; only structural errors fail
    /// the pass.
    pub fn cast_all(&mut self, options: &CastOptions) -> Result<()> {
        for ii in 0..self.table.attribute_count() {
            let at_name = self.table.attributes[ii].clone();
            let meta = self.resolve_column(&at_name)?;
            let substitute = missing_substitute(&meta, options);

            for row in &mut self.table.rows {
                let cell = &mut row[ii];
                if cell.is_null() || cell.is_reserved_marker() {
                    *cell = substitute.clone();
                    continue;
                }
                match cast_cell(cell, meta.data_type) {
                    Ok(value) => *cell = value,
                    Err(reason) => {
                        if !options.ignore_cast_errors {
                            error!(
                                category = %self.table.name,
                                attribute = %at_name,
                                data_type = %meta.data_type,
                                value = %cell,
                                %reason,
                                "cast failure"
                            );
                        }
                        *cell = substitute.clone();
                    }
                }
            }

            debug!(category = %self.table.name, attribute = %at_name, data_type = %meta.data_type, "attribute typed");
            self.attribute_types.insert(at_name, meta);
        }
        Ok(())
    }

    /// Force every attribute to string type, in place.
    ///
    /// Absent cells and reserved markers become '.' for mandatory attributes
    /// and '?' for optional ones; every other cell is stringified. Idempotent.
    pub fn force_string_types(&mut self) -> Result<()> {
        for ii in 0..self.table.attribute_count() {
            let at_name = self.table.attributes[ii].clone();
            let mandatory = match self.attribute_types.get(&at_name) {
                Some(meta) => meta.mandatory,
                None => self.resolve_column(&at_name)?.mandatory,
            };
            let substitute = if mandatory { INAPPLICABLE } else { UNKNOWN };

            for row in &mut self.table.rows {
                let cell = &mut row[ii];
                if cell.is_null() || cell.is_reserved_marker() {
                    *cell = CellValue::Text(substitute.to_string());
                } else {
                    *cell = CellValue::Text(cell.to_string());
                }
            }

            self.attribute_types.insert(
                at_name,
                ColumnMeta {
                    data_type: DataType::String,
                    mandatory,
                },
            );
        }
        Ok(())
    }

    /// Resolved type and optionality for one attribute.
    ///
    /// Never errors: any lookup failure (no resolver, undefined item) degrades
    /// to `None`.
    pub fn attribute_type_info(&self, name: &str) -> Option<ColumnMeta> {
        if let Some(meta) = self.attribute_types.get(name) {
            return Some(*meta);
        }
        self.resolve_column(name).ok()
    }

    /// Compare value lists attribute-by-attribute against another typed table.
    ///
    /// Only attributes present in both tables are compared, in sorted name
    /// order. A row-count mismatch reports every shared attribute unequal
    /// without inspecting values. String and integer attributes compare for
    /// exact list equality; float attributes compare pairwise within the
    /// configured tolerances, stopping at the first unequal pair. With
    /// `ignore_order`, both lists are sorted first.
    pub fn compare_attribute_values(
        &self,
        other: &TypedTable<'_>,
        options: &CompareOptions,
    ) -> Result<Vec<AttributeComparison>> {
        let mut common: Vec<&String> = self
            .table
            .attributes
            .iter()
            .filter(|name| other.table.has_attribute(name))
            .collect();
        common.sort();

        if self.row_count() != other.row_count() {
            return Ok(common
                .into_iter()
                .map(|name| AttributeComparison {
                    attribute: name.clone(),
                    equal: false,
                })
                .collect());
        }

        let comparator = ValueComparator::from_options(options);
        let mut results = Vec::with_capacity(common.len());
        for at_name in common {
            let data_type = self
                .attribute_type_info(at_name)
                .map(|meta| meta.data_type)
                .ok_or_else(|| Error::UnknownItem {
                    category: self.table.name.clone(),
                    attribute: at_name.clone(),
                })?;

            let mut a_values = self.attribute_values(at_name).unwrap_or_default();
            let mut b_values = other.attribute_values(at_name).unwrap_or_default();
            if options.ignore_order {
                a_values.sort_by(|a, b| a.sort_cmp(b));
                b_values.sort_by(|a, b| a.sort_cmp(b));
            }

            let equal = match data_type {
                DataType::String | DataType::Integer => a_values == b_values,
                DataType::Float => comparator.lists_close(a_values, b_values)?,
            };
            results.push(AttributeComparison {
                attribute: at_name.clone(),
                equal,
            });
        }
        Ok(results)
    }

    /// Resolve type and optionality for one attribute via the injected
    /// resolver, with the difficult-attribute override applied.
    fn resolve_column(&self, at_name: &str) -> Result<ColumnMeta> {
        let resolver = self.resolver.ok_or_else(|| Error::MissingResolver {
            category: self.table.name.clone(),
        })?;
        let type_code =
            resolver
                .type_code(&self.table.name, at_name)
                .ok_or_else(|| Error::UnknownItem {
                    category: self.table.name.clone(),
                    attribute: at_name.to_string(),
                })?;
        let primitive = resolver
            .type_primitive(&self.table.name, at_name)
            .unwrap_or("");
        let mandatory = resolver.is_mandatory(&self.table.name, at_name);

        let data_type = if DIFFICULT_SET.contains(at_name) {
            DataType::String
        } else {
            DataType::classify(type_code, primitive)
        };
        Ok(ColumnMeta {
            data_type,
            mandatory,
        })
    }
}

/// Pick the missing-value substitute for one attribute.
///
/// Substitutes are stored as given and never re-cast, so a caller-supplied
/// default lands in the column verbatim, as does the reserved marker text.
fn missing_substitute(meta: &ColumnMeta, options: &CastOptions) -> CellValue {
    if options.use_reserved_markers {
        let marker = if meta.mandatory { INAPPLICABLE } else { UNKNOWN };
        return CellValue::Text(marker.to_string());
    }
    match meta.data_type {
        DataType::Integer => options.missing_integer.into(),
        DataType::Float => options.missing_float.into(),
        DataType::String => options.missing_string.clone().into(),
    }
}

/// Cast one present, non-marker cell to the target type
fn cast_cell(cell: &CellValue, data_type: DataType) -> std::result::Result<CellValue, String> {
    match data_type {
        DataType::Integer => match cell {
            CellValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(CellValue::Int)
                .map_err(|e| e.to_string()),
            CellValue::Int(i) => Ok(CellValue::Int(*i)),
            // Re-cast of an already-float cell: only integral values convert,
            // anything else goes through the logged-substitute path.
            CellValue::Float(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 =>
            {
                Ok(CellValue::Int(*v as i64))
            }
            CellValue::Float(v) => Err(format!("non-integral float {}", v)),
            CellValue::Null => Err("null value".to_string()),
        },
        DataType::Float => match cell {
            CellValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(CellValue::Float)
                .map_err(|e| e.to_string()),
            CellValue::Int(i) => Ok(CellValue::Float(*i as f64)),
            CellValue::Float(v) => Ok(CellValue::Float(*v)),
            CellValue::Null => Err("null value".to_string()),
        },
        DataType::String => match cell {
            CellValue::Null => Err("null value".to_string()),
            other => Ok(CellValue::Text(other.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DictionaryResolver, ItemDef};

    fn em_resolver() -> DictionaryResolver {
        DictionaryResolver::new()
            .with_item("em_imaging", "id", ItemDef::new("int", "numb", "yes"))
            .with_item("em_imaging", "nominal_defocus_min", ItemDef::new("float", "numb", "no"))
            .with_item("em_imaging", "mode", ItemDef::new("line", "char", "no"))
            .with_item("em_imaging", "temperature", ItemDef::new("float", "numb", "no"))
            .with_item("em_imaging", "point_symmetry", ItemDef::new("int", "numb", "no"))
    }

    fn em_table() -> Table {
        let mut table = Table::new(
            "em_imaging",
            vec![
                "id".into(),
                "nominal_defocus_min".into(),
                "mode".into(),
                "temperature".into(),
            ],
        )
        .unwrap();
        table
            .push_text_row(vec![Some("1"), Some("1200.5"), Some("BRIGHT FIELD"), Some("93")])
            .unwrap();
        table
            .push_text_row(vec![Some("2"), Some("?"), None, Some("70 - 80")])
            .unwrap();
        table
    }

    #[test]
    fn test_cast_with_reserved_markers() {
        let resolver = em_resolver();
        let mut table = Table::new("em_imaging", vec!["id".into()]).unwrap();
        table.push_text_row(vec![Some("3")]).unwrap();
        table.push_text_row(vec![Some(".")]).unwrap();
        table.push_text_row(vec![Some("7")]).unwrap();

        let typed = TypedTable::new(&table, Some(&resolver), &CastOptions::new()).unwrap();
        // The mandatory marker is re-applied as the raw '.' text, even in a
        // typed integer column.
        assert_eq!(
            typed.attribute_values("id").unwrap(),
            vec![&CellValue::Int(3), &CellValue::Text(".".into()), &CellValue::Int(7)]
        );
        // Source table is untouched
        assert_eq!(table.rows[0][0], CellValue::Text("3".into()));
    }

    #[test]
    fn test_cast_all_types() {
        let resolver = em_resolver();
        let typed = TypedTable::new(&em_table(), Some(&resolver), &CastOptions::new()).unwrap();

        assert_eq!(typed.attribute_values("id").unwrap()[0], &CellValue::Int(1));
        assert_eq!(
            typed.attribute_values("nominal_defocus_min").unwrap(),
            vec![&CellValue::Float(1200.5), &CellValue::Text("?".into())]
        );
        // Null cell in an optional attribute becomes the '?' marker
        assert_eq!(
            typed.attribute_values("mode").unwrap(),
            vec![&CellValue::Text("BRIGHT FIELD".into()), &CellValue::Text("?".into())]
        );
    }

    #[test]
    fn test_difficult_attribute_stays_string() {
        let resolver = em_resolver();
        let typed = TypedTable::new(&em_table(), Some(&resolver), &CastOptions::new()).unwrap();

        // Declared float in the dictionary, but ranges like "70 - 80" would
        // defeat the cast.
        let meta = typed.attribute_type_info("temperature").unwrap();
        assert_eq!(meta.data_type, DataType::String);
        assert_eq!(
            typed.attribute_values("temperature").unwrap(),
            vec![&CellValue::Text("93".into()), &CellValue::Text("70 - 80".into())]
        );
    }

    #[test]
    fn test_typed_missing_defaults() {
        let resolver = em_resolver();
        let options = CastOptions::new()
            .with_reserved_markers(false)
            .with_missing_float(-1.0);
        let typed = TypedTable::new(&em_table(), Some(&resolver), &options).unwrap();

        assert_eq!(
            typed.attribute_values("nominal_defocus_min").unwrap()[1],
            &CellValue::Float(-1.0)
        );
        // Unset string default substitutes a null cell
        assert_eq!(typed.attribute_values("mode").unwrap()[1], &CellValue::Null);
    }

    #[test]
    fn test_cast_failure_substitutes() {
        let resolver = em_resolver();
        let mut table = Table::new("em_imaging", vec!["id".into()]).unwrap();
        table.push_text_row(vec![Some("4")]).unwrap();
        table.push_text_row(vec![Some("not-a-number")]).unwrap();

        let options = CastOptions::new().with_ignore_cast_errors(true);
        let typed = TypedTable::new(&table, Some(&resolver), &options).unwrap();
        assert_eq!(
            typed.attribute_values("id").unwrap(),
            vec![&CellValue::Int(4), &CellValue::Text(".".into())]
        );
    }

    #[test]
    fn test_missing_resolver_is_an_error() {
        let err = TypedTable::new(&em_table(), None, &CastOptions::new()).unwrap_err();
        assert!(matches!(err, Error::MissingResolver { .. }));
    }

    #[test]
    fn test_unknown_item_is_an_error() {
        let resolver = em_resolver();
        let mut table = Table::new("em_imaging", vec!["unregistered".into()]).unwrap();
        table.push_text_row(vec![Some("x")]).unwrap();

        let err = TypedTable::new(&table, Some(&resolver), &CastOptions::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownItem { .. }));
    }

    #[test]
    fn test_type_info_degrades_to_none() {
        let resolver = em_resolver();
        let typed = TypedTable::new(&em_table(), Some(&resolver), &CastOptions::new()).unwrap();
        assert!(typed.attribute_type_info("unregistered").is_none());
        assert_eq!(
            typed.attribute_type_info("id"),
            Some(ColumnMeta {
                data_type: DataType::Integer,
                mandatory: true
            })
        );
    }

    #[test]
    fn test_force_string_types_idempotent() {
        let resolver = em_resolver();
        let mut typed = TypedTable::new(&em_table(), Some(&resolver), &CastOptions::new()).unwrap();

        typed.force_string_types().unwrap();
        let once = typed.table().clone();
        typed.force_string_types().unwrap();
        assert_eq!(typed.table().rows, once.rows);

        assert_eq!(
            typed.attribute_values("id").unwrap(),
            vec![&CellValue::Text("1".into()), &CellValue::Text("2".into())]
        );
        assert_eq!(
            typed.attribute_type_info("nominal_defocus_min").unwrap().data_type,
            DataType::String
        );
    }

    #[test]
    fn test_compare_equal_tables() {
        let resolver = em_resolver();
        let a = TypedTable::new(&em_table(), Some(&resolver), &CastOptions::new()).unwrap();
        let b = TypedTable::new(&em_table(), Some(&resolver), &CastOptions::new()).unwrap();

        let results = a.compare_attribute_values(&b, &CompareOptions::new()).unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.equal));
        // Sorted attribute order
        assert_eq!(results[0].attribute, "id");
    }

    #[test]
    fn test_compare_float_within_tolerance() {
        let resolver = em_resolver();
        let mut t1 = Table::new("em_imaging", vec!["nominal_defocus_min".into()]).unwrap();
        t1.push_text_row(vec![Some("1.00001")]).unwrap();
        t1.push_text_row(vec![Some("2.0")]).unwrap();
        let mut t2 = Table::new("em_imaging", vec!["nominal_defocus_min".into()]).unwrap();
        t2.push_text_row(vec![Some("1.00002")]).unwrap();
        t2.push_text_row(vec![Some("2.0")]).unwrap();

        let a = TypedTable::new(&t1, Some(&resolver), &CastOptions::new()).unwrap();
        let b = TypedTable::new(&t2, Some(&resolver), &CastOptions::new()).unwrap();

        let results = a.compare_attribute_values(&b, &CompareOptions::new()).unwrap();
        assert_eq!(results, vec![AttributeComparison { attribute: "nominal_defocus_min".into(), equal: true }]);
    }

    #[test]
    fn test_compare_row_count_mismatch() {
        let resolver = em_resolver();
        let t1 = em_table();
        let mut t2 = em_table();
        t2.push_text_row(vec![Some("3"), Some("900.0"), Some("DARK FIELD"), Some("80")])
            .unwrap();

        let a = TypedTable::new(&t1, Some(&resolver), &CastOptions::new()).unwrap();
        let b = TypedTable::new(&t2, Some(&resolver), &CastOptions::new()).unwrap();

        let forward = a.compare_attribute_values(&b, &CompareOptions::new()).unwrap();
        let backward = b.compare_attribute_values(&a, &CompareOptions::new()).unwrap();
        assert!(forward.iter().all(|r| !r.equal));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_compare_ignore_order() {
        let resolver = em_resolver();
        let mut t1 = Table::new("em_imaging", vec!["id".into()]).unwrap();
        t1.push_text_row(vec![Some("1")]).unwrap();
        t1.push_text_row(vec![Some("2")]).unwrap();
        let mut t2 = Table::new("em_imaging", vec!["id".into()]).unwrap();
        t2.push_text_row(vec![Some("2")]).unwrap();
        t2.push_text_row(vec![Some("1")]).unwrap();

        let a = TypedTable::new(&t1, Some(&resolver), &CastOptions::new()).unwrap();
        let b = TypedTable::new(&t2, Some(&resolver), &CastOptions::new()).unwrap();

        let sorted = a.compare_attribute_values(&b, &CompareOptions::new()).unwrap();
        assert!(sorted[0].equal);
        let positional = a
            .compare_attribute_values(&b, &CompareOptions::new().with_ignore_order(false))
            .unwrap();
        assert!(!positional[0].equal);
    }

    #[test]
    fn test_recast_float_cells_to_integer() {
        let resolver = em_resolver();
        let mut table = Table::new("em_imaging", vec!["id".into()]).unwrap();
        table.push_row(vec![CellValue::Float(2.0)]).unwrap();
        table.push_row(vec![CellValue::Float(2.5)]).unwrap();

        let options = CastOptions::new().with_ignore_cast_errors(true);
        let typed = TypedTable::new(&table, Some(&resolver), &options).unwrap();
        // Integral floats convert; a non-integral float is a cast failure and
        // substitutes instead of truncating.
        assert_eq!(
            typed.attribute_values("id").unwrap(),
            vec![&CellValue::Int(2), &CellValue::Text(".".into())]
        );
    }

    #[test]
    fn test_compare_incomparable_pair_errors() {
        let resolver = em_resolver();
        let mut t1 = Table::new("em_imaging", vec!["nominal_defocus_min".into()]).unwrap();
        t1.push_text_row(vec![Some("1.5")]).unwrap();
        let mut t2 = Table::new("em_imaging", vec!["nominal_defocus_min".into()]).unwrap();
        t2.push_text_row(vec![Some("?")]).unwrap();

        let a = TypedTable::new(&t1, Some(&resolver), &CastOptions::new()).unwrap();
        let b = TypedTable::new(&t2, Some(&resolver), &CastOptions::new()).unwrap();

        // Float(1.5) against the '?' marker text is incomparable; the error
        // surfaces instead of reading as "not equal".
        let err = a
            .compare_attribute_values(&b, &CompareOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::Incomparable { .. }));
    }

    #[test]
    fn test_compare_empty_float_column() {
        let resolver = em_resolver();
        let t = Table::new("em_imaging", vec!["nominal_defocus_min".into()]).unwrap();
        let a = TypedTable::new(&t, Some(&resolver), &CastOptions::new()).unwrap();
        let b = TypedTable::new(&t, Some(&resolver), &CastOptions::new()).unwrap();

        let results = a.compare_attribute_values(&b, &CompareOptions::new()).unwrap();
        assert_eq!(results, vec![AttributeComparison { attribute: "nominal_defocus_min".into(), equal: true }]);
    }

    #[test]
    fn test_comparison_report_serializes() {
        let report = vec![
            AttributeComparison { attribute: "id".into(), equal: true },
            AttributeComparison { attribute: "mode".into(), equal: false },
        ];
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"[{"attribute":"id","equal":true},{"attribute":"mode","equal":false}]"#
        );
    }
}
