//! Schema registry (spec §4/§6): loaded once at startup, immutable for the
//! life of the process, declaring which fields of each table are indexed.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde_json::Value as Json;

use crate::core::common::SchemaError;

/// The declared shape of one table: only the field-name *set* is
/// load-bearing (spec §3); the type label is informational.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    indexed_fields: HashSet<String>,
}

impl TableSchema {
    pub fn is_indexed(&self, field: &str) -> bool {
        self.indexed_fields.contains(field)
    }

    pub fn indexed_field_names(&self) -> impl Iterator<Item = &str> {
        self.indexed_fields.iter().map(String::as_str)
    }
}

/// An immutable map of table name to `TableSchema`, built once from a JSON
/// schema document.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| SchemaError::BadSchemaJson(format!("{}: {e}", path.as_ref().display())))?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, SchemaError> {
        let root: Json =
            serde_json::from_str(text).map_err(|e| SchemaError::BadSchemaJson(e.to_string()))?;
        let Json::Object(table_map) = root else {
            return Err(SchemaError::BadSchemaJson(
                "schema root must be an object".to_string(),
            ));
        };

        let mut tables = HashMap::new();
        for (table_name, table_def) in table_map {
            let mut schema = TableSchema::default();
            // Unknown top-level keys inside a table object are ignored; a
            // missing `indexedFields` means the table has no indexes.
            if let Some(Json::Object(indexed)) = table_def.get("indexedFields") {
                for (field, type_label) in indexed {
                    if !type_label.is_string() {
                        return Err(SchemaError::BadSchemaJson(format!(
                            "{table_name}.indexedFields.{field} must be a string type label"
                        )));
                    }
                    schema.indexed_fields.insert(field.clone());
                }
            }
            tables.insert(table_name, schema);
        }
        Ok(Self { tables })
    }

    /// All declared table names, e.g. for index rebuild-at-startup.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn schema(&self, table: &str) -> Result<&TableSchema, SchemaError> {
        self.tables
            .get(table)
            .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))
    }

    /// Schemas declare the indexable fields of known tables; unknown tables
    /// (not mentioned in the schema file) are still writable, just with no
    /// indexed fields (spec says `has_index` just returns false for them).
    pub fn schema_or_empty(&self, table: &str) -> TableSchema {
        self.tables.get(table).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_indexed_fields_and_ignores_unknown_keys() {
        let registry = SchemaRegistry::load_from_str(
            r#"{"users": {"indexedFields": {"name": "str"}, "description": "people"}}"#,
        )
        .unwrap();
        let schema = registry.schema("users").unwrap();
        assert!(schema.is_indexed("name"));
        assert!(!schema.is_indexed("age"));
    }

    #[test]
    fn missing_indexed_fields_means_no_indexes() {
        let registry = SchemaRegistry::load_from_str(r#"{"orders": {}}"#).unwrap();
        let schema = registry.schema("orders").unwrap();
        assert!(!schema.is_indexed("id"));
    }

    #[test]
    fn unknown_table_is_an_error() {
        let registry = SchemaRegistry::load_from_str("{}").unwrap();
        assert!(registry.schema("ghost").is_err());
    }

    #[test]
    fn non_string_type_label_is_rejected() {
        let err =
            SchemaRegistry::load_from_str(r#"{"t": {"indexedFields": {"f": 1}}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::BadSchemaJson(_)));
    }
}
