//! The index manager (spec §4.3): per-table, per-field ordered multimaps
//! `value -> [keys]`, rebuilt from storage at startup and incrementally
//! maintained on every write.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::core::common::Row;
use crate::core::schema::SchemaRegistry;
use crate::core::storage::StorageEngine;

type FieldIndex = BTreeMap<String, Vec<String>>;

/// `table -> field -> (value -> keys)`, guarded by a single reader/writer
/// lock. Spec §5 requires writers to hold the exclusive lock across the
/// storage-write/index-update pair; callers (the executor) achieve that by
/// calling `on_insert`/`on_update`/`on_delete` immediately after the
/// corresponding storage write, inside the same critical section as far as
/// the executor's own call stack is concerned.
#[derive(Debug, Default)]
pub struct IndexManager {
    index: RwLock<HashMap<String, HashMap<String, FieldIndex>>>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if an in-memory index has been built for `table.field`.
    pub fn has_index(&self, table: &str, field: &str) -> bool {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        index
            .get(table)
            .is_some_and(|fields| fields.contains_key(field))
    }

    /// Rebuilds every index from scratch by scanning each schema-declared
    /// table's keyspace. Rows that fail to decode are logged and skipped,
    /// non-fatally (spec §4.3).
    pub fn rebuild_all(&self, storage: &StorageEngine, schema: &SchemaRegistry) {
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        index.clear();

        for table in schema.table_names() {
            let table_schema = schema.schema_or_empty(table);
            let indexed_fields: Vec<&str> = table_schema.indexed_field_names().collect();
            if indexed_fields.is_empty() {
                continue;
            }
            let mut table_index: HashMap<String, FieldIndex> = HashMap::new();
            for field in &indexed_fields {
                table_index.entry((*field).to_string()).or_default();
            }

            for (key, json) in storage.scan(table) {
                let row = match Row::from_json_str(&json) {
                    Ok(row) => row,
                    Err(e) => {
                        eprintln!("[index] skipping undecodable row {table}/{key}: {e}");
                        continue;
                    }
                };
                for field in &indexed_fields {
                    if let Some(value) = row.get(field) {
                        if !value.is_empty() {
                            table_index
                                .entry((*field).to_string())
                                .or_default()
                                .entry(value.to_string())
                                .or_default()
                                .push(key.clone());
                        }
                    }
                }
            }
            index.insert(table.to_string(), table_index);
        }
    }

    /// Inserts `(value, key)` for every indexed field present and non-empty
    /// in `new_row` (spec §4.3 `on_insert`). Equivalent to `on_update` with
    /// an empty old row.
    pub fn on_insert(&self, table: &str, key: &str, new_row: &Row, schema: &SchemaRegistry) {
        self.on_update(table, key, &Row::new(), new_row, schema);
    }

    /// For each indexed field whose value changed, removes the stale
    /// `(old, key)` entry and inserts the fresh `(new, key)` entry (spec
    /// §4.3 `on_update`).
    pub fn on_update(
        &self,
        table: &str,
        key: &str,
        old_row: &Row,
        new_row: &Row,
        schema: &SchemaRegistry,
    ) {
        let table_schema = schema.schema_or_empty(table);
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        let table_index = index.entry(table.to_string()).or_default();

        for field in table_schema.indexed_field_names() {
            let old_value = old_row.get_or_empty(field);
            let new_value = new_row.get_or_empty(field);
            if old_value == new_value {
                continue;
            }
            let bucket = table_index.entry(field.to_string()).or_default();
            if !old_value.is_empty() {
                remove_key_from_bucket(bucket, old_value, key);
            }
            if !new_value.is_empty() {
                bucket
                    .entry(new_value.to_string())
                    .or_default()
                    .push(key.to_string());
            }
        }
    }

    /// Removes every indexed-field entry for `old_row` (spec §4.3 `on_delete`).
    pub fn on_delete(&self, table: &str, key: &str, old_row: &Row, schema: &SchemaRegistry) {
        let table_schema = schema.schema_or_empty(table);
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        let table_index = index.entry(table.to_string()).or_default();

        for field in table_schema.indexed_field_names() {
            let Some(value) = old_row.get(field) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            if let Some(bucket) = table_index.get_mut(field) {
                remove_key_from_bucket(bucket, value, key);
            }
        }
    }

    /// Returns all keys in ascending (or, if `desc`, descending) order of
    /// indexed value, flattening each value bucket in insertion order (spec
    /// §4.3: "callers should not rely on [bucket] order for correctness").
    /// Used by the executor's ORDER BY push-down fast path (spec §4.5 step B).
    pub fn ordered_keys(&self, table: &str, field: &str, desc: bool) -> Vec<String> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        let Some(bucket) = index.get(table).and_then(|fields| fields.get(field)) else {
            return Vec::new();
        };
        if desc {
            bucket.iter().rev().flat_map(|(_, keys)| keys.clone()).collect()
        } else {
            bucket.iter().flat_map(|(_, keys)| keys.clone()).collect()
        }
    }

    /// Exact-match lookup used by the join step (spec §4.5 step C).
    pub fn lookup(&self, table: &str, field: &str, value: &str) -> Vec<String> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        index
            .get(table)
            .and_then(|fields| fields.get(field))
            .and_then(|bucket| bucket.get(value))
            .cloned()
            .unwrap_or_default()
    }
}

fn remove_key_from_bucket(bucket: &mut FieldIndex, value: &str, key: &str) {
    if let Some(keys) = bucket.get_mut(value) {
        keys.retain(|k| k != key);
        if keys.is_empty() {
            bucket.remove(value);
        }
    }
}
