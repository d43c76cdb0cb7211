//! Row-level helpers built on top of the raw KV engine (spec §4.1):
//! `insert`/`update`/`scan_with` and deterministic key derivation.

use crate::core::common::{Row, StorageError};
use crate::core::predicate::{self, Op};
use crate::core::storage::engine::StorageEngine;

/// One flat condition evaluated against a decoded row during a scan.
#[derive(Debug, Clone)]
pub struct ScanCondition {
    pub field: String,
    pub op: Op,
    pub literal: String,
}

impl StorageEngine {
    /// Serializes `row` and writes it, keyed by `row["id"]` if present, else
    /// a deterministic hash of the sorted field=value pairs (spec §4.1
    /// "Key generation determinism"). Returns the key used.
    ///
    /// # Errors
    /// Propagates any I/O error the underlying namespace persist hits.
    pub fn insert_row(&self, table: &str, row: &Row) -> Result<String, StorageError> {
        let key = primary_key_for(row);
        self.put(table, &key, &row.to_json_string())?;
        Ok(key)
    }

    /// Reads the current row for `key` (an empty row if absent), merges
    /// `patch` in, and writes the result back (spec §4.1 `update`).
    ///
    /// # Errors
    /// Propagates any I/O error the underlying namespace persist hits.
    pub fn update_row(&self, table: &str, key: &str, patch: &Row) -> Result<Row, StorageError> {
        let mut current = self.get_row(table, key);
        current.merge(patch);
        self.put(table, key, &current.to_json_string())?;
        Ok(current)
    }

    /// Fetches and decodes one row, yielding an empty row when the key is
    /// absent or its JSON fails to decode.
    pub fn get_row(&self, table: &str, key: &str) -> Row {
        self.get(table, key)
            .and_then(|json| Row::from_json_str(&json).ok())
            .unwrap_or_default()
    }

    /// Iterates all rows in `table`, keeping only those matching every
    /// condition (flat AND), applies `skip` then `limit`, and returns the
    /// surviving keys in iteration (ascending key) order (spec §4.1
    /// `scan_with`).
    pub fn scan_with(
        &self,
        table: &str,
        conditions: &[ScanCondition],
        skip: usize,
        limit: Option<usize>,
    ) -> Vec<String> {
        let mut seen = 0usize;
        let mut out = Vec::new();
        for (key, json) in self.scan(table) {
            let Ok(row) = Row::from_json_str(&json) else {
                continue;
            };
            let matches = conditions
                .iter()
                .all(|c| predicate::eval(row.get_or_empty(&c.field), c.op, &c.literal));
            if !matches {
                continue;
            }
            if seen < skip {
                seen += 1;
                continue;
            }
            out.push(key);
            if let Some(limit) = limit {
                if out.len() >= limit {
                    break;
                }
            }
        }
        out
    }
}

/// `row["id"]` if present, else a deterministic hash over the field names
/// sorted lexicographically (so two embedders inserting the same row
/// produce the same key regardless of map-iteration order) concatenated as
/// `field=value` pairs (spec §4.1, §9).
pub fn primary_key_for(row: &Row) -> String {
    if let Some(id) = row.get("id") {
        if !id.is_empty() {
            return id.to_string();
        }
    }
    fnv1a_hash(row.sorted_field_value_concat().as_bytes()).to_string()
}

/// FNV-1a 64-bit: a simple, fast, non-cryptographic hash, used purely for
/// stable key derivation rather than for security.
fn fnv1a_hash(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn insert_uses_explicit_id_as_key() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path(), ["users"]).unwrap();
        let row = Row::from_pairs([
            ("id".to_string(), "u1".to_string()),
            ("name".to_string(), "Ada".to_string()),
        ]);
        let key = engine.insert_row("users", &row).unwrap();
        assert_eq!(key, "u1");
        assert_eq!(engine.get_row("users", "u1").get("name"), Some("Ada"));
    }

    #[test]
    fn identical_rows_without_id_collapse_to_the_same_key() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path(), ["t"]).unwrap();
        let a = Row::from_pairs([("x".to_string(), "1".to_string())]);
        let b = Row::from_pairs([("x".to_string(), "1".to_string())]);
        assert_eq!(primary_key_for(&a), primary_key_for(&b));
        let ka = engine.insert_row("t", &a).unwrap();
        let kb = engine.insert_row("t", &b).unwrap();
        assert_eq!(ka, kb);
    }

    #[test]
    fn update_merges_into_existing_row() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path(), ["users"]).unwrap();
        let row = Row::from_pairs([
            ("id".to_string(), "u1".to_string()),
            ("age".to_string(), "37".to_string()),
        ]);
        engine.insert_row("users", &row).unwrap();
        let patch = Row::from_pairs([("age".to_string(), "38".to_string())]);
        engine.update_row("users", "u1", &patch).unwrap();
        assert_eq!(engine.get_row("users", "u1").get("age"), Some("38"));
    }

    #[test]
    fn scan_with_applies_conditions_then_skip_then_limit() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path(), ["items"]).unwrap();
        for (id, stock) in [("u1", "5"), ("u2", "2"), ("u3", "9"), ("u4", "9")] {
            engine
                .insert_row(
                    "items",
                    &Row::from_pairs([
                        ("id".to_string(), id.to_string()),
                        ("stock".to_string(), stock.to_string()),
                    ]),
                )
                .unwrap();
        }
        let conditions = vec![ScanCondition {
            field: "stock".to_string(),
            op: Op::Eq,
            literal: "9".to_string(),
        }];
        let keys = engine.scan_with("items", &conditions, 1, Some(1));
        assert_eq!(keys, vec!["u4"]);
    }
}
