//! The ordered key-value engine (spec §4.1): one logical namespace per
//! table, each ordered by key, persisted to its own file with the
//! write-to-temp-then-atomically-rename discipline the teacher's
//! `SimpleFileKvStore` uses for its single namespace — generalized here to
//! many namespaces and to an ordered (`BTreeMap`) in-memory cache so that
//! `scan` yields ascending key order.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::core::common::StorageError;

/// One write to apply as part of an atomic batch (spec §4.1 `write_batch`).
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put {
        table: String,
        key: String,
        value: String,
    },
    Delete {
        table: String,
        key: String,
    },
}

/// A single table's ordered keyspace, kept fully in memory and mirrored to
/// disk on every mutation.
#[derive(Debug, Default)]
struct Namespace {
    entries: BTreeMap<String, String>,
}

/// File-backed implementation of the ordered KV engine contract.
#[derive(Debug)]
pub struct StorageEngine {
    base_dir: PathBuf,
    namespaces: RwLock<BTreeMap<String, Namespace>>,
}

impl StorageEngine {
    /// Opens (creating if necessary) a storage engine rooted at `base_dir`,
    /// pre-creating a namespace for every name in `table_names` and loading
    /// any namespace files already on disk (spec §4.1 `open`).
    pub fn open(
        base_dir: impl AsRef<Path>,
        table_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)
            .map_err(|e| StorageError::Open(format!("{}: {e}", base_dir.display())))?;

        let mut namespaces = BTreeMap::new();
        for name in table_names {
            let name = name.into();
            let ns = load_namespace(&namespace_path(&base_dir, &name))?;
            namespaces.insert(name, ns);
        }

        // Also pick up any namespace files left on disk from a previous
        // process that aren't named in this call's table list.
        if let Ok(read_dir) = fs::read_dir(&base_dir) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tbl") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        namespaces
                            .entry(stem.to_string())
                            .or_insert_with(Namespace::default);
                    }
                }
            }
        }

        Ok(Self {
            base_dir,
            namespaces: RwLock::new(namespaces),
        })
    }

    /// Ensures a namespace exists, creating it on demand (spec §4.1 `namespace`).
    fn ensure_namespace(&self, table: &str) {
        let mut namespaces = self.namespaces.write().unwrap_or_else(|e| e.into_inner());
        namespaces.entry(table.to_string()).or_default();
    }

    pub fn put(&self, table: &str, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_namespace(table);
        {
            let mut namespaces = self.namespaces.write().unwrap_or_else(|e| e.into_inner());
            let ns = namespaces.entry(table.to_string()).or_default();
            ns.entries.insert(key.to_string(), value.to_string());
        }
        self.persist(table)
    }

    pub fn delete(&self, table: &str, key: &str) -> Result<(), StorageError> {
        self.ensure_namespace(table);
        {
            let mut namespaces = self.namespaces.write().unwrap_or_else(|e| e.into_inner());
            let ns = namespaces.entry(table.to_string()).or_default();
            ns.entries.remove(key);
        }
        self.persist(table)
    }

    pub fn get(&self, table: &str, key: &str) -> Option<String> {
        let namespaces = self.namespaces.read().unwrap_or_else(|e| e.into_inner());
        namespaces.get(table).and_then(|ns| ns.entries.get(key).cloned())
    }

    /// Single-pass scan over `(key, value)` pairs in ascending key order
    /// (spec §4.1 `scan`). Materialized eagerly (rather than returning a
    /// live iterator borrowing the lock) so the lock is released before the
    /// caller processes rows, matching the "iterators are scoped to the
    /// call that creates them" resource rule in spec §5.
    pub fn scan(&self, table: &str) -> Vec<(String, String)> {
        let namespaces = self.namespaces.read().unwrap_or_else(|e| e.into_inner());
        namespaces
            .get(table)
            .map(|ns| {
                ns.entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Atomically applies a sequence of puts/deletes, possibly across
    /// several namespaces, persisting each touched namespace exactly once
    /// (spec §4.1 `write_batch`).
    pub fn write_batch(&self, ops: &[BatchOp]) -> Result<(), StorageError> {
        let mut touched = std::collections::BTreeSet::new();
        {
            let mut namespaces = self.namespaces.write().unwrap_or_else(|e| e.into_inner());
            for op in ops {
                match op {
                    BatchOp::Put { table, key, value } => {
                        let ns = namespaces.entry(table.clone()).or_default();
                        ns.entries.insert(key.clone(), value.clone());
                        touched.insert(table.clone());
                    }
                    BatchOp::Delete { table, key } => {
                        let ns = namespaces.entry(table.clone()).or_default();
                        ns.entries.remove(key);
                        touched.insert(table.clone());
                    }
                }
            }
        }
        for table in touched {
            self.persist(&table)?;
        }
        Ok(())
    }

    fn persist(&self, table: &str) -> Result<(), StorageError> {
        let namespaces = self.namespaces.read().unwrap_or_else(|e| e.into_inner());
        let Some(ns) = namespaces.get(table) else {
            return Ok(());
        };
        save_namespace(&namespace_path(&self.base_dir, table), ns)
    }
}

fn namespace_path(base_dir: &Path, table: &str) -> PathBuf {
    base_dir.join(format!("{table}.tbl"))
}

fn load_namespace(path: &Path) -> Result<Namespace, StorageError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Namespace::default()),
        Err(e) => return Err(StorageError::Io(e)),
    };
    let mut reader = BufReader::new(file);
    let mut entries = BTreeMap::new();
    loop {
        match read_length_prefixed(&mut reader) {
            Ok(Some(key_bytes)) => {
                let value_bytes = read_length_prefixed(&mut reader)?
                    .ok_or_else(|| {
                        StorageError::Io(std::io::Error::new(
                            ErrorKind::UnexpectedEof,
                            "namespace file truncated mid-record",
                        ))
                    })?;
                let key = String::from_utf8_lossy(&key_bytes).into_owned();
                let value = String::from_utf8_lossy(&value_bytes).into_owned();
                entries.insert(key, value);
            }
            Ok(None) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(Namespace { entries })
}

fn read_length_prefixed(reader: &mut impl Read) -> Result<Option<Vec<u8>>, StorageError> {
    let mut len_buf = [0u8; 8];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(StorageError::Io(e)),
    }
    let len = u64::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(StorageError::Io)?;
    Ok(Some(buf))
}

fn write_length_prefixed(writer: &mut impl Write, bytes: &[u8]) -> Result<(), StorageError> {
    writer
        .write_all(&(bytes.len() as u64).to_be_bytes())
        .map_err(StorageError::Io)?;
    writer.write_all(bytes).map_err(StorageError::Io)
}

fn save_namespace(path: &Path, ns: &Namespace) -> Result<(), StorageError> {
    let temp_path = path.with_extension("tbl.tmp");

    struct TempFileGuard<'a>(&'a Path);
    impl Drop for TempFileGuard<'_> {
        fn drop(&mut self) {
            let _ = fs::remove_file(self.0);
        }
    }
    let _guard = TempFileGuard(&temp_path);

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(StorageError::Io)?;
    let mut writer = BufWriter::new(file);
    for (key, value) in &ns.entries {
        write_length_prefixed(&mut writer, key.as_bytes())?;
        write_length_prefixed(&mut writer, value.as_bytes())?;
    }
    writer.flush().map_err(StorageError::Io)?;
    writer.get_ref().sync_all().map_err(StorageError::Io)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StorageError::Io(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn put_get_delete_round_trip() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path(), ["users"]).unwrap();
        engine.put("users", "u1", "{}").unwrap();
        assert_eq!(engine.get("users", "u1"), Some("{}".to_string()));
        engine.delete("users", "u1").unwrap();
        assert_eq!(engine.get("users", "u1"), None);
    }

    #[test]
    fn scan_yields_ascending_key_order() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path(), ["items"]).unwrap();
        engine.put("items", "c", "3").unwrap();
        engine.put("items", "a", "1").unwrap();
        engine.put("items", "b", "2").unwrap();
        let keys: Vec<_> = engine.scan("items").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn persists_and_reloads_across_opens() {
        let dir = TempDir::new().unwrap();
        {
            let engine = StorageEngine::open(dir.path(), ["t"]).unwrap();
            engine.put("t", "k", "v").unwrap();
        }
        let reopened = StorageEngine::open(dir.path(), ["t"]).unwrap();
        assert_eq!(reopened.get("t", "k"), Some("v".to_string()));
    }

    #[test]
    fn write_batch_touches_multiple_namespaces_atomically() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path(), ["a", "b"]).unwrap();
        engine
            .write_batch(&[
                BatchOp::Put {
                    table: "a".to_string(),
                    key: "1".to_string(),
                    value: "x".to_string(),
                },
                BatchOp::Put {
                    table: "b".to_string(),
                    key: "1".to_string(),
                    value: "y".to_string(),
                },
            ])
            .unwrap();
        assert_eq!(engine.get("a", "1"), Some("x".to_string()));
        assert_eq!(engine.get("b", "1"), Some("y".to_string()));
    }

    #[test]
    fn namespace_created_on_demand() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path(), Vec::<String>::new()).unwrap();
        engine.put("new_table", "k", "v").unwrap();
        assert_eq!(engine.get("new_table", "k"), Some("v".to_string()));
    }
}
