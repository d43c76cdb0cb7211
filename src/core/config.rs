//! Store configuration (SPEC_FULL §2): where the storage engine keeps its
//! per-table namespace files, and where the startup schema document lives.
//!
//! Mirrors the teacher's `core::config::Config` — a serde-deserializable
//! struct with `#[serde(default = ...)]` field defaults, loaded from an
//! optional TOML file with a missing-file fallback to `Default` — scoped
//! down to what this store needs: no WAL path, cache size, or isolation
//! level, since durability/caching/transactions beyond the KV engine are
//! spec Non-goals.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::common::StorageError;

/// Configuration for opening a [`crate::api::Connection`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory holding one namespace file per table.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Path to the JSON schema document (spec §6).
    #[serde(default = "default_schema_path")]
    pub schema_path: String,
}

fn default_data_dir() -> String {
    "quarkql_data".to_string()
}

fn default_schema_path() -> String {
    "schema.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            schema_path: default_schema_path(),
        }
    }
}

impl StoreConfig {
    /// Loads configuration from a TOML file, falling back to [`Default`]
    /// when the file doesn't exist.
    ///
    /// # Errors
    /// Returns `StorageError::Open` if the file exists but cannot be read or
    /// fails to parse as TOML matching this shape.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|e| StorageError::Open(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// The resolved directory the storage engine should open.
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// The resolved path to the schema document.
    pub fn schema_file_path(&self) -> PathBuf {
        PathBuf::from(&self.schema_path)
    }
}
