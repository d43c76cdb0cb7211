//! The storage interface (spec §4.1): an ordered KV engine presented as a
//! map of per-table namespaces, plus row-level helpers built on top.

pub mod engine;
pub mod table;

pub use engine::{BatchOp, StorageEngine};
pub use table::{primary_key_for, ScanCondition};
