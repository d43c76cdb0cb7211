//! The bindings façade (spec §4.6): the two entry points any embedder calls,
//! `Connection::query` and `Connection::execute`, plus the result types they
//! hand back.
//!
//! Shaped after the teacher's `api::connection::Connection` (`open`/
//! `open_in_memory`/`execute`, `Result<_, OxidbError>`-returning, doc-commented
//! `# Errors` sections) with the WAL/transaction/performance-context plumbing
//! dropped, since durability beyond the KV engine and multi-statement
//! transactions are spec Non-goals.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::common::{Error, ParseError, Row};
use crate::core::config::StoreConfig;
use crate::core::index::IndexManager;
use crate::core::query::{parse, ExecOutcome, Executor, Statement};
use crate::core::schema::SchemaRegistry;
use crate::core::storage::StorageEngine;

/// The row set a `SELECT` produced, in final (projected, ordered, paginated)
/// order (spec §4.5 "Result marshalling").
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    rows: Vec<Row>,
}

impl QueryResult {
    fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// The result rows, in the order the executor produced them.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows in the result (spec §9's "Affected" definition
    /// includes "number of rows in a SELECT result").
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates over the result rows in order.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Consumes the result, returning the owned row set.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// The outcome of an `execute` call (spec §4.6): a boolean success flag plus
/// the error text when `success == false`, and the affected-row count on
/// success (spec §9 "Affected").
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    /// Whether the statement ran without error.
    pub success: bool,
    /// The error text when `success` is `false`.
    pub error: Option<String>,
    /// Rows inserted/updated/deleted, or rows returned for a `SELECT`.
    pub affected: usize,
}

impl ExecuteOutcome {
    fn ok(affected: usize) -> Self {
        Self { success: true, error: None, affected }
    }

    fn err(message: String) -> Self {
        Self { success: false, error: Some(message), affected: 0 }
    }
}

/// An open connection to one store: its storage engine, index manager, and
/// schema registry, bundled the way the teacher's `Connection` bundles its
/// `QueryExecutor` (spec §4.6, §9 "no global singleton is required").
#[derive(Debug)]
pub struct Connection {
    storage: StorageEngine,
    index: IndexManager,
    schema: SchemaRegistry,
}

impl Connection {
    /// Opens a connection per `config`: loads the schema document, opens one
    /// storage namespace per declared table, and rebuilds every index from
    /// the on-disk state (spec §3 "Lifecycle": "Indexes are (re)built at
    /// startup").
    ///
    /// # Errors
    /// Returns `Error::Schema` if the schema file is missing or malformed,
    /// or `Error::Storage` if the data directory cannot be opened.
    pub fn open(config: &StoreConfig) -> Result<Self, Error> {
        let schema = SchemaRegistry::load_from_file(config.schema_file_path())?;
        let storage = StorageEngine::open(config.data_path(), schema.table_names().map(str::to_string))?;
        let index = IndexManager::new();
        index.rebuild_all(&storage, &schema);
        Ok(Self { storage, index, schema })
    }

    /// Opens a connection with an already-parsed schema and an explicit data
    /// directory, for callers that don't keep their schema as a file on disk
    /// (e.g. tests).
    ///
    /// # Errors
    /// Returns `Error::Storage` if the data directory cannot be opened.
    pub fn open_with_schema(
        data_dir: impl AsRef<Path>,
        schema: SchemaRegistry,
    ) -> Result<Self, Error> {
        let storage = StorageEngine::open(data_dir, schema.table_names().map(str::to_string))?;
        let index = IndexManager::new();
        index.rebuild_all(&storage, &schema);
        Ok(Self { storage, index, schema })
    }

    /// Opens a connection backed by a fresh temp directory, for quick
    /// experiments and tests that don't care about persistence across
    /// process restarts (mirrors the teacher's `open_in_memory`, which picks
    /// a unique temp file per call via an atomic counter).
    ///
    /// # Errors
    /// Returns `Error::Storage` if a temp directory cannot be created.
    pub fn open_ephemeral(schema_json: &str) -> Result<Self, Error> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let unique_id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("quarkql_{}_{unique_id}", std::process::id()));

        let schema = SchemaRegistry::load_from_str(schema_json)?;
        Self::open_with_schema(dir, schema)
    }

    /// Runs a `SELECT` and returns its result set. Never mutates storage
    /// (spec §4.6): any other statement shape is rejected with a parse
    /// error rather than silently executed.
    ///
    /// # Errors
    /// Returns `Error::Parse` if `sql` isn't a `SELECT` or fails to parse,
    /// or whatever error the executor surfaces while planning/running it.
    pub fn query(&self, sql: &str) -> Result<QueryResult, Error> {
        let statement = parse(sql).map_err(Error::Parse)?;
        if !matches!(statement, Statement::Select(_)) {
            return Err(Error::Parse(ParseError::UnsupportedShape(sql.to_string())));
        }
        let outcome = Executor::new(&self.storage, &self.index, &self.schema).execute(&statement)?;
        let rows = match outcome {
            ExecOutcome::Rows(rows) => rows,
            ExecOutcome::Affected(_) => Vec::new(),
        };
        Ok(QueryResult::new(rows))
    }

    /// Runs a write statement (`INSERT`/`UPDATE`/`DELETE`/`BATCH`) and
    /// reports the outcome as `{success, error}` rather than propagating a
    /// `Result` (spec §4.6). A `SELECT` is accepted too, for callers that
    /// don't care about its rows and just want a success/fail signal.
    pub fn execute(&self, sql: &str) -> ExecuteOutcome {
        let result = (|| -> Result<usize, Error> {
            let statement = parse(sql).map_err(Error::Parse)?;
            let outcome = Executor::new(&self.storage, &self.index, &self.schema).execute(&statement)?;
            Ok(match outcome {
                ExecOutcome::Affected(n) => n,
                ExecOutcome::Rows(rows) => rows.len(),
            })
        })();
        match result {
            Ok(affected) => ExecuteOutcome::ok(affected),
            Err(e) => ExecuteOutcome::err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_rejects_non_select_statements() {
        let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"name":"str"}}}"#).unwrap();
        let err = conn.query(r#"INSERT INTO users VALUES {"id":"u1"}"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::UnsupportedShape(_))));
    }

    #[test]
    fn execute_reports_success_and_affected_count() {
        let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"name":"str"}}}"#).unwrap();
        let outcome = conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada"}"#);
        assert!(outcome.success);
        assert_eq!(outcome.affected, 1);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn execute_reports_failure_with_error_text() {
        let conn = Connection::open_ephemeral(r#"{"users":{}}"#).unwrap();
        let outcome = conn.execute("DROP TABLE users");
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn query_then_execute_round_trip() {
        let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"name":"str"}}}"#).unwrap();
        conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada","age":37}"#);
        let result = conn.query("SELECT * FROM users WHERE name='Ada'").unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.rows()[0].get("age"), Some("37"));
    }
}
