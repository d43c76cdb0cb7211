//! Crate-wide error taxonomy.
//!
//! Follows the teacher's pattern of one top-level enum wrapping a focused
//! sub-enum per concern, each with its own `Display` and `std::error::Error`
//! impl, glued together with `From`.

use std::fmt;

/// Failures raised while turning a SQL string into a `Query` AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input did not match any of the accepted statement shapes.
    UnsupportedShape(String),
    /// A `WHERE`/`ON` condition fragment could not be parsed.
    BadCondition(String),
    /// A JSON literal embedded in the SQL (row object, key array, ...) was malformed.
    BadJson(String),
    /// An operator appeared that isn't one of `= != < > <= >= LIKE`.
    UnknownOperator(String),
    /// A `YYYY-MM-DD` literal failed to parse as a date.
    BadDate(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedShape(s) => write!(f, "unsupported SQL shape: {s}"),
            Self::BadCondition(s) => write!(f, "bad condition: {s}"),
            Self::BadJson(s) => write!(f, "bad JSON literal: {s}"),
            Self::UnknownOperator(s) => write!(f, "unknown operator: {s}"),
            Self::BadDate(s) => write!(f, "bad date literal: {s}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Failures raised by the storage interface.
#[derive(Debug)]
pub enum StorageError {
    /// The KV engine could not be opened at the given path.
    Open(String),
    /// An I/O error occurred reading or writing a namespace file.
    Io(std::io::Error),
    /// A key was expected to exist but did not.
    NotFound(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(s) => write!(f, "failed to open storage: {s}"),
            Self::Io(e) => write!(f, "storage I/O error: {e}"),
            Self::NotFound(s) => write!(f, "key not found: {s}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Failures raised by the schema registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A query referenced a table with no schema entry.
    UnknownTable(String),
    /// The schema file's JSON did not match the expected shape.
    BadSchemaJson(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTable(s) => write!(f, "unknown table: {s}"),
            Self::BadSchemaJson(s) => write!(f, "bad schema JSON: {s}"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Failures raised while executing a parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// A bare field in a multi-table SELECT matched more than one table's index.
    AmbiguousField(String),
    /// A bare field in a multi-table SELECT matched no table at all.
    UnknownField(String),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousField(s) => write!(f, "ambiguous field: {s}"),
            Self::UnknownField(s) => write!(f, "unknown field: {s}"),
        }
    }
}

impl std::error::Error for ExecError {}

/// The crate's unified error type; every fallible public operation returns
/// `Result<_, Error>`.
#[derive(Debug)]
pub enum Error {
    Parse(ParseError),
    Storage(StorageError),
    Schema(SchemaError),
    Exec(ExecError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "{e}"),
            Self::Schema(e) => write!(f, "{e}"),
            Self::Exec(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Schema(e) => Some(e),
            Self::Exec(e) => Some(e),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<SchemaError> for Error {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<ExecError> for Error {
    fn from(e: ExecError) -> Self {
        Self::Exec(e)
    }
}
