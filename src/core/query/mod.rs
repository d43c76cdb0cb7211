//! The SQL parser and query executor (spec §4.4, §4.5): turns a SQL string
//! into a `Statement` AST and runs it against storage, the index manager,
//! and the schema registry.

pub mod ast;
pub mod executor;
pub mod parser;

pub use ast::Statement;
pub use executor::{ExecOutcome, Executor};
pub use parser::parse;
