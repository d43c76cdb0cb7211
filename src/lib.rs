#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::complexity,
    clippy::correctness,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    deprecated,
    unused,
    clippy::todo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::unreachable,
    clippy::missing_safety_doc,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::missing_docs
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::option_if_let_else,
    clippy::cognitive_complexity,
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::struct_excessive_bools,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp,
    clippy::doc_markdown,
    clippy::wildcard_imports,
    clippy::struct_field_names,
    clippy::module_inception,
    clippy::missing_fields_in_debug,
    clippy::use_self,
    clippy::return_self_not_must_use,
    clippy::bool_to_int_with_if,
    clippy::partial_pub_fields,
    clippy::multiple_crate_versions,
    clippy::single_match_else,
    clippy::implicit_hasher,
    clippy::linkedlist,
    clippy::default_trait_access,
    clippy::missing_transmute_annotations,
    clippy::multiple_inherent_impl,
    clippy::get_unwrap,
    clippy::impl_trait_in_params,
    clippy::future_not_send,
    clippy::type_complexity,
    clippy::result_large_err,
    clippy::large_stack_frames,
    clippy::significant_drop_in_scrutinee,
    clippy::significant_drop_tightening,
    clippy::items_after_statements,
    clippy::match_wildcard_for_single_variants,
    clippy::needless_pass_by_value,
    clippy::redundant_closure_for_method_calls,
    clippy::unused_async,
    clippy::unnecessary_wraps,
    clippy::trivially_copy_pass_by_ref,
    clippy::match_same_arms,
    clippy::explicit_deref_methods,
    clippy::explicit_iter_loop,
    clippy::explicit_into_iter_loop,
    clippy::from_iter_instead_of_collect,
    clippy::if_not_else,
    clippy::equatable_if_let,
    clippy::or_fun_call,
    clippy::iter_without_into_iter,
    clippy::infinite_loop,
    clippy::ref_as_ptr,
    clippy::ref_option_ref,
    clippy::option_option,
    clippy::match_bool,
    clippy::let_underscore_untyped,
    clippy::empty_enum_variants_with_brackets,
    clippy::pattern_type_mismatch,
    clippy::ignored_unit_patterns,
    clippy::redundant_pub_crate,
    clippy::allow_attributes,
    clippy::no_effect_underscore_binding,
    clippy::used_underscore_binding,
    clippy::tests_outside_test_module
)]

//! # quarkql - an embeddable, schema-indexed document store
//!
//! `quarkql` exposes a restricted SQL dialect over a persistent ordered
//! key-value engine. Each table is a keyspace of opaque JSON documents; a
//! configurable subset of fields is maintained as in-memory secondary
//! indexes to accelerate equality lookups, joins, and ordered scans.
//!
//! ## Scope
//!
//! The engine covers: a SQL parser for `INSERT`/`UPDATE`/`DELETE`/`BATCH`
//! and a `SELECT` with `JOIN`/`WHERE`/`GROUP BY`/`ORDER BY`/`SKIP`/`LIMIT`
//! and a `SUM`/`COUNT` aggregate form; an index manager with incremental
//! maintenance; a storage interface over an ordered KV engine with
//! column-family-style namespaces; and a query executor tying the three
//! together. It does not provide transactional isolation across
//! statements, subqueries, composite indexes, or a cost-based optimizer —
//! see `DESIGN.md` for the full Non-goals list.
//!
//! ## Quick start
//!
//! ```no_run
//! use quarkql::{Connection, StoreConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = Connection::open(&StoreConfig::default())?;
//!
//! conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada","age":37}"#);
//!
//! let result = conn.query("SELECT * FROM users WHERE name='Ada'")?;
//! assert_eq!(result.row_count(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`api`**: the bindings façade (`Connection::query`/`Connection::execute`).
//! - **`core::query`**: the SQL parser and the executor that plans and runs
//!   a parsed statement against storage and the index manager.
//! - **`core::index`**: in-memory secondary indexes, rebuilt at startup and
//!   incrementally maintained on every write.
//! - **`core::storage`**: the ordered key-value engine and the row-level
//!   helpers (`insert`/`update`/`scan_with`) built on top of it.
//! - **`core::predicate`**: `field op literal` evaluation shared by `WHERE`
//!   filtering, `ORDER BY` comparison, and `LIKE` matching.
//! - **`core::schema`**: the startup-loaded, immutable table schema registry.

pub mod api;
pub mod core;

pub use api::{Connection, ExecuteOutcome, QueryResult};
pub use crate::core::common::{Error, ExecError, ParseError, Row, SchemaError, StorageError};
pub use crate::core::config::StoreConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_select_round_trips_through_the_public_api() {
        let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"name":"str"}}}"#)
            .expect("ephemeral connection");

        let outcome = conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada","age":37}"#);
        assert!(outcome.success);

        let result = conn
            .query("SELECT * FROM users WHERE name='Ada'")
            .expect("query should succeed");
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.rows()[0].get("age"), Some("37"));
    }

    #[test]
    fn delete_then_count_reflects_removal() {
        let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"name":"str"}}}"#)
            .expect("ephemeral connection");
        conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada"}"#);
        conn.execute(r#"INSERT INTO users VALUES {"id":"u2","name":"Grace"}"#);

        let outcome = conn.execute(r#"DELETE FROM users KEYS ["u1","u2"]"#);
        assert!(outcome.success);
        assert_eq!(outcome.affected, 2);

        let result = conn
            .query("SELECT COUNT(*) FROM users WHERE name='Ada'")
            .expect("query should succeed");
        assert_eq!(result.rows()[0].get("count"), Some("0"));
    }
}
