//! A small CLI that opens a store and runs one SQL string from argv — the
//! Rust-native equivalent of the original `src/main.cpp`'s interactive
//! session, built with `clap` (already in the dependency table for the
//! teacher's own CLI surfaces) instead of hand-rolled argv parsing.

use std::process::ExitCode;

use clap::Parser;
use quarkql::{Connection, StoreConfig};

/// Run a single SQL statement against a `quarkql` store.
#[derive(Parser, Debug)]
#[command(name = "quarkql", version, about)]
struct Cli {
    /// Directory holding the store's per-table namespace files.
    #[arg(long, default_value = "quarkql_data")]
    data_dir: String,

    /// Path to the JSON schema document (spec §6).
    #[arg(long, default_value = "schema.json")]
    schema: String,

    /// The SQL statement to run.
    sql: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = StoreConfig {
        data_dir: cli.data_dir,
        schema_path: cli.schema,
    };

    let conn = match Connection::open(&config) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("error opening store: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.sql.trim_start().to_ascii_uppercase().starts_with("SELECT") {
        match conn.query(&cli.sql) {
            Ok(result) => {
                for row in result.iter() {
                    let rendered: Vec<String> =
                        row.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    println!("{}", rendered.join(", "));
                }
                println!("({} row(s))", result.row_count());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("query error: {e}");
                ExitCode::FAILURE
            }
        }
    } else {
        let outcome = conn.execute(&cli.sql);
        if outcome.success {
            println!("OK ({} row(s) affected)", outcome.affected);
            ExitCode::SUCCESS
        } else {
            eprintln!("execute error: {}", outcome.error.unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}
