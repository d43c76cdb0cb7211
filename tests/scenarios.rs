//! End-to-end scenarios S1-S6 from spec §8, driven through the public
//! `Connection` API rather than the internal executor directly.

use quarkql::Connection;

#[test]
fn s1_insert_then_select_by_indexed_field() {
    let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"name":"str"}}}"#).unwrap();

    let outcome = conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada","age":37}"#);
    assert!(outcome.success);

    let result = conn.query("SELECT * FROM users WHERE name='Ada'").unwrap();
    assert_eq!(result.row_count(), 1);
    let row = &result.rows()[0];
    assert_eq!(row.get("id"), Some("u1"));
    assert_eq!(row.get("name"), Some("Ada"));
    assert_eq!(row.get("age"), Some("37"));
}

#[test]
fn s2_update_merges_and_reports_affected() {
    let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"name":"str"}}}"#).unwrap();
    conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada","age":37}"#);

    let outcome = conn.execute(r#"UPDATE users SET {"age":38} WHERE name='Ada'"#);
    assert!(outcome.success);
    assert_eq!(outcome.affected, 1);

    let result = conn.query("SELECT age FROM users WHERE id='u1'").unwrap();
    assert_eq!(result.rows()[0].get("age"), Some("38"));
}

#[test]
fn s3_order_by_desc_limit_uses_pushdown() {
    let conn = Connection::open_ephemeral(r#"{"items":{"indexedFields":{"stock":"int"}}}"#).unwrap();
    for (id, stock) in [("u1", "5"), ("u2", "2"), ("u3", "9")] {
        conn.execute(&format!(r#"INSERT INTO items VALUES {{"id":"{id}","stock":"{stock}"}}"#));
    }

    let result = conn.query("SELECT * FROM items ORDER BY stock DESC LIMIT 2").unwrap();
    let ids: Vec<&str> = result.iter().map(|r| r.get("id").unwrap_or("")).collect();
    assert_eq!(ids, vec!["u3", "u1"]);
}

#[test]
fn s4_join_merges_both_tables() {
    let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"id":"str"}},"orders":{}}"#).unwrap();
    conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada"}"#);
    conn.execute(r#"INSERT INTO orders VALUES {"id":"o1","user":"u1"}"#);

    let result = conn
        .query("SELECT * FROM orders JOIN users ON orders.user=users.id")
        .unwrap();
    assert_eq!(result.row_count(), 1);
    let row = &result.rows()[0];
    assert_eq!(row.get("id"), Some("u1"));
    assert_eq!(row.get("name"), Some("Ada"));
}

#[test]
fn s5_group_by_sum() {
    let conn = Connection::open_ephemeral(r#"{"ledger":{}}"#).unwrap();
    conn.execute(r#"INSERT INTO ledger VALUES {"id":"l1","user":"a","amount":"10"}"#);
    conn.execute(r#"INSERT INTO ledger VALUES {"id":"l2","user":"a","amount":"5"}"#);
    conn.execute(r#"INSERT INTO ledger VALUES {"id":"l3","user":"b","amount":"3"}"#);

    let result = conn
        .query("SELECT user, SUM(amount) AS total FROM ledger GROUP BY user")
        .unwrap();
    let totals: std::collections::HashMap<&str, &str> = result
        .iter()
        .map(|r| (r.get("user").unwrap_or(""), r.get("total").unwrap_or("")))
        .collect();
    assert_eq!(totals.get("a"), Some(&"15"));
    assert_eq!(totals.get("b"), Some(&"3"));
}

#[test]
fn s6_delete_by_keys_then_count_is_zero() {
    let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"name":"str"}}}"#).unwrap();
    conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada"}"#);
    conn.execute(r#"INSERT INTO users VALUES {"id":"u2","name":"Grace"}"#);

    let outcome = conn.execute(r#"DELETE FROM users KEYS ["u1","u2"]"#);
    assert!(outcome.success);
    assert_eq!(outcome.affected, 2);

    let result = conn.query("SELECT COUNT(*) FROM users WHERE name='Ada'").unwrap();
    assert_eq!(result.rows()[0].get("count"), Some("0"));
}

#[test]
fn batch_insert_reports_total_row_count() {
    let conn = Connection::open_ephemeral(r#"{"items":{"indexedFields":{"stock":"int"}}}"#).unwrap();
    let outcome = conn.execute(
        r#"BATCH items {"a":{"id":"i1","stock":"5"},"b":{"id":"i2","stock":"2"},"c":{"id":"i3","stock":"9"}}"#,
    );
    assert!(outcome.success);
    assert_eq!(outcome.affected, 3);

    let result = conn.query("SELECT * FROM items ORDER BY stock ASC").unwrap();
    assert_eq!(result.row_count(), 3);
}

#[test]
fn left_outer_join_keeps_unmatched_left_rows() {
    let conn = Connection::open_ephemeral(r#"{"users":{"indexedFields":{"id":"str"}},"orders":{}}"#).unwrap();
    conn.execute(r#"INSERT INTO orders VALUES {"id":"o1","user":"ghost"}"#);

    let result = conn
        .query("SELECT * FROM orders LEFT OUTER JOIN users ON orders.user=users.id")
        .unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows()[0].get("id"), Some("o1"));
    assert!(result.rows()[0].get("name").is_none());
}

#[test]
fn like_predicate_matches_substring() {
    let conn = Connection::open_ephemeral(r#"{"users":{}}"#).unwrap();
    conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada Lovelace"}"#);
    conn.execute(r#"INSERT INTO users VALUES {"id":"u2","name":"Grace Hopper"}"#);

    let result = conn.query("SELECT * FROM users WHERE name LIKE '%Lovelace'").unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows()[0].get("id"), Some("u1"));
}

#[test]
fn query_rejects_write_statements() {
    let conn = Connection::open_ephemeral(r#"{"users":{}}"#).unwrap();
    let err = conn.query(r#"INSERT INTO users VALUES {"id":"u1"}"#);
    assert!(err.is_err());
}

#[test]
fn persists_across_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let schema_json = r#"{"users":{"indexedFields":{"name":"str"}}}"#;
    let schema_path = dir.path().join("schema.json");
    std::fs::write(&schema_path, schema_json).unwrap();

    let config = quarkql::StoreConfig {
        data_dir: dir.path().join("data").to_string_lossy().into_owned(),
        schema_path: schema_path.to_string_lossy().into_owned(),
    };

    {
        let conn = Connection::open(&config).unwrap();
        conn.execute(r#"INSERT INTO users VALUES {"id":"u1","name":"Ada"}"#);
    }

    let reopened = Connection::open(&config).unwrap();
    let result = reopened.query("SELECT * FROM users WHERE name='Ada'").unwrap();
    assert_eq!(result.row_count(), 1);
}
