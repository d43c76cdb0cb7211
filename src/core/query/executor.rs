//! The query executor (spec §4.5): plans and executes a parsed `Statement`
//! against storage, the index manager, and the schema registry.
//!
//! Grounded on `original_source/src/QueryExecutor.cpp`'s `handleSelect`
//! (ORDER-BY pushdown fast path, base/post-join condition partitioning, the
//! join loop's index-or-scan right-side lookup, GROUP BY with/without
//! aggregates, and the final re-slice of SKIP/LIMIT only when joins/GROUP
//! BY/COUNT were involved), restructured into the teacher's `Executor`-over-
//! borrowed-collaborators shape (`core::query::executor::QueryExecutor`):
//! no global singleton, just `&StorageEngine`/`&IndexManager`/`&SchemaRegistry`
//! passed in and one `execute` entry point dispatching on statement kind.

use std::collections::HashMap;

use crate::core::common::row::format_minimal_decimal;
use crate::core::common::{Error, ExecError, Row};
use crate::core::index::IndexManager;
use crate::core::predicate;
use crate::core::schema::SchemaRegistry;
use crate::core::storage::{ScanCondition, StorageEngine};

use super::ast::{
    BatchStatement, Condition, DeleteStatement, InsertStatement, JoinType, ProjectedColumn,
    Projection, SelectStatement, Statement, UpdateStatement,
};
use super::parser::split_qualifier;

/// What executing one statement produced (spec §4.5 "Output").
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    /// A `SELECT`'s materialized, ordered, paginated result set.
    Rows(Vec<Row>),
    /// The number of rows a write statement inserted, updated, or deleted.
    Affected(usize),
}

/// A row carrying its join-qualifier bookkeeping alongside the fields a
/// `SELECT *`/bare-field projection should actually surface (spec §9's Open
/// Question resolution: "namespace conflicting fields and let the filter
/// match qualified names when the qualifier was supplied", without leaking
/// the synthetic `qualifier.field` bookkeeping keys into a result row).
#[derive(Debug, Clone)]
struct JoinedRow {
    /// The merged row as a `SELECT *` should see it: flat field names,
    /// right-hand side overwriting left on collision (spec §4.5 Step C).
    visible: Row,
    /// `"qualifier.field" -> value`, accumulated across every table this
    /// row has been merged from, for qualifier-aware lookups.
    qualified: HashMap<String, String>,
    /// `field -> [qualifiers that contributed it]`, used to tell a
    /// genuinely single-owner bare field from one that collides across
    /// tables (spec §4.5/§9: a bare field naming more than one table's
    /// index, or none, is an error rather than a silent guess).
    owners: HashMap<String, Vec<String>>,
}

impl JoinedRow {
    fn from_base(row: Row, qualifier: &str) -> Self {
        let qualified = row
            .iter()
            .map(|(k, v)| (format!("{qualifier}.{k}"), v.to_string()))
            .collect();
        let owners = row
            .field_names()
            .map(|k| (k.to_string(), vec![qualifier.to_string()]))
            .collect();
        Self { visible: row, qualified, owners }
    }

    /// Resolves an explicitly qualified field reference; always succeeds,
    /// falling back to the bare visible field when this row carries no
    /// value under that qualifier (e.g. the unmatched side of a `LEFT
    /// OUTER JOIN`).
    fn qualified_field(&self, qualifier: &str, field: &str) -> String {
        self.qualified
            .get(&format!("{qualifier}.{field}"))
            .cloned()
            .unwrap_or_else(|| self.visible.get_or_empty(field).to_string())
    }

    /// Resolves a (possibly qualified) field reference against this row. A
    /// qualified reference always resolves via `qualified_field`. A bare
    /// reference is only valid when exactly one table contributed that
    /// field name: zero owners raises `UnknownField`, more than one raises
    /// `AmbiguousField` (spec §4.5/§9).
    fn field(&self, qualifier: Option<&str>, field: &str) -> Result<String, ExecError> {
        match qualifier {
            Some(q) => Ok(self.qualified_field(q, field)),
            None => match self.owners.get(field).map(Vec::as_slice) {
                None => Err(ExecError::UnknownField(field.to_string())),
                Some([_single]) => Ok(self.visible.get_or_empty(field).to_string()),
                Some(_) => Err(ExecError::AmbiguousField(field.to_string())),
            },
        }
    }

    fn merge_right(&self, right_row: &Row, right_qualifier: &str) -> Self {
        let mut visible = self.visible.clone();
        for (k, v) in right_row.iter() {
            visible.set(k.to_string(), v.to_string());
        }
        let mut qualified = self.qualified.clone();
        for (k, v) in right_row.iter() {
            qualified.insert(format!("{right_qualifier}.{k}"), v.to_string());
        }
        let mut owners = self.owners.clone();
        for (k, _v) in right_row.iter() {
            let entry = owners.entry(k.to_string()).or_default();
            if !entry.iter().any(|q| q == right_qualifier) {
                entry.push(right_qualifier.to_string());
            }
        }
        Self { visible, qualified, owners }
    }
}

/// Combines storage, the index manager, and the schema registry to execute
/// one parsed statement (spec §4.5). Stateless per call: it caches no plans
/// and holds no state of its own beyond the three borrows.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a> {
    storage: &'a StorageEngine,
    index: &'a IndexManager,
    schema: &'a SchemaRegistry,
}

impl<'a> Executor<'a> {
    pub fn new(storage: &'a StorageEngine, index: &'a IndexManager, schema: &'a SchemaRegistry) -> Self {
        Self { storage, index, schema }
    }

    /// Dispatches on statement kind (spec §4.5).
    ///
    /// # Errors
    /// Propagates any storage I/O error a write statement hits.
    pub fn execute(&self, statement: &Statement) -> Result<ExecOutcome, Error> {
        match statement {
            Statement::Insert(stmt) => self.exec_insert(stmt).map(ExecOutcome::Affected),
            Statement::Update(stmt) => self.exec_update(stmt).map(ExecOutcome::Affected),
            Statement::Delete(stmt) => self.exec_delete(stmt).map(ExecOutcome::Affected),
            Statement::Batch(stmt) => self.exec_batch(stmt).map(ExecOutcome::Affected),
            Statement::Select(stmt) => self.exec_select(stmt).map(ExecOutcome::Rows),
        }
    }

    fn exec_insert(&self, stmt: &InsertStatement) -> Result<usize, Error> {
        let key = self.storage.insert_row(&stmt.table, &stmt.row)?;
        self.index.on_insert(&stmt.table, &key, &stmt.row, self.schema);
        Ok(1)
    }

    fn exec_update(&self, stmt: &UpdateStatement) -> Result<usize, Error> {
        let conditions = to_scan_conditions(&stmt.where_clause);
        let keys = self.storage.scan_with(&stmt.table, &conditions, 0, None);
        for key in &keys {
            let old = self.storage.get_row(&stmt.table, key);
            let new = self.storage.update_row(&stmt.table, key, &stmt.patch)?;
            self.index.on_update(&stmt.table, key, &old, &new, self.schema);
        }
        Ok(keys.len())
    }

    fn exec_delete(&self, stmt: &DeleteStatement) -> Result<usize, Error> {
        let keys = match &stmt.keys {
            Some(explicit) => explicit.clone(),
            None => {
                let conditions = to_scan_conditions(&stmt.where_clause);
                self.storage.scan_with(&stmt.table, &conditions, 0, None)
            }
        };
        for key in &keys {
            let old = self.storage.get_row(&stmt.table, key);
            self.storage.delete(&stmt.table, key)?;
            self.index.on_delete(&stmt.table, key, &old, self.schema);
        }
        Ok(keys.len())
    }

    fn exec_batch(&self, stmt: &BatchStatement) -> Result<usize, Error> {
        let mut count = 0;
        for row in &stmt.rows {
            let key = self.storage.insert_row(&stmt.table, row)?;
            self.index.on_insert(&stmt.table, &key, row, self.schema);
            count += 1;
        }
        Ok(count)
    }

    fn exec_select(&self, stmt: &SelectStatement) -> Result<Vec<Row>, Error> {
        if let Some(rows) = self.try_order_by_pushdown(stmt) {
            return Ok(rows);
        }

        let base_qualifier = stmt.base_qualifier().to_string();
        let (base_conditions, post_conditions) = partition_conditions(&base_qualifier, &stmt.where_clause);
        let scan_conditions = to_scan_conditions(&base_conditions);

        let defers_paging = needs_post_materialization_paging(stmt);
        let (scan_skip, scan_limit) = if defers_paging {
            (0, None)
        } else {
            (stmt.skip.unwrap_or(0), stmt.limit)
        };
        let keys = self.storage.scan_with(&stmt.table, &scan_conditions, scan_skip, scan_limit);

        let mut rows: Vec<JoinedRow> = keys
            .iter()
            .map(|k| JoinedRow::from_base(self.storage.get_row(&stmt.table, k), &base_qualifier))
            .collect();

        for join in &stmt.joins {
            rows = self.apply_join(&rows, join);
        }

        let mut post_filtered = Vec::with_capacity(rows.len());
        for row in rows {
            let mut keep = true;
            for c in &post_conditions {
                let value = row.field(c.qualifier.as_deref(), &c.field)?;
                if !predicate::eval(&value, c.op, &c.literal) {
                    keep = false;
                    break;
                }
            }
            if keep {
                post_filtered.push(row);
            }
        }

        let mut output = self.project(&post_filtered, stmt)?;

        if let Some(order) = &stmt.order_by {
            let field = strip_qualifier(&order.field);
            output.sort_by(|a, b| {
                let ord = predicate::compare(a.get_or_empty(&field), b.get_or_empty(&field));
                if order.desc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        if defers_paging {
            output = page(output, stmt.skip.unwrap_or(0), stmt.limit);
        }

        Ok(output)
    }

    /// The ORDER-BY push-down fast path (spec §4.5 Step B): no joins, no
    /// `GROUP BY`/aggregates/`COUNT(*)`, no `WHERE`, and `ORDER BY` names an
    /// indexed field of the base table. Serves the ordering directly from
    /// the index's natural ordering instead of materialising and sorting.
    fn try_order_by_pushdown(&self, stmt: &SelectStatement) -> Option<Vec<Row>> {
        if !stmt.joins.is_empty()
            || stmt.group_by.is_some()
            || stmt.projection.has_aggregates()
            || matches!(stmt.projection, Projection::CountStar)
            || !stmt.where_clause.is_empty()
        {
            return None;
        }
        let order = stmt.order_by.as_ref()?;
        if !self.index.has_index(&stmt.table, &order.field) {
            return None;
        }

        let keys = self.index.ordered_keys(&stmt.table, &order.field, order.desc);
        let skip = stmt.skip.unwrap_or(0);
        let limit = stmt.limit.unwrap_or(usize::MAX);
        let rows: Vec<Row> = keys
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|k| self.storage.get_row(&stmt.table, &k))
            .collect();

        Some(match &stmt.projection {
            Projection::Columns(cols) => rows.iter().map(|r| project_one_row(r, cols)).collect(),
            Projection::All | Projection::CountStar => rows,
        })
    }

    /// Step C: for each current row, look up matching right-table rows by
    /// index if one exists on the join field, else fall back to a full scan
    /// of the right namespace; `LEFT OUTER` keeps unmatched lefts.
    fn apply_join(&self, rows: &[JoinedRow], join: &super::ast::JoinClause) -> Vec<JoinedRow> {
        let mut merged = Vec::new();
        for row in rows {
            let left_value = row.qualified_field(&join.left_qualifier, &join.left_field);
            let right_keys = if self.index.has_index(&join.table, &join.right_field) {
                self.index.lookup(&join.table, &join.right_field, &left_value)
            } else {
                self.storage
                    .scan(&join.table)
                    .into_iter()
                    .filter_map(|(k, json)| {
                        let decoded = Row::from_json_str(&json).ok()?;
                        (decoded.get_or_empty(&join.right_field) == left_value).then_some(k)
                    })
                    .collect()
            };

            if right_keys.is_empty() {
                if join.join_type == JoinType::LeftOuter {
                    merged.push(row.clone());
                }
                continue;
            }
            for right_key in &right_keys {
                let right_row = self.storage.get_row(&join.table, right_key);
                merged.push(row.merge_right(&right_row, &join.alias));
            }
        }
        merged
    }

    /// Step E: aggregation/projection, dispatching on `GROUP BY`/`COUNT(*)`/
    /// `SUM` the way spec §4.5 Step E lays out.
    ///
    /// # Errors
    /// Propagates `ExecError::UnknownField`/`AmbiguousField` when a bare
    /// field named in `GROUP BY`, `SUM(...)`, or the projection list matches
    /// none or more than one of the joined tables (spec.md:198).
    fn project(&self, rows: &[JoinedRow], stmt: &SelectStatement) -> Result<Vec<Row>, Error> {
        if let Some(group_by) = &stmt.group_by {
            let (group_qualifier, group_field) = split_qualifier(group_by);
            let sum_cols = stmt.projection.sum_columns();
            return if sum_cols.is_empty() {
                Ok(aggregate_count(rows, group_qualifier.as_deref(), &group_field)?)
            } else {
                Ok(aggregate_sum(rows, group_qualifier.as_deref(), &group_field, &sum_cols)?)
            };
        }
        if matches!(stmt.projection, Projection::CountStar) {
            return Ok(vec![Row::from_pairs([("count".to_string(), rows.len().to_string())])]);
        }
        let sum_cols = stmt.projection.sum_columns();
        if !sum_cols.is_empty() {
            return Ok(aggregate_sum_ungrouped(rows, &sum_cols)?);
        }
        match &stmt.projection {
            Projection::All => Ok(rows.iter().map(|r| r.visible.clone()).collect()),
            Projection::Columns(cols) => rows
                .iter()
                .map(|r| project_one_joined(r, cols))
                .collect::<Result<Vec<_>, _>>()
                .map_err(Error::from),
            Projection::CountStar => Ok(Vec::new()),
        }
    }
}

/// Step A: sorts `WHERE` predicates into ones the base-table scan can
/// evaluate directly (unqualified, or qualified with the base table's own
/// name/alias) versus ones that must wait until after the join (spec §4.5
/// Step A).
fn partition_conditions(base_qualifier: &str, conditions: &[Condition]) -> (Vec<Condition>, Vec<Condition>) {
    let mut base = Vec::new();
    let mut post = Vec::new();
    for c in conditions {
        match &c.qualifier {
            None => base.push(c.clone()),
            Some(q) if q == base_qualifier => base.push(Condition {
                qualifier: None,
                field: c.field.clone(),
                op: c.op,
                literal: c.literal.clone(),
            }),
            Some(_) => post.push(c.clone()),
        }
    }
    (base, post)
}

fn to_scan_conditions(conditions: &[Condition]) -> Vec<ScanCondition> {
    conditions
        .iter()
        .map(|c| ScanCondition {
            field: c.field.clone(),
            op: c.op,
            literal: c.literal.clone(),
        })
        .collect()
}

/// True when SKIP/LIMIT must be re-applied after materialisation rather
/// than pushed into the base scan (spec §4.5 Step G / §9 "Pagination
/// position"): joins, GROUP BY, COUNT(*), or SUM all require seeing every
/// matching row before pagination can be correct.
fn needs_post_materialization_paging(stmt: &SelectStatement) -> bool {
    !stmt.joins.is_empty()
        || stmt.group_by.is_some()
        || matches!(stmt.projection, Projection::CountStar)
        || stmt.projection.has_aggregates()
}

fn page(rows: Vec<Row>, skip: usize, limit: Option<usize>) -> Vec<Row> {
    let start = skip.min(rows.len());
    let end = match limit {
        Some(l) => start.saturating_add(l).min(rows.len()),
        None => rows.len(),
    };
    rows[start..end].to_vec()
}

fn strip_qualifier(field: &str) -> String {
    split_qualifier(field).1
}

/// Projects a plain (single-table, never ambiguous) row for the `ORDER BY`
/// pushdown fast path, which never involves a join.
fn project_one_row(row: &Row, cols: &[ProjectedColumn]) -> Row {
    let mut out = Row::new();
    for col in cols {
        if let ProjectedColumn::Field(name) = col {
            let bare = strip_qualifier(name);
            out.set(name.clone(), row.get_or_empty(&bare).to_string());
        }
    }
    out
}

/// Projects a (possibly joined) row, resolving each named column through
/// `JoinedRow::field` so a bare name that collides across tables raises
/// `AmbiguousField`/`UnknownField` instead of silently picking a value.
fn project_one_joined(row: &JoinedRow, cols: &[ProjectedColumn]) -> Result<Row, ExecError> {
    let mut out = Row::new();
    for col in cols {
        if let ProjectedColumn::Field(name) = col {
            let (qualifier, bare) = split_qualifier(name);
            let value = row.field(qualifier.as_deref(), &bare)?;
            out.set(name.clone(), value);
        }
    }
    Ok(out)
}

/// `GROUP BY` without aggregates: one `{group_field: value, count: n}` row
/// per distinct group value (spec §4.5 Step E), in first-seen order.
fn aggregate_count(
    rows: &[JoinedRow],
    group_qualifier: Option<&str>,
    group_field: &str,
) -> Result<Vec<Row>, ExecError> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let key = row.field(group_qualifier, group_field)?;
        if !counts.contains_key(&key) {
            order.push(key.clone());
        }
        *counts.entry(key).or_insert(0) += 1;
    }
    Ok(order
        .into_iter()
        .map(|key| {
            Row::from_pairs([
                (group_field.to_string(), key.clone()),
                ("count".to_string(), counts[&key].to_string()),
            ])
        })
        .collect())
}

/// `GROUP BY` with `SUM` aggregates: per group, `sum_alias += numeric(field)`
/// over every row in the group, invalid numeric contents contributing 0
/// (spec §4.5 Step E, §8 property 8).
fn aggregate_sum(
    rows: &[JoinedRow],
    group_qualifier: Option<&str>,
    group_field: &str,
    sum_cols: &[(&str, &str)],
) -> Result<Vec<Row>, ExecError> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, Vec<f64>> = HashMap::new();
    for row in rows {
        let key = row.field(group_qualifier, group_field)?;
        if !sums.contains_key(&key) {
            order.push(key.clone());
        }
        let acc = sums.entry(key).or_insert_with(|| vec![0.0; sum_cols.len()]);
        for (i, (field, _alias)) in sum_cols.iter().enumerate() {
            let (qualifier, bare) = split_qualifier(field);
            let value = row.field(qualifier.as_deref(), &bare)?.parse::<f64>().unwrap_or(0.0);
            acc[i] += value;
        }
    }
    Ok(order
        .into_iter()
        .map(|key| {
            let mut out = Row::new();
            out.set(group_field.to_string(), key.clone());
            let totals = &sums[&key];
            for (i, (_field, alias)) in sum_cols.iter().enumerate() {
                out.set((*alias).to_string(), format_minimal_decimal(totals[i]));
            }
            out
        })
        .collect())
}

/// `SUM` with no `GROUP BY`: a single output row totalling every matching
/// row (a natural reading of spec §4.5 Step E that the distilled spec
/// leaves silent on; see DESIGN.md).
fn aggregate_sum_ungrouped(rows: &[JoinedRow], sum_cols: &[(&str, &str)]) -> Result<Vec<Row>, ExecError> {
    let mut out = Row::new();
    for (field, alias) in sum_cols {
        let (qualifier, bare) = split_qualifier(field);
        let mut total = 0.0;
        for r in rows {
            total += r.field(qualifier.as_deref(), &bare)?.parse::<f64>().unwrap_or(0.0);
        }
        out.set((*alias).to_string(), format_minimal_decimal(total));
    }
    Ok(vec![out])
}
