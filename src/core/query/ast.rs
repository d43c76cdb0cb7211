//! The query AST (spec §4.4): the eight accepted statement shapes, plus the
//! `SELECT` sub-structures (projection, join, group by, order by).

use crate::core::common::Row;
use crate::core::predicate::Op;

/// One `field op 'literal'` fragment from a `WHERE`/`ON` clause, with an
/// optional table/alias qualifier (spec §4.4 WHERE: "`field` may be
/// qualified (`alias.field`)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub qualifier: Option<String>,
    pub field: String,
    pub op: Op,
    pub literal: String,
}

impl Condition {
    /// The field name a table scan should evaluate this condition against,
    /// ignoring any qualifier (used once a condition has been routed to the
    /// table it belongs to).
    pub fn bare_field(&self) -> &str {
        &self.field
    }
}

/// `INSERT INTO <tbl> VALUES {...}` or `INSERT INTO <tbl> (cols) VALUES (vals)`.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub table: String,
    pub row: Row,
}

/// `UPDATE <tbl> SET {...} | SET col = 'val' [WHERE ...]`.
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub table: String,
    pub patch: Row,
    pub where_clause: Vec<Condition>,
}

/// `DELETE FROM <tbl> KEYS [...] | [WHERE ...]`.
#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub table: String,
    pub keys: Option<Vec<String>>,
    pub where_clause: Vec<Condition>,
}

/// `BATCH <tbl> {...}`: each value of the outer object is itself a row.
#[derive(Debug, Clone)]
pub struct BatchStatement {
    pub table: String,
    pub rows: Vec<Row>,
}

/// A single projected column: a bare/qualified field, or a `SUM(field) [AS alias]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectedColumn {
    Field(String),
    Sum { field: String, alias: String },
}

/// What a `SELECT`'s column list resolved to (spec §4.4 Projection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    CountStar,
    Columns(Vec<ProjectedColumn>),
}

impl Projection {
    pub fn sum_columns(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Columns(cols) => cols
                .iter()
                .filter_map(|c| match c {
                    ProjectedColumn::Sum { field, alias } => Some((field.as_str(), alias.as_str())),
                    ProjectedColumn::Field(_) => None,
                })
                .collect(),
            Self::All | Self::CountStar => Vec::new(),
        }
    }

    pub fn has_aggregates(&self) -> bool {
        !self.sum_columns().is_empty()
    }
}

/// `INNER` (default) or `LEFT OUTER` (spec §4.4 JOIN).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
}

/// One `JOIN <tbl> [alias] ON l.field = r.field` clause.
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: String,
    pub left_qualifier: String,
    pub left_field: String,
    pub right_qualifier: String,
    pub right_field: String,
}

/// A single `ORDER BY field [ASC|DESC]` (default ASC).
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub desc: bool,
}

/// A fully parsed `SELECT` (spec §4.4 shape 8, §4.5 plan inputs).
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub projection: Projection,
    pub table: String,
    pub alias: Option<String>,
    pub joins: Vec<JoinClause>,
    pub where_clause: Vec<Condition>,
    pub group_by: Option<String>,
    pub order_by: Option<OrderBy>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl SelectStatement {
    /// The name the base table is addressed by in qualified conditions/joins:
    /// its alias if one was given, else its own name (spec §4.4 "qualifiers
    /// resolve via the alias map").
    pub fn base_qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// The top-level parsed statement (spec §4.4: exactly eight accepted shapes).
#[derive(Debug, Clone)]
pub enum Statement {
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Batch(BatchStatement),
    Select(SelectStatement),
}
