//! The SQL parser (spec §4.4): pattern-matches one statement against the
//! eight accepted shapes and builds a `Statement` AST.
//!
//! Grounded on `original_source/src/SqlParser.cpp`: one `Regex` per
//! statement shape, tried in declaration order, with sub-clauses (`WHERE`,
//! `JOIN`, `GROUP BY`, `ORDER BY`, `SKIP`/`LIMIT`) picked out of the
//! matched text by further regexes rather than a tokenizer/recursive-descent
//! grammar — this dialect's eight fixed shapes don't need one, and the
//! teacher's own tokenizer is built for a much larger grammar (arbitrary
//! expressions, `CREATE TABLE`, typed literals) spec.md explicitly declines.
//! Patterns are compiled once into `OnceLock<Regex>` statics, the modern
//! replacement for the original's file-scope `static const std::regex`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value as Json;

use crate::core::common::{ParseError, Row};
use crate::core::predicate::Op;

use super::ast::{
    BatchStatement, Condition, DeleteStatement, InsertStatement, JoinClause, JoinType, OrderBy,
    ProjectedColumn, Projection, SelectStatement, Statement, UpdateStatement,
};

macro_rules! static_regex {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            #[allow(clippy::expect_used)] // pattern is a fixed literal; a failed compile is a crate bug
            RE.get_or_init(|| Regex::new($pat).expect("static regex is valid"))
        }
    };
}

static_regex!(insert_json_re, r"(?is)^INSERT\s+INTO\s+(\w+)\s+VALUES\s*(\{.*\})$");
static_regex!(
    insert_positional_re,
    r"(?is)^INSERT\s+INTO\s+(\w+)\s*\(([^)]+)\)\s*VALUES\s*\(([^)]+)\)$"
);
static_regex!(
    update_json_re,
    r"(?is)^UPDATE\s+(\w+)\s+SET\s*(\{.*\})(?:\s+WHERE\s+(.+))?$"
);
static_regex!(
    update_field_re,
    r"(?is)^UPDATE\s+(\w+)\s+SET\s+(\S+)\s*=\s*'([^']*)'(?:\s+WHERE\s+(.+))?$"
);
static_regex!(
    delete_keys_re,
    r"(?is)^DELETE\s+FROM\s+(\w+)\s+KEYS\s*(\[.*\])$"
);
static_regex!(delete_re, r"(?is)^DELETE\s+FROM\s+(\w+)(?:\s+WHERE\s+(.+))?$");
static_regex!(batch_re, r"(?is)^BATCH\s+(\w+)\s*(\{.*\})$");
static_regex!(
    select_header_re,
    r"(?is)^SELECT\s+(.+?)\s+FROM\s+(\w+)(?:\s+(\w+))?"
);
static_regex!(
    cond_re,
    r"(?i)(\w+(?:\.\w+)?)\s*(=|!=|<=|>=|<|>|LIKE)\s*'([^']*)'"
);
static_regex!(
    join_re,
    r"(?i)\b(INNER\s+JOIN|LEFT\s+OUTER\s+JOIN|JOIN)\s+(.+?)\s+ON\s+(\w+)\.(\w+)\s*=\s*(\w+)\.(\w+)"
);
static_regex!(group_by_re, r"(?i)\bGROUP\s+BY\s+(\w+(?:\.\w+)?)");
static_regex!(
    order_by_re,
    r"(?i)\bORDER\s+BY\s+(\w+(?:\.\w+)?)(?:\s+(ASC|DESC))?\b"
);
static_regex!(skip_re, r"(?i)\bSKIP\s+(\d+)\b");
static_regex!(limit_re, r"(?i)\bLIMIT\s+(\d+)\b");
static_regex!(sum_col_re, r"(?i)^SUM\(\s*(\w+(?:\.\w+)?)\s*\)(?:\s+AS\s+(\w+))?$");
static_regex!(count_star_re, r"(?i)^COUNT\(\s*\*\s*\)$");

const SELECT_ALIAS_STOPWORDS: &[&str] = &[
    "JOIN", "INNER", "LEFT", "WHERE", "GROUP", "ORDER", "SKIP", "LIMIT",
];

/// Parses one SQL statement, optionally terminated by `;` (spec §4.4).
///
/// # Errors
/// Returns `ParseError::UnsupportedShape` if the input matches none of the
/// eight accepted statement shapes, or a more specific `ParseError` variant
/// if a matched shape's sub-clause (a JSON literal, an operator, a date)
/// fails to parse.
pub fn parse(sql: &str) -> Result<Statement, ParseError> {
    let trimmed = sql.trim();
    let body = trimmed.strip_suffix(';').map_or(trimmed, str::trim_end).trim();

    if let Some(caps) = insert_json_re().captures(body) {
        let table = caps[1].to_string();
        let row = parse_json_object(&caps[2])?;
        return Ok(Statement::Insert(InsertStatement { table, row }));
    }
    if let Some(caps) = insert_positional_re().captures(body) {
        let table = caps[1].to_string();
        let cols: Vec<&str> = caps[2].split(',').map(str::trim).collect();
        let vals: Vec<&str> = caps[3].split(',').map(str::trim).collect();
        if cols.len() != vals.len() {
            return Err(ParseError::UnsupportedShape(body.to_string()));
        }
        let row = Row::from_pairs(
            cols.into_iter()
                .zip(vals)
                .map(|(c, v)| (c.to_string(), v.to_string())),
        );
        return Ok(Statement::Insert(InsertStatement { table, row }));
    }
    if let Some(caps) = update_json_re().captures(body) {
        let table = caps[1].to_string();
        let patch = parse_json_object(&caps[2])?;
        let where_clause = caps
            .get(3)
            .map(|m| parse_conditions(m.as_str()))
            .transpose()?
            .unwrap_or_default();
        return Ok(Statement::Update(UpdateStatement {
            table,
            patch,
            where_clause,
        }));
    }
    if let Some(caps) = update_field_re().captures(body) {
        let table = caps[1].to_string();
        let patch = Row::from_pairs([(caps[2].to_string(), caps[3].to_string())]);
        let where_clause = caps
            .get(4)
            .map(|m| parse_conditions(m.as_str()))
            .transpose()?
            .unwrap_or_default();
        return Ok(Statement::Update(UpdateStatement {
            table,
            patch,
            where_clause,
        }));
    }
    if let Some(caps) = delete_keys_re().captures(body) {
        let table = caps[1].to_string();
        let keys = parse_json_string_array(&caps[2])?;
        return Ok(Statement::Delete(DeleteStatement {
            table,
            keys: Some(keys),
            where_clause: Vec::new(),
        }));
    }
    if let Some(caps) = delete_re().captures(body) {
        let table = caps[1].to_string();
        let where_clause = caps
            .get(2)
            .map(|m| parse_conditions(m.as_str()))
            .transpose()?
            .unwrap_or_default();
        return Ok(Statement::Delete(DeleteStatement {
            table,
            keys: None,
            where_clause,
        }));
    }
    if let Some(caps) = batch_re().captures(body) {
        let table = caps[1].to_string();
        let rows = parse_json_row_map(&caps[2])?;
        return Ok(Statement::Batch(BatchStatement { table, rows }));
    }
    if let Some(caps) = select_header_re().captures(body) {
        return parse_select(body, &caps).map(Statement::Select);
    }

    Err(ParseError::UnsupportedShape(body.to_string()))
}

fn parse_json_object(text: &str) -> Result<Row, ParseError> {
    let value: Json =
        serde_json::from_str(text).map_err(|e| ParseError::BadJson(format!("{text}: {e}")))?;
    if !value.is_object() {
        return Err(ParseError::BadJson(text.to_string()));
    }
    Ok(Row::from_json_value(&value))
}

fn parse_json_string_array(text: &str) -> Result<Vec<String>, ParseError> {
    serde_json::from_str::<Vec<String>>(text).map_err(|e| ParseError::BadJson(format!("{text}: {e}")))
}

fn parse_json_row_map(text: &str) -> Result<Vec<Row>, ParseError> {
    let value: Json =
        serde_json::from_str(text).map_err(|e| ParseError::BadJson(format!("{text}: {e}")))?;
    let Json::Object(map) = value else {
        return Err(ParseError::BadJson(text.to_string()));
    };
    Ok(map.values().map(Row::from_json_value).collect())
}

/// Finds every `field op 'literal'` fragment in `text` (spec §4.4 WHERE: a
/// flat conjunction), splitting off an optional `alias.` qualifier.
fn parse_conditions(text: &str) -> Result<Vec<Condition>, ParseError> {
    let mut out = Vec::new();
    for caps in cond_re().captures_iter(text) {
        let raw_field = &caps[1];
        let (qualifier, field) = split_qualifier(raw_field);
        let op = Op::parse(&caps[2])?;
        out.push(Condition {
            qualifier,
            field,
            op,
            literal: caps[3].to_string(),
        });
    }
    Ok(out)
}

/// Splits `alias.field` into `(Some(alias), field)`, or `(None, field)` for
/// a bare field (spec §4.4 WHERE: "`field` may be qualified").
pub(crate) fn split_qualifier(raw: &str) -> (Option<String>, String) {
    raw.split_once('.')
        .map_or((None, raw.to_string()), |(q, f)| (Some(q.to_string()), f.to_string()))
}

fn parse_select(body: &str, header: &regex::Captures<'_>) -> Result<SelectStatement, ParseError> {
    let table = header[2].to_string();
    let alias = header.get(3).and_then(|m| {
        let word = m.as_str();
        let is_keyword = SELECT_ALIAS_STOPWORDS
            .iter()
            .any(|kw| kw.eq_ignore_ascii_case(word));
        (!is_keyword).then(|| word.to_string())
    });

    let projection = parse_projection(&header[1])?;
    let joins = parse_joins(body)?;
    let where_clause = parse_conditions(body)?;
    let group_by = group_by_re().captures(body).map(|c| c[1].to_string());
    let order_by = order_by_re().captures(body).map(|c| OrderBy {
        field: c[1].to_string(),
        desc: c.get(2).is_some_and(|m| m.as_str().eq_ignore_ascii_case("DESC")),
    });
    let skip = skip_re()
        .captures(body)
        .and_then(|c| c[1].parse::<usize>().ok());
    let limit = limit_re()
        .captures(body)
        .and_then(|c| c[1].parse::<usize>().ok());

    Ok(SelectStatement {
        projection,
        table,
        alias,
        joins,
        where_clause,
        group_by,
        order_by,
        skip,
        limit,
    })
}

fn parse_projection(raw: &str) -> Result<Projection, ParseError> {
    let cols: Vec<&str> = raw.split(',').map(str::trim).collect();

    if cols.len() == 1 && cols[0] == "*" {
        return Ok(Projection::All);
    }
    if cols.len() == 1 && count_star_re().is_match(cols[0]) {
        return Ok(Projection::CountStar);
    }
    if cols.iter().any(|c| count_star_re().is_match(c)) {
        // spec §4.4: "COUNT(*) is mutually exclusive with other projections".
        return Err(ParseError::UnsupportedShape(raw.to_string()));
    }

    let mut out = Vec::with_capacity(cols.len());
    for col in cols {
        if let Some(caps) = sum_col_re().captures(col) {
            let field = caps[1].to_string();
            let alias = caps
                .get(2)
                .map_or_else(|| field.clone(), |m| m.as_str().to_string());
            out.push(ProjectedColumn::Sum { field, alias });
        } else {
            out.push(ProjectedColumn::Field(col.to_string()));
        }
    }
    Ok(Projection::Columns(out))
}

fn parse_joins(body: &str) -> Result<Vec<JoinClause>, ParseError> {
    let mut out = Vec::new();
    for caps in join_re().captures_iter(body) {
        let join_type = if caps[1].to_ascii_uppercase().starts_with("LEFT") {
            JoinType::LeftOuter
        } else {
            JoinType::Inner
        };
        let mut target = caps[2].split_whitespace();
        let table = target
            .next()
            .ok_or_else(|| ParseError::BadCondition(caps[0].to_string()))?
            .to_string();
        let alias = target.next().map_or_else(|| table.clone(), ToString::to_string);

        out.push(JoinClause {
            join_type,
            table,
            alias,
            left_qualifier: caps[3].to_string(),
            left_field: caps[4].to_string(),
            right_qualifier: caps[5].to_string(),
            right_field: caps[6].to_string(),
        });
    }
    Ok(out)
}
