//! The predicate evaluator (spec §4.2): `(field_value, op, literal)` ->
//! bool, with a numeric/date/lexicographic comparison ladder and cached
//! LIKE-pattern compilation.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use regex::Regex;

use crate::core::common::ParseError;

/// The six comparison/equality operators plus `LIKE` (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Like,
}

impl Op {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "=" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            ">" => Ok(Self::Gt),
            "<=" => Ok(Self::Le),
            ">=" => Ok(Self::Ge),
            _ if raw.eq_ignore_ascii_case("LIKE") => Ok(Self::Like),
            other => Err(ParseError::UnknownOperator(other.to_string())),
        }
    }
}

thread_local! {
    /// Compiled LIKE patterns, cached per-thread (spec §4.2, §5): released
    /// automatically when the thread exits since the `RefCell` is owned by
    /// the thread-local storage itself.
    static LIKE_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Evaluates `field_value op literal` per the spec §4.2 ladder.
pub fn eval(field_value: &str, op: Op, literal: &str) -> bool {
    match op {
        Op::Eq => field_value == literal,
        Op::Ne => field_value != literal,
        Op::Lt => compare(field_value, literal) == Ordering::Less,
        Op::Gt => compare(field_value, literal) == Ordering::Greater,
        Op::Le => compare(field_value, literal) != Ordering::Greater,
        Op::Ge => compare(field_value, literal) != Ordering::Less,
        Op::Like => like_match(field_value, literal),
    }
}

/// Orders two values numerically if both parse as numbers, else as UTC
/// midnight instants if both match `YYYY-MM-DD`, else lexicographically.
pub fn compare(lhs: &str, rhs: &str) -> Ordering {
    if let (Ok(a), Ok(b)) = (lhs.parse::<f64>(), rhs.parse::<f64>()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    if let (Some(a), Some(b)) = (parse_date(lhs), parse_date(rhs)) {
        return a.cmp(&b);
    }
    lhs.cmp(rhs)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn like_match(field_value: &str, pattern: &str) -> bool {
    LIKE_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        let re = cache
            .entry(pattern.to_string())
            .or_insert_with(|| compile_like(pattern));
        re.is_match(field_value)
    })
}

/// Translates a SQL LIKE pattern to an anchored, case-insensitive regex:
/// `%` -> `.*`, `_` -> `.`, every other non-alphanumeric character is
/// escaped (spec §4.2).
fn compile_like(pattern: &str) -> Regex {
    let mut re = String::from("(?i)^");
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            c if c.is_alphanumeric() => re.push(c),
            c => {
                re.push('\\');
                re.push(c);
            }
        }
    }
    re.push('$');
    // Built entirely from escaped/whitelisted characters, so compilation
    // cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(&re).expect("LIKE pattern compiles to a valid regex")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_and_inequality() {
        assert!(eval("Ada", Op::Eq, "Ada"));
        assert!(!eval("Ada", Op::Eq, "Bob"));
        assert!(eval("Ada", Op::Ne, "Bob"));
    }

    #[test]
    fn numeric_ordering_takes_priority_over_lexicographic() {
        assert!(eval("9", Op::Lt, "10"));
        assert!(!eval("9", Op::Gt, "10"));
    }

    #[test]
    fn date_ordering_when_both_sides_are_dates() {
        assert!(eval("2024-01-01", Op::Lt, "2024-02-01"));
        assert!(eval("2024-12-31", Op::Ge, "2024-01-01"));
    }

    #[test]
    fn falls_back_to_lexicographic_for_non_numeric_non_date() {
        assert!(eval("apple", Op::Lt, "banana"));
    }

    #[test]
    fn like_percent_matches_any_substring_between_anchors() {
        assert!(eval("hello world", Op::Like, "%world"));
        assert!(eval("hello world", Op::Like, "hello%"));
        assert!(!eval("hello world", Op::Like, "world%"));
    }

    #[test]
    fn like_underscore_matches_single_character() {
        assert!(eval("cat", Op::Like, "c_t"));
        assert!(!eval("cart", Op::Like, "c_t"));
    }

    #[test]
    fn like_is_case_insensitive() {
        assert!(eval("Ada", Op::Like, "ada"));
    }

    #[test]
    fn like_escapes_regex_metacharacters() {
        assert!(eval("a.b", Op::Like, "a.b"));
        assert!(!eval("axb", Op::Like, "a.b"));
    }

    #[test]
    fn unknown_operator_is_rejected_at_parse_time() {
        assert!(Op::parse("~=").is_err());
    }

    #[test]
    fn empty_field_value_compares_as_empty_string() {
        assert!(eval("", Op::Eq, ""));
        assert!(!eval("", Op::Eq, "x"));
    }
}
