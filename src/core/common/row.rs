//! The stringly-typed `Row` and its JSON codec (spec §3, §6).

use std::collections::BTreeMap;

use serde_json::Value as Json;

/// An ordered mapping from field name to stringified scalar value.
///
/// All values are stored as strings; numeric/boolean literals are
/// stringified on ingestion and the predicate evaluator reinterprets them
/// per-operator at evaluation time (spec §3, §9 "stringly-typed rows").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    /// An empty row.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builds a row from an iterator of field/value pairs, preserving order
    /// and overwriting earlier duplicates with later ones.
    pub fn from_pairs<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.set(k, v);
        }
        row
    }

    /// Looks up a field's stringified value.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    /// Looks up a field's value, defaulting to the empty string when absent
    /// (spec §4.3: "absent as empty").
    pub fn get_or_empty(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    /// Sets a field, overwriting if already present, appending otherwise.
    pub fn set(&mut self, field: String, value: String) {
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == field) {
            slot.1 = value;
        } else {
            self.fields.push((field, value));
        }
    }

    /// Merges `patch` into `self`, overwriting fields present in both
    /// (spec §4.1 `update`: "merge semantics").
    pub fn merge(&mut self, patch: &Row) {
        for (k, v) in &patch.fields {
            self.set(k.clone(), v.clone());
        }
    }

    /// True if the field is present and non-empty.
    pub fn contains_nonempty(&self, field: &str) -> bool {
        self.get(field).is_some_and(|v| !v.is_empty())
    }

    /// True if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields in the row.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterates over `(field, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Encodes the row as a canonical JSON object.
    pub fn to_json(&self) -> Json {
        let mut map = serde_json::Map::new();
        for (k, v) in &self.fields {
            map.insert(k.clone(), Json::String(v.clone()));
        }
        Json::Object(map)
    }

    /// Encodes the row as a compact JSON object string.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Decodes a JSON document into a `Row`, applying the stringification
    /// rules of spec §6: numbers become their minimal decimal form, booleans
    /// become `"true"`/`"false"`, null becomes `"null"`, and nested
    /// arrays/objects collapse to the empty string (flat schema only).
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let value: Json = serde_json::from_str(s)?;
        Ok(Self::from_json_value(&value))
    }

    /// Builds a `Row` from an already-parsed JSON object, ignoring non-object
    /// input (an empty row results).
    pub fn from_json_value(value: &Json) -> Self {
        let mut row = Self::new();
        if let Json::Object(map) = value {
            for (k, v) in map {
                row.set(k.clone(), stringify_scalar(v));
            }
        }
        row
    }

    /// Row-for-row equality used by the deterministic key-derivation
    /// fallback (spec §4.1/§9): sorts field names so two embedders produce
    /// the same concatenation for the same field set regardless of
    /// insertion order.
    pub fn sorted_field_value_concat(&self) -> String {
        let mut sorted: BTreeMap<&str, &str> = BTreeMap::new();
        for (k, v) in &self.fields {
            sorted.insert(k.as_str(), v.as_str());
        }
        sorted
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<(String, String)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

fn stringify_scalar(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(f) = n.as_f64() {
                format_minimal_decimal(f)
            } else {
                n.to_string()
            }
        }
        Json::Bool(b) => b.to_string(),
        Json::Null => "null".to_string(),
        Json::Array(_) | Json::Object(_) => String::new(),
    }
}

/// Minimal-decimal formatting shared with the executor's `SUM` aggregation
/// (spec §4.5 Step E), so a summed total is stringified the same way a
/// number decoded from JSON would be (spec §6).
pub(crate) fn format_minimal_decimal(f: f64) -> String {
    let mut s = format!("{f:.6}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mixed_scalar_types() {
        let row = Row::from_json_str(r#"{"id":"u1","age":37,"active":true,"note":null}"#).unwrap();
        assert_eq!(row.get("id"), Some("u1"));
        assert_eq!(row.get("age"), Some("37"));
        assert_eq!(row.get("active"), Some("true"));
        assert_eq!(row.get("note"), Some("null"));
    }

    #[test]
    fn nested_values_collapse_to_empty_string() {
        let row = Row::from_json_str(r#"{"tags":["a","b"],"meta":{"x":1}}"#).unwrap();
        assert_eq!(row.get("tags"), Some(""));
        assert_eq!(row.get("meta"), Some(""));
    }

    #[test]
    fn merge_overwrites_only_patched_fields() {
        let mut row = Row::from_pairs([
            ("id".to_string(), "u1".to_string()),
            ("age".to_string(), "37".to_string()),
        ]);
        let patch = Row::from_pairs([("age".to_string(), "38".to_string())]);
        row.merge(&patch);
        assert_eq!(row.get("id"), Some("u1"));
        assert_eq!(row.get("age"), Some("38"));
    }

    #[test]
    fn sorted_concat_is_independent_of_insertion_order() {
        let a = Row::from_pairs([
            ("id".to_string(), "u1".to_string()),
            ("name".to_string(), "Ada".to_string()),
        ]);
        let b = Row::from_pairs([
            ("name".to_string(), "Ada".to_string()),
            ("id".to_string(), "u1".to_string()),
        ]);
        assert_eq!(a.sorted_field_value_concat(), b.sorted_field_value_concat());
    }

    #[test]
    fn round_trips_through_json() {
        let row = Row::from_pairs([
            ("id".to_string(), "u1".to_string()),
            ("name".to_string(), "Ada".to_string()),
        ]);
        let decoded = Row::from_json_str(&row.to_json_string()).unwrap();
        assert_eq!(row, decoded);
    }
}
