//! JSON flattening: one parsed record becomes a flat path→value mapping.
//!
//! Paths join nested keys with `_`. Arrays of scalars collapse into a single
//! comma-joined leaf; arrays containing objects are expanded per element
//! under an indexed path (`tags_0_kind`), which is what makes wildcard
//! selectors (see `filter::eval`) possible.

use serde_json::Value;

/// Path separator between nested key segments.
pub const SEP: char = '_';

/// A flattened record: insertion-ordered `(path, value)` pairs.
///
/// Records are small (tens of leaves), so lookups are linear scans rather
/// than a hash map. Insertion order matters: wildcard resolution joins
/// values in the order the flattener emitted them, which for array elements
/// is index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    entries: Vec<(String, String)>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an exact path. `None` means the path does not exist, which
    /// is distinct from a path holding an empty string.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == path)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate `(path, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a leaf. If two nested structures flatten to the same path,
    /// the later write wins (an inherent ambiguity of flattening that the
    /// engine accepts rather than erroring on).
    fn insert(&mut self, path: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == path) {
            Some((_, v)) => *v = value,
            None => self.entries.push((path, value)),
        }
    }
}

/// Flatten a parsed JSON value into a [`FlatRecord`].
///
/// Only object-valued input produces leaves; any other top-level value
/// yields an empty record (field criteria will all miss, but raw-line
/// criteria still see the line).
pub fn flatten(value: &Value) -> FlatRecord {
    let mut out = FlatRecord::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            flatten_into(&mut out, key.clone(), child);
        }
    }
    out
}

fn flatten_into(out: &mut FlatRecord, path: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(out, format!("{path}{SEP}{key}"), child);
            }
        }
        Value::Array(items) => {
            if items.iter().all(is_scalar) {
                let joined = items
                    .iter()
                    .map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                out.insert(path, joined);
            } else {
                // At least one element is an object (or a nested array):
                // expand every element under an indexed path, scalars included.
                for (i, item) in items.iter().enumerate() {
                    let indexed = format!("{path}{SEP}{i}");
                    if is_scalar(item) {
                        out.insert(indexed, scalar_to_string(item));
                    } else {
                        flatten_into(out, indexed, item);
                    }
                }
            }
        }
        scalar => {
            let s = scalar_to_string(scalar);
            out.insert(path, s);
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Stringify a scalar leaf. Strings are taken verbatim (no quotes);
/// integers go through `itoa`, floats through `ryu`.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                itoa::Buffer::new().format(i).to_string()
            } else if let Some(u) = n.as_u64() {
                itoa::Buffer::new().format(u).to_string()
            } else {
                // serde_json numbers are always finite.
                ryu::Buffer::new()
                    .format(n.as_f64().unwrap_or_default())
                    .to_string()
            }
        }
        Value::String(s) => s.clone(),
        // Callers only pass non-container values here.
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(record: &FlatRecord) -> Vec<(String, String)> {
        record
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn flat_object() {
        let flat = flatten(&json!({"a": 1}));
        assert_eq!(pairs(&flat), vec![("a".into(), "1".into())]);
    }

    #[test]
    fn nested_object() {
        let flat = flatten(&json!({"a": {"b": {"c": "deep"}}}));
        assert_eq!(flat.get("a_b_c"), Some("deep"));
    }

    #[test]
    fn scalar_list_joins_with_commas() {
        let flat = flatten(&json!({"a": [1, 2, 3]}));
        assert_eq!(flat.get("a"), Some("1,2,3"));
    }

    #[test]
    fn object_list_indexes_elements() {
        let flat = flatten(&json!({"a": [{"b": 1}, {"b": 2}]}));
        assert_eq!(
            pairs(&flat),
            vec![("a_0_b".into(), "1".into()), ("a_1_b".into(), "2".into())]
        );
    }

    #[test]
    fn mixed_list_indexes_scalars_too() {
        let flat = flatten(&json!({"a": [{"b": 1}, "loose"]}));
        assert_eq!(flat.get("a_0_b"), Some("1"));
        assert_eq!(flat.get("a_1"), Some("loose"));
    }

    #[test]
    fn scalar_types_stringified() {
        let flat = flatten(&json!({
            "s": "text", "i": -7, "f": 2.5, "t": true, "n": null
        }));
        assert_eq!(flat.get("s"), Some("text"));
        assert_eq!(flat.get("i"), Some("-7"));
        assert_eq!(flat.get("f"), Some("2.5"));
        assert_eq!(flat.get("t"), Some("true"));
        assert_eq!(flat.get("n"), Some("null"));
    }

    #[test]
    fn empty_scalar_list() {
        let flat = flatten(&json!({"a": []}));
        assert_eq!(flat.get("a"), Some(""));
    }

    #[test]
    fn non_object_top_level_is_empty() {
        assert!(flatten(&json!([1, 2, 3])).is_empty());
        assert!(flatten(&json!("just a string")).is_empty());
        assert!(flatten(&json!(42)).is_empty());
    }

    #[test]
    fn path_collision_later_write_wins() {
        // {"a_b": 1, "a": {"b": 2}} — both flatten to "a_b".
        let flat = flatten(&json!({"a_b": 1, "a": {"b": 2}}));
        assert_eq!(flat.get("a_b"), Some("2"));
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn missing_key_is_none_not_empty() {
        let flat = flatten(&json!({"present": ""}));
        assert_eq!(flat.get("present"), Some(""));
        assert_eq!(flat.get("absent"), None);
    }
}
