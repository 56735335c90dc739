//! Predicate evaluation: resolve a criterion's selector against a flattened
//! record, then apply its terms.

use super::{FilterCriterion, FilterSet, MatchMode, Term};
use crate::flatten::{FlatRecord, SEP};

/// Decide whether one record matches the filter set.
///
/// `raw_line` is the original line text (used by selector-less criteria);
/// `flat` is the flattened view of the parsed record.
pub fn evaluate(set: &FilterSet, raw_line: &str, flat: &FlatRecord) -> bool {
    // Zero criteria is pass-through regardless of mode.
    if set.criteria.is_empty() {
        return true;
    }
    match set.criteria_mode {
        MatchMode::All => set
            .criteria
            .iter()
            .all(|c| criterion_matches(c, raw_line, flat)),
        MatchMode::Any => set
            .criteria
            .iter()
            .any(|c| criterion_matches(c, raw_line, flat)),
    }
}

fn criterion_matches(criterion: &FilterCriterion, raw_line: &str, flat: &FlatRecord) -> bool {
    if criterion.terms.is_empty() {
        return true;
    }
    let source = match &criterion.selector {
        Some(selector) => resolve(selector, flat),
        None => Some(raw_line.to_lowercase()),
    };
    let source = source.as_deref();
    match criterion.term_mode {
        MatchMode::All => criterion.terms.iter().all(|t| term_matches(t, source)),
        MatchMode::Any => criterion.terms.iter().any(|t| term_matches(t, source)),
    }
}

/// Resolve a selector to its source value, or `None` when the field cannot
/// be found (which is distinct from an empty value — `=EMPTY` needs both).
///
/// Exact paths win; otherwise the selector is tried as a wildcard spanning
/// indexed list elements: `tunnels_type` collects every `tunnels_<i>_type`,
/// skipping values that are just `none`/`null`, and comma-joins the rest in
/// record order.
pub fn resolve(selector: &str, flat: &FlatRecord) -> Option<String> {
    if let Some(value) = flat.get(selector) {
        return Some(value.to_string());
    }
    let mut values: Vec<&str> = Vec::new();
    for (path, value) in flat.iter() {
        if wildcard_matches(selector, path) {
            let lower = value.to_lowercase();
            if lower == "none" || lower == "null" {
                continue;
            }
            values.push(value);
        }
    }
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

/// Does `path` have the shape `prefix_<digits>_suffix` for some split of
/// `selector` into `prefix_suffix`?
fn wildcard_matches(selector: &str, path: &str) -> bool {
    let bytes = path.as_bytes();
    let sep = SEP as u8;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == sep {
            // Scan an index segment: `_<digits>_`.
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j] == sep {
                let prefix = &path[..i];
                let suffix = &path[j + 1..];
                if selector.len() == prefix.len() + 1 + suffix.len()
                    && selector.starts_with(prefix)
                    && selector.ends_with(suffix)
                    && selector.as_bytes()[prefix.len()] == sep
                {
                    return true;
                }
            }
        }
        i += 1;
    }
    false
}

fn term_matches(term: &Term, source: Option<&str>) -> bool {
    match term {
        Term::Empty => source.is_none_or(|s| s.trim().is_empty()),
        Term::NotEmpty => source.is_some_and(|s| !s.trim().is_empty()),
        // A missing field fails every non-EMPTY term, negated or not.
        Term::Numeric { op, rhs } => source.is_some_and(|s| {
            s.trim()
                .parse::<f64>()
                .map(|lhs| op.holds(lhs, *rhs))
                .unwrap_or(false)
        }),
        Term::Substring { needle, negated } => {
            source.is_some_and(|s| s.to_lowercase().contains(needle.as_str()) != *negated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use serde_json::json;

    fn criterion(selector: Option<&str>, keywords: &str, mode: MatchMode) -> FilterCriterion {
        FilterCriterion::new(selector, keywords, mode)
    }

    fn single(selector: Option<&str>, keywords: &str, mode: MatchMode) -> FilterSet {
        FilterSet::new(vec![criterion(selector, keywords, mode)], MatchMode::All)
    }

    fn matches(set: &FilterSet, record: &serde_json::Value) -> bool {
        let raw = record.to_string();
        evaluate(set, &raw, &flatten(record))
    }

    #[test]
    fn empty_filter_set_passes_everything() {
        let set = FilterSet::default();
        assert!(matches(&set, &json!({"anything": 1})));
        let any_mode = FilterSet::new(vec![], MatchMode::Any);
        assert!(matches(&any_mode, &json!({})));
    }

    #[test]
    fn exact_selector_substring() {
        let set = single(Some("ip"), "1.1", MatchMode::All);
        assert!(matches(&set, &json!({"ip": "1.1.1.1"})));
        assert!(!matches(&set, &json!({"ip": "2.2.2.2"})));
    }

    #[test]
    fn substring_is_case_insensitive() {
        let set = single(Some("name"), "ALICE", MatchMode::All);
        assert!(matches(&set, &json!({"name": "Alice Smith"})));
    }

    #[test]
    fn scalar_list_matches_through_joined_value() {
        let set = single(Some("tags"), "vpn", MatchMode::All);
        assert!(matches(&set, &json!({"tags": ["vpn", "proxy"]})));
        assert!(!matches(&set, &json!({"tags": ["clean"]})));
    }

    #[test]
    fn wildcard_resolves_across_indices() {
        let flat = flatten(&json!({"a": [{"b": "x"}, {"b": "y"}]}));
        assert_eq!(resolve("a_b", &flat), Some("x,y".to_string()));
    }

    #[test]
    fn wildcard_skips_none_and_null_values() {
        let flat = flatten(&json!({"a": [{"b": "x"}, {"b": null}, {"b": "None"}]}));
        assert_eq!(resolve("a_b", &flat), Some("x".to_string()));
    }

    #[test]
    fn wildcard_with_underscored_suffix() {
        let flat = flatten(&json!({"tunnels": [{"exit_ip": "9.9.9.9"}]}));
        assert_eq!(resolve("tunnels_exit_ip", &flat), Some("9.9.9.9".to_string()));
    }

    #[test]
    fn wildcard_misses_resolve_to_none() {
        let flat = flatten(&json!({"a": [{"b": "x"}]}));
        assert_eq!(resolve("a_c", &flat), None);
        assert_eq!(resolve("z_b", &flat), None);
    }

    #[test]
    fn exact_path_shadows_wildcard() {
        let flat = flatten(&json!({"a_b": "direct", "a": [{"b": "indexed"}]}));
        assert_eq!(resolve("a_b", &flat), Some("direct".to_string()));
    }

    #[test]
    fn empty_sentinel_semantics() {
        let absent = single(Some("missing"), "=EMPTY", MatchMode::All);
        assert!(matches(&absent, &json!({"other": 1})));

        let blank = single(Some("field"), "=EMPTY", MatchMode::All);
        assert!(matches(&blank, &json!({"field": "  "})));
        assert!(!matches(&blank, &json!({"field": "value"})));
    }

    #[test]
    fn not_empty_sentinel_semantics() {
        let set = single(Some("field"), "!=EMPTY", MatchMode::All);
        assert!(matches(&set, &json!({"field": "value"})));
        assert!(!matches(&set, &json!({"field": ""})));
        assert!(!matches(&set, &json!({"other": 1})));
    }

    #[test]
    fn empty_sentinels_mutually_exclusive() {
        for record in [json!({"f": "x"}), json!({"f": ""}), json!({})] {
            let empty = matches(&single(Some("f"), "=EMPTY", MatchMode::All), &record);
            let not_empty = matches(&single(Some("f"), "!=EMPTY", MatchMode::All), &record);
            assert_ne!(empty, not_empty, "record: {record}");
        }
    }

    #[test]
    fn numeric_comparison() {
        let set = single(Some("count"), ">10", MatchMode::All);
        assert!(matches(&set, &json!({"count": 15})));
        assert!(!matches(&set, &json!({"count": 5})));
        // Non-numeric source never matches a numeric term.
        assert!(!matches(&set, &json!({"count": "abc"})));
        assert!(!matches(&set, &json!({})));
    }

    #[test]
    fn numeric_defaults_to_equality() {
        let set = single(Some("port"), "443", MatchMode::All);
        assert!(matches(&set, &json!({"port": 443})));
        assert!(!matches(&set, &json!({"port": 8443})));
    }

    #[test]
    fn negated_substring_truth_table() {
        // AND of ["foo", "!bar"]: must contain foo and not bar.
        let set = single(Some("v"), "foo,!bar", MatchMode::All);
        assert!(matches(&set, &json!({"v": "foo only"})));
        assert!(!matches(&set, &json!({"v": "foo and bar"})));
        assert!(!matches(&set, &json!({"v": "bar only"})));
        assert!(!matches(&set, &json!({"v": "neither"})));
    }

    #[test]
    fn negated_term_fails_on_missing_field() {
        let set = single(Some("missing"), "!bar", MatchMode::All);
        assert!(!matches(&set, &json!({"other": 1})));
    }

    #[test]
    fn term_mode_any() {
        let set = single(Some("tags"), "vpn,tor", MatchMode::Any);
        assert!(matches(&set, &json!({"tags": ["tor"]})));
        assert!(matches(&set, &json!({"tags": ["vpn"]})));
        assert!(!matches(&set, &json!({"tags": ["clean"]})));
    }

    #[test]
    fn criteria_mode_combination() {
        let a = criterion(Some("ip"), "1.1", MatchMode::All);
        let b = criterion(Some("tags"), "vpn", MatchMode::All);
        let record = json!({"ip": "1.1.1.1", "tags": ["clean"]});

        let both = FilterSet::new(vec![a.clone(), b.clone()], MatchMode::All);
        assert!(!matches(&both, &record));

        let either = FilterSet::new(vec![a, b], MatchMode::Any);
        assert!(matches(&either, &record));
    }

    #[test]
    fn raw_line_criterion_searches_whole_text() {
        let set = single(None, "proxy", MatchMode::All);
        assert!(matches(&set, &json!({"tags": ["PROXY"]})));
        assert!(!matches(&set, &json!({"tags": ["vpn"]})));
    }

    #[test]
    fn raw_line_criterion_sees_non_object_lines() {
        let record = json!([1, 2, 3]);
        let set = single(None, "2", MatchMode::All);
        assert!(matches(&set, &record));
        // Field criteria miss on non-object records.
        let field = single(Some("0"), "1", MatchMode::All);
        assert!(!matches(&field, &record));
    }

    #[test]
    fn zero_term_criterion_is_vacuously_true() {
        let set = single(Some("anything"), "", MatchMode::All);
        assert!(matches(&set, &json!({})));
    }
}
