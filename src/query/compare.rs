//! Value comparison rules shared by every compiled predicate.
//!
//! None of these functions fail: a value that cannot be compared the
//! "smart" way (numerically, chronologically) falls back to text.

use super::ast::CompareOp;
use crate::types::{parse_timestamp, Properties};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::cmp::Ordering;

pub(crate) fn eq_text(actual: &str, expected: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        actual == expected
    } else {
        actual.to_lowercase() == expected.to_lowercase()
    }
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Split a dotted-numeric string (`2`, `2.0`, `10.4.1`) into its components.
pub fn parse_numeric(s: &str) -> Option<Vec<u64>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.split('.').map(|part| part.parse::<u64>().ok()).collect()
}

/// Order two values: component-wise numeric when both are dotted-numeric
/// (missing components count as 0, so `2.0 == 2`), otherwise lexicographic.
pub fn compare_ordered(actual: &str, expected: &str, case_sensitive: bool) -> Ordering {
    if let (Some(a), Some(b)) = (parse_numeric(actual), parse_numeric(expected)) {
        let len = a.len().max(b.len());
        for i in 0..len {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            match x.cmp(&y) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        return Ordering::Equal;
    }
    if case_sensitive {
        actual.cmp(expected)
    } else {
        actual.to_lowercase().cmp(&expected.to_lowercase())
    }
}

pub(crate) fn ordering_satisfies(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Contains => false,
    }
}

/// Text comparison for any operator.
pub(crate) fn text_matches(actual: &str, op: CompareOp, expected: &str, case_sensitive: bool) -> bool {
    match op {
        CompareOp::Eq => eq_text(actual, expected, case_sensitive),
        CompareOp::Ne => !eq_text(actual, expected, case_sensitive),
        CompareOp::Contains => contains_ignore_case(actual, expected),
        _ => ordering_satisfies(op, compare_ordered(actual, expected, case_sensitive)),
    }
}

/// Compare a row timestamp against a query value.
///
/// Full timestamps compare chronologically, a bare date (`2024-01-31`)
/// compares against the UTC calendar day, anything else compares against
/// the RFC 3339 rendering as text. Rows without the timestamp never match.
pub(crate) fn timestamp_matches(actual: Option<DateTime<Utc>>, op: CompareOp, expected: &str) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let rendered = actual.to_rfc3339();
    if op == CompareOp::Contains {
        return contains_ignore_case(&rendered, expected);
    }
    if let Some(ts) = parse_timestamp(expected) {
        return ordering_satisfies(op, actual.cmp(&ts));
    }
    if let Ok(day) = NaiveDate::parse_from_str(expected.trim(), "%Y-%m-%d") {
        return ordering_satisfies(op, actual.date_naive().cmp(&day));
    }
    text_matches(&rendered, op, expected, false)
}

/// Find a property by exact key, then by dotted path into nested objects.
///
/// Keys may themselves contain dots, so every split point is tried:
/// `a.b.c` can be `{"a.b.c"}`, `{"a": {"b.c"}}` or `{"a.b": {"c"}}`.
pub fn lookup_property<'a>(props: &'a Properties, key: &str) -> Option<&'a Value> {
    if let Some(value) = props.get(key) {
        return Some(value);
    }
    for (idx, _) in key.match_indices('.') {
        let (head, rest) = (&key[..idx], &key[idx + 1..]);
        if let Some(Value::Object(nested)) = props.get(head) {
            if let Some(value) = lookup_property(nested, rest) {
                return Some(value);
            }
        }
    }
    None
}

/// Compare a property value. Null and objects never match (for `!=` too);
/// arrays match when any scalar element does.
pub(crate) fn property_matches(value: &Value, op: CompareOp, expected: &str, case_sensitive: bool) -> bool {
    match value {
        Value::Null | Value::Object(_) => false,
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_array())
            .any(|item| property_matches(item, op, expected, case_sensitive)),
        Value::String(s) => text_matches(s, op, expected, case_sensitive),
        Value::Bool(b) => text_matches(&b.to_string(), op, expected, false),
        Value::Number(n) => {
            let rendered = n.to_string();
            match (n.as_f64(), expected.trim().parse::<f64>()) {
                (Some(actual), Ok(wanted)) if op != CompareOp::Contains => actual
                    .partial_cmp(&wanted)
                    .map(|ordering| ordering_satisfies(op, ordering))
                    .unwrap_or(false),
                _ => text_matches(&rendered, op, expected, case_sensitive),
            }
        }
    }
}
