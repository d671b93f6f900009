//! In-memory sorting fallback for handlers that ignore `sortBy`.

use crate::resource::handler::SortOrder;
use crate::schema::validation::SchemaSet;
use serde_json::Value;
use std::cmp::Ordering;

/// Sort resources by a dotted attribute path.
///
/// String comparison is case-insensitive unless the attribute is declared
/// `caseExact`; numbers compare numerically; resources without a value for
/// the attribute sort last regardless of direction.
pub fn sort_resources(resources: &mut [Value], set: &SchemaSet, sort_by: &str, order: SortOrder) {
    let case_exact = set
        .find_attribute(sort_by)
        .map(|attr| attr.case_exact)
        .unwrap_or(false);

    resources.sort_by(|a, b| {
        let left = sort_key(a, sort_by);
        let right = sort_key(b, sort_by);
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => {
                let compared = compare_values(l, r, case_exact);
                match order {
                    SortOrder::Ascending => compared,
                    SortOrder::Descending => compared.reverse(),
                }
            }
        };
        ordering
    });
}

/// The value a resource sorts on. For a multi-valued attribute the primary
/// element wins, falling back to the first element (RFC 7644 §3.4.2.3).
fn sort_key<'a>(resource: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = resource;
    for segment in path.split('.') {
        current = match current {
            Value::Object(obj) => obj
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(segment))
                .map(|(_, v)| v)?,
            Value::Array(elements) => {
                let element = elements
                    .iter()
                    .find(|e| e.get("primary").and_then(Value::as_bool).unwrap_or(false))
                    .or_else(|| elements.first())?;
                element
                    .as_object()?
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(segment))
                    .map(|(_, v)| v)?
            }
            _ => return None,
        };
    }
    match current {
        Value::Null => None,
        Value::Array(elements) => elements
            .iter()
            .find(|e| e.get("primary").and_then(Value::as_bool).unwrap_or(false))
            .or_else(|| elements.first()),
        other => Some(other),
    }
}

fn compare_values(left: &Value, right: &Value, case_exact: bool) -> Ordering {
    match (left, right) {
        (Value::String(l), Value::String(r)) => {
            if case_exact {
                l.cmp(r)
            } else {
                l.to_lowercase().cmp(&r.to_lowercase())
            }
        }
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{SchemaRegistry, USER_URN};
    use serde_json::json;

    fn set() -> SchemaSet {
        let registry = SchemaRegistry::new().unwrap();
        SchemaSet::resolve(&registry, USER_URN, &[]).unwrap()
    }

    #[test]
    fn sorts_strings_case_insensitively() {
        let mut resources = vec![
            json!({"userName": "Charlie"}),
            json!({"userName": "alice"}),
            json!({"userName": "Bob"}),
        ];
        sort_resources(&mut resources, &set(), "userName", SortOrder::Ascending);
        let names: Vec<&str> = resources
            .iter()
            .map(|r| r["userName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["alice", "Bob", "Charlie"]);
    }

    #[test]
    fn descending_reverses() {
        let mut resources = vec![json!({"userName": "a"}), json!({"userName": "b"})];
        sort_resources(&mut resources, &set(), "userName", SortOrder::Descending);
        assert_eq!(resources[0]["userName"], "b");
    }

    #[test]
    fn missing_values_sort_last() {
        let mut resources = vec![
            json!({"displayName": "zeta", "userName": "z"}),
            json!({"userName": "a"}),
            json!({"displayName": "alpha", "userName": "m"}),
        ];
        sort_resources(&mut resources, &set(), "displayName", SortOrder::Ascending);
        assert_eq!(resources[0]["displayName"], "alpha");
        assert_eq!(resources[1]["displayName"], "zeta");
        assert_eq!(resources[2]["userName"], "a");
    }

    #[test]
    fn sorts_on_sub_attribute_of_multi_valued() {
        let mut resources = vec![
            json!({"emails": [{"value": "z@x", "primary": true}, {"value": "a@x"}]}),
            json!({"emails": [{"value": "b@x"}]}),
        ];
        sort_resources(&mut resources, &set(), "emails.value", SortOrder::Ascending);
        assert_eq!(resources[0]["emails"][0]["value"], "b@x");
    }
}
