//! Filter evaluation against resource documents.
//!
//! Undefined attributes evaluate to false for every operator except `pr`
//! (false) and `ne` (true). String comparison honors the attribute's
//! `caseExact` characteristic when a schema set is available and defaults
//! to case-insensitive otherwise, matching the RFC 7643 default.

use super::ast::{AttrPath, CompareOp, FilterExpr};
use crate::schema::validation::SchemaSet;
use serde_json::Value;

/// Evaluates filter ASTs against JSON resource documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEvaluator<'a> {
    set: Option<&'a SchemaSet>,
    /// Dotted prefix for paths inside a value filter, e.g. `emails` while
    /// evaluating the inner expression of `emails[...]`.
    prefix: Option<&'a str>,
}

impl<'a> FilterEvaluator<'a> {
    /// Evaluator with schema-aware case sensitivity.
    pub fn new(set: &'a SchemaSet) -> Self {
        Self {
            set: Some(set),
            prefix: None,
        }
    }

    /// Evaluator without schema context; all string comparison is
    /// case-insensitive.
    pub fn schemaless() -> Self {
        Self {
            set: None,
            prefix: None,
        }
    }

    /// Evaluator for expressions whose paths are relative to a multi-valued
    /// attribute, e.g. the value filter of `emails[type eq "work"]`.
    pub fn scoped(set: &'a SchemaSet, prefix: &'a str) -> Self {
        Self {
            set: Some(set),
            prefix: Some(prefix),
        }
    }

    /// Whether the resource satisfies the filter.
    pub fn matches(&self, expr: &FilterExpr, resource: &Value) -> bool {
        match expr {
            FilterExpr::And(left, right) => {
                self.matches(left, resource) && self.matches(right, resource)
            }
            FilterExpr::Or(left, right) => {
                self.matches(left, resource) || self.matches(right, resource)
            }
            FilterExpr::Not(inner) => !self.matches(inner, resource),
            FilterExpr::Present(path) => self
                .resolve(path, resource)
                .iter()
                .any(|&value| is_present(value)),
            FilterExpr::Compare { path, op, value } => {
                let candidates = self.resolve(path, resource);
                let case_exact = self.case_exact(path);
                match op {
                    // `ne` holds when no value equals the literal, which
                    // makes it true on undefined attributes.
                    CompareOp::Ne => !candidates
                        .iter()
                        .any(|&candidate| values_equal(candidate, value, case_exact)),
                    CompareOp::Eq => candidates
                        .iter()
                        .any(|&candidate| values_equal(candidate, value, case_exact)),
                    _ => candidates
                        .iter()
                        .any(|&candidate| compare(*op, candidate, value, case_exact)),
                }
            }
            FilterExpr::ValuePath { path, expr } => {
                let targets = self.resolve_raw(path, resource);
                let nested = FilterEvaluator {
                    set: self.set,
                    prefix: Some(&path.attr),
                };
                targets.iter().any(|&target| match target {
                    Value::Array(elements) => {
                        elements.iter().any(|element| nested.matches(expr, element))
                    }
                    Value::Object(_) => nested.matches(expr, target),
                    _ => false,
                })
            }
        }
    }

    /// Leaf candidate values for a path: multi-valued attributes are
    /// flattened one level and sub-attributes are projected out of complex
    /// elements.
    fn resolve<'v>(&self, path: &AttrPath, resource: &'v Value) -> Vec<&'v Value> {
        let mut leaves = Vec::new();
        for target in self.resolve_raw(path, resource) {
            match target {
                Value::Array(elements) => leaves.extend(elements.iter()),
                other => leaves.push(other),
            }
        }
        leaves
    }

    /// The values the raw path points at, before flattening.
    fn resolve_raw<'v>(&self, path: &AttrPath, resource: &'v Value) -> Vec<&'v Value> {
        let base = match &path.urn {
            Some(urn) => match get_key(resource, urn) {
                Some(extension) => extension,
                None => return Vec::new(),
            },
            None => resource,
        };

        let Some(attr_value) = get_key(base, &path.attr) else {
            return Vec::new();
        };

        let Some(sub) = &path.sub_attr else {
            return vec![attr_value];
        };
        match attr_value {
            Value::Object(_) => get_key(attr_value, sub).map(|v| vec![v]).unwrap_or_default(),
            Value::Array(elements) => elements
                .iter()
                .filter_map(|element| get_key(element, sub))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn case_exact(&self, path: &AttrPath) -> bool {
        let Some(set) = self.set else {
            return false;
        };
        let dotted = match self.prefix {
            Some(prefix) => format!("{}.{}", prefix, path.dotted()),
            None => path.dotted(),
        };
        set.find_attribute(&dotted)
            .map(|attr| attr.case_exact)
            .unwrap_or(false)
    }
}

fn get_key<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    value
        .as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn values_equal(candidate: &Value, literal: &Value, case_exact: bool) -> bool {
    match (candidate, literal) {
        (Value::String(a), Value::String(b)) => {
            if case_exact {
                a == b
            } else {
                a.eq_ignore_ascii_case(b)
            }
        }
        (Value::Number(a), Value::Number(b)) => {
            a.as_f64().zip(b.as_f64()).map(|(x, y)| x == y).unwrap_or(false)
        }
        (a, b) => a == b,
    }
}

/// Ordering and substring comparison. `co`/`sw`/`ew` apply to strings only;
/// `gt`/`ge`/`lt`/`le` apply to numbers and to strings (which covers the
/// lexicographic RFC 3339 ordering of dateTime values).
fn compare(op: CompareOp, candidate: &Value, literal: &Value, case_exact: bool) -> bool {
    match (candidate, literal) {
        (Value::String(a), Value::String(b)) => {
            let (a, b) = if case_exact {
                (a.clone(), b.clone())
            } else {
                (a.to_lowercase(), b.to_lowercase())
            };
            match op {
                CompareOp::Co => a.contains(&b),
                CompareOp::Sw => a.starts_with(&b),
                CompareOp::Ew => a.ends_with(&b),
                CompareOp::Gt => a > b,
                CompareOp::Ge => a >= b,
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                CompareOp::Eq | CompareOp::Ne => unreachable!("handled by caller"),
            }
        }
        (Value::Number(a), Value::Number(b)) => {
            let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) else {
                return false;
            };
            match op {
                CompareOp::Gt => a > b,
                CompareOp::Ge => a >= b,
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                _ => false,
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parser::parse_filter;
    use serde_json::json;

    fn bob() -> Value {
        json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "id": "42",
            "userName": "bob",
            "active": true,
            "loginCount": 7,
            "name": {"givenName": "Bob", "familyName": "Builder"},
            "emails": [
                {"value": "bob@example.com", "type": "work", "primary": true},
                {"value": "bob@home.example", "type": "home"}
            ],
            "meta": {"lastModified": "2020-06-01T12:00:00Z"}
        })
    }

    fn eval(filter: &str, resource: &Value) -> bool {
        let expr = parse_filter(filter).unwrap();
        FilterEvaluator::schemaless().matches(&expr, resource)
    }

    #[test]
    fn simple_equality() {
        assert!(eval(r#"userName eq "bob""#, &bob()));
        assert!(eval(r#"userName eq "BOB""#, &bob()));
        assert!(!eval(r#"userName eq "alice""#, &bob()));
    }

    #[test]
    fn undefined_attribute_semantics() {
        assert!(!eval(r#"nickName eq "bobby""#, &bob()));
        assert!(eval(r#"nickName ne "bobby""#, &bob()));
        assert!(!eval("nickName pr", &bob()));
    }

    #[test]
    fn present_on_defined_values() {
        assert!(eval("userName pr", &bob()));
        assert!(eval("emails pr", &bob()));
        let no_emails = json!({"userName": "x", "emails": []});
        assert!(!eval("emails pr", &no_emails));
    }

    #[test]
    fn substring_operators() {
        assert!(eval(r#"userName sw "bo""#, &bob()));
        assert!(eval(r#"userName ew "ob""#, &bob()));
        assert!(eval(r#"emails.value co "example""#, &bob()));
        assert!(!eval(r#"userName co "alice""#, &bob()));
        // substring operators do not apply to numbers
        assert!(!eval(r#"loginCount co 7"#, &bob()));
    }

    #[test]
    fn numeric_ordering() {
        assert!(eval("loginCount gt 5", &bob()));
        assert!(eval("loginCount ge 7", &bob()));
        assert!(eval("loginCount lt 10", &bob()));
        assert!(!eval("loginCount gt 7", &bob()));
    }

    #[test]
    fn datetime_ordering_is_lexicographic() {
        assert!(eval(r#"meta.lastModified gt "2011-05-13T04:42:34Z""#, &bob()));
        assert!(!eval(r#"meta.lastModified gt "2031-01-01T00:00:00Z""#, &bob()));
    }

    #[test]
    fn multi_valued_sub_attribute_matches_any_element() {
        assert!(eval(r#"emails.type eq "home""#, &bob()));
        assert!(eval(r#"emails.value sw "bob@""#, &bob()));
        assert!(!eval(r#"emails.type eq "other""#, &bob()));
    }

    #[test]
    fn value_path_matches_within_one_element() {
        assert!(eval(r#"emails[type eq "work" and primary eq true]"#, &bob()));
        // no single element is both home and primary
        assert!(!eval(r#"emails[type eq "home" and primary eq true]"#, &bob()));
    }

    #[test]
    fn logical_combinators() {
        assert!(eval(
            r#"userName sw "bo" and (emails.type eq "work" or active eq true)"#,
            &bob()
        ));
        assert!(!eval(r#"not (userName eq "bob")"#, &bob()));
        let alice = json!({"userName": "alice", "active": false});
        assert!(!eval(
            r#"userName sw "bo" and (emails.type eq "work" or active eq true)"#,
            &alice
        ));
    }

    #[test]
    fn case_exact_attribute_uses_exact_comparison() {
        use crate::schema::registry::{SchemaRegistry, USER_URN};
        use crate::schema::validation::SchemaSet;

        let registry = SchemaRegistry::new().unwrap();
        let set = SchemaSet::resolve(&registry, USER_URN, &[]).unwrap();
        let evaluator = FilterEvaluator::new(&set);

        // id is caseExact in the common schema
        let expr = parse_filter(r#"id eq "AbC""#).unwrap();
        assert!(!evaluator.matches(&expr, &json!({"id": "abc"})));
        assert!(evaluator.matches(&expr, &json!({"id": "AbC"})));

        // userName is not caseExact
        let expr = parse_filter(r#"userName eq "BOB""#).unwrap();
        assert!(evaluator.matches(&expr, &bob()));
    }

    #[test]
    fn urn_prefixed_path_resolves_extension_object() {
        let resource = json!({
            "userName": "bob",
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User": {
                "employeeNumber": "701984"
            }
        });
        assert!(eval(
            r#"urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber eq "701984""#,
            &resource
        ));
    }
}
