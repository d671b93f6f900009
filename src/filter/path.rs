//! PATCH attribute path parsing.
//!
//! Grammar per RFC 7644 §3.5.2: `attr`, `attr.sub`, `attr[filter]`,
//! `attr[filter].sub`, each optionally prefixed by a schema URN. Syntax
//! errors surface as `invalidPath`.

use super::ast::{AttrPath, FilterExpr};
use super::lexer::{tokenize, Token};
use super::parser::Parser;
use crate::error::{ScimError, ScimResult};
use std::fmt;

/// A parsed PATCH operation path.
///
/// `attr` never carries a sub-attribute itself; the optional trailing
/// segment lives in `sub_attr` whether or not a value filter sits between
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchPath {
    pub attr: AttrPath,
    pub value_filter: Option<FilterExpr>,
    pub sub_attr: Option<String>,
}

impl PatchPath {
    /// Dotted path of the targeted attribute, ignoring the value filter.
    pub fn dotted(&self) -> String {
        match &self.sub_attr {
            Some(sub) => format!("{}.{}", self.attr.attr, sub),
            None => self.attr.attr.clone(),
        }
    }
}

impl fmt::Display for PatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.attr)?;
        if let Some(filter) = &self.value_filter {
            write!(f, "[{}]", filter)?;
        }
        if let Some(sub) = &self.sub_attr {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

/// Parse a PATCH `path` value.
pub fn parse_patch_path(input: &str) -> ScimResult<PatchPath> {
    parse_inner(input).map_err(|error| match error {
        ScimError::InvalidFilter { message, column } => ScimError::InvalidPath(match column {
            Some(column) => format!("{} at column {}", message, column),
            None => message,
        }),
        other => other,
    })
}

fn parse_inner(input: &str) -> ScimResult<PatchPath> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(&tokens, input.chars().count() + 1);

    let (mut attr, attr_column) = parser.parse_attr_path()?;

    let mut value_filter = None;
    let mut sub_attr = attr.sub_attr.take();

    if let Some(Token::LBracket) = parser.peek().map(|t| &t.token) {
        if sub_attr.is_some() {
            return Err(ScimError::invalid_filter_at(
                "a value filter cannot follow a sub-attribute",
                attr_column,
            ));
        }
        parser.next();
        value_filter = Some(parser.parse_or()?);
        parser.expect(Token::RBracket)?;

        if let Some(Token::Dot) = parser.peek().map(|t| &t.token) {
            parser.next();
            let (tail, tail_column) = parser.parse_attr_path()?;
            if tail.urn.is_some() || tail.sub_attr.is_some() {
                return Err(ScimError::invalid_filter_at(
                    "expected a single sub-attribute name",
                    tail_column,
                ));
            }
            sub_attr = Some(tail.attr);
        }
    }

    parser.expect_end()?;
    Ok(PatchPath {
        attr,
        value_filter,
        sub_attr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ast::CompareOp;
    use serde_json::json;

    #[test]
    fn parses_bare_attribute() {
        let path = parse_patch_path("displayName").unwrap();
        assert_eq!(path.attr.attr, "displayName");
        assert!(path.value_filter.is_none());
        assert!(path.sub_attr.is_none());
    }

    #[test]
    fn parses_sub_attribute() {
        let path = parse_patch_path("name.familyName").unwrap();
        assert_eq!(path.attr.attr, "name");
        assert_eq!(path.sub_attr.as_deref(), Some("familyName"));
    }

    #[test]
    fn parses_filtered_path() {
        let path = parse_patch_path(r#"emails[type eq "work"]"#).unwrap();
        assert_eq!(path.attr.attr, "emails");
        let Some(FilterExpr::Compare { op, value, .. }) = path.value_filter else {
            panic!("expected compare filter");
        };
        assert_eq!(op, CompareOp::Eq);
        assert_eq!(value, json!("work"));
        assert!(path.sub_attr.is_none());
    }

    #[test]
    fn parses_filtered_path_with_sub_attribute() {
        let path = parse_patch_path(r#"emails[type eq "work"].value"#).unwrap();
        assert_eq!(path.attr.attr, "emails");
        assert!(path.value_filter.is_some());
        assert_eq!(path.sub_attr.as_deref(), Some("value"));
    }

    #[test]
    fn parses_urn_prefixed_path() {
        let path = parse_patch_path(
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber",
        )
        .unwrap();
        assert_eq!(
            path.attr.urn.as_deref(),
            Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
        );
        assert_eq!(path.attr.attr, "employeeNumber");
    }

    #[test]
    fn syntax_errors_map_to_invalid_path() {
        let error = parse_patch_path(r#"emails[type eq "work""#).unwrap_err();
        assert_eq!(error.scim_type(), Some("invalidPath"));
        assert!(error.to_string().contains("column"));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_patch_path("displayName extra").is_err());
    }

    #[test]
    fn rejects_filter_after_sub_attribute() {
        assert!(parse_patch_path(r#"name.givenName[x eq "y"]"#).is_err());
    }

    #[test]
    fn display_round_trips() {
        for input in [
            "displayName",
            "name.familyName",
            r#"emails[type eq "work"]"#,
            r#"emails[type eq "work" and primary eq true].value"#,
        ] {
            let parsed = parse_patch_path(input).unwrap();
            let reparsed = parse_patch_path(&parsed.to_string()).unwrap();
            assert_eq!(parsed, reparsed);
        }
    }
}
