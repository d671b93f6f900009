//! Recursive descent parser for filter expressions.
//!
//! Precedence from tightest to loosest: `not`, `and`, `or`. The
//! `attr[expr]` form builds a [`FilterExpr::ValuePath`] whose inner
//! expression is evaluated against elements of the multi-valued attribute.

use super::ast::{AttrPath, CompareOp, FilterExpr};
use super::lexer::{tokenize, SpannedToken, Token};
use crate::error::{ScimError, ScimResult};
use serde_json::Value;

/// Parse a complete filter expression.
pub fn parse_filter(input: &str) -> ScimResult<FilterExpr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(&tokens, input.chars().count() + 1);
    let expr = parser.parse_or()?;
    parser.expect_end()?;
    Ok(expr)
}

pub(super) struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    /// Column reported for errors at end of input.
    end_column: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(tokens: &'a [SpannedToken], end_column: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end_column,
        }
    }

    pub(super) fn peek(&self) -> Option<&'a SpannedToken> {
        self.tokens.get(self.pos)
    }

    pub(super) fn next(&mut self) -> Option<&'a SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(super) fn column(&self) -> usize {
        self.peek().map(|t| t.column).unwrap_or(self.end_column)
    }

    pub(super) fn expect_end(&self) -> ScimResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ScimError::invalid_filter_at(
                format!("unexpected trailing input {:?}", token.token),
                token.column,
            )),
        }
    }

    pub(super) fn parse_or(&mut self) -> ScimResult<FilterExpr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ScimResult<FilterExpr> {
        let mut left = self.parse_unary()?;
        while self.eat_keyword("and") {
            let right = self.parse_unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ScimResult<FilterExpr> {
        if self.eat_keyword("not") {
            let inner = self.parse_unary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ScimResult<FilterExpr> {
        match self.peek().map(|t| &t.token) {
            Some(Token::LParen) => {
                self.next();
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(_)) => self.parse_attr_expr(),
            _ => Err(ScimError::invalid_filter_at(
                "expected an attribute expression",
                self.column(),
            )),
        }
    }

    fn parse_attr_expr(&mut self) -> ScimResult<FilterExpr> {
        let (path, path_column) = self.parse_attr_path()?;

        if let Some(Token::LBracket) = self.peek().map(|t| &t.token) {
            if path.sub_attr.is_some() {
                return Err(ScimError::invalid_filter_at(
                    "a value filter cannot follow a sub-attribute",
                    path_column,
                ));
            }
            self.next();
            let inner = self.parse_or()?;
            self.expect(Token::RBracket)?;
            return Ok(FilterExpr::ValuePath {
                path,
                expr: Box::new(inner),
            });
        }

        let op_column = self.column();
        let Some(SpannedToken {
            token: Token::Ident(word),
            ..
        }) = self.next()
        else {
            return Err(ScimError::invalid_filter_at(
                "expected a comparison operator",
                op_column,
            ));
        };

        if word.eq_ignore_ascii_case("pr") {
            return Ok(FilterExpr::Present(path));
        }

        let op = CompareOp::parse(word).ok_or_else(|| {
            ScimError::invalid_filter_at(format!("unknown operator '{}'", word), op_column)
        })?;

        let value = self.parse_value()?;
        Ok(FilterExpr::Compare { path, op, value })
    }

    /// Parse an attribute path out of an identifier token, returning the
    /// token's column alongside for diagnostics.
    pub(super) fn parse_attr_path(&mut self) -> ScimResult<(AttrPath, usize)> {
        let column = self.column();
        let Some(SpannedToken {
            token: Token::Ident(raw),
            ..
        }) = self.next()
        else {
            return Err(ScimError::invalid_filter_at(
                "expected an attribute path",
                column,
            ));
        };
        Ok((parse_attr_path_str(raw, column)?, column))
    }

    pub(super) fn parse_value(&mut self) -> ScimResult<Value> {
        let column = self.column();
        match self.next().map(|t| &t.token) {
            Some(Token::Str(s)) => Ok(Value::String(s.clone())),
            Some(Token::Number(n)) => Ok(Value::Number(n.clone())),
            Some(Token::True) => Ok(Value::Bool(true)),
            Some(Token::False) => Ok(Value::Bool(false)),
            Some(Token::Null) => Ok(Value::Null),
            _ => Err(ScimError::invalid_filter_at(
                "expected a JSON literal value",
                column,
            )),
        }
    }

    pub(super) fn eat_keyword(&mut self, keyword: &str) -> bool {
        if let Some(SpannedToken {
            token: Token::Ident(word),
            ..
        }) = self.peek()
        {
            if word.eq_ignore_ascii_case(keyword) {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    pub(super) fn expect(&mut self, expected: Token) -> ScimResult<()> {
        let column = self.column();
        match self.next() {
            Some(token) if token.token == expected => Ok(()),
            _ => Err(ScimError::invalid_filter_at(
                format!("expected {:?}", expected),
                column,
            )),
        }
    }
}

/// Split an identifier into URN prefix, attribute and sub-attribute.
pub(super) fn parse_attr_path_str(raw: &str, column: usize) -> ScimResult<AttrPath> {
    let (urn, rest) = match crate::schema::registry::split_urn_prefix(raw) {
        Some((urn, rest)) => (Some(urn), rest),
        None => (None, raw.to_string()),
    };

    let mut segments = rest.split('.');
    let attr = segments.next().unwrap_or_default();
    let sub_attr = segments.next();
    if segments.next().is_some() {
        return Err(ScimError::invalid_filter_at(
            format!("attribute path '{}' has too many segments", raw),
            column,
        ));
    }
    if !valid_attr_name(attr) || !sub_attr.map(valid_attr_name).unwrap_or(true) {
        return Err(ScimError::invalid_filter_at(
            format!("invalid attribute name in '{}'", raw),
            column,
        ));
    }

    Ok(AttrPath {
        urn,
        attr: attr.to_string(),
        sub_attr: sub_attr.map(str::to_string),
    })
}

fn valid_attr_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '$' || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '$'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_simple_comparison() {
        let expr = parse_filter(r#"userName eq "bjensen""#).unwrap();
        assert_eq!(
            expr,
            FilterExpr::Compare {
                path: AttrPath::new("userName"),
                op: CompareOp::Eq,
                value: json!("bjensen"),
            }
        );
    }

    #[test]
    fn operators_are_case_insensitive() {
        let expr = parse_filter(r#"userName EQ "bjensen" AND active Eq true"#).unwrap();
        assert!(matches!(expr, FilterExpr::And(..)));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_filter(r#"a eq "1" or b eq "2" and c eq "3""#).unwrap();
        let FilterExpr::Or(left, right) = expr else {
            panic!("expected Or at top");
        };
        assert!(matches!(*left, FilterExpr::Compare { .. }));
        assert!(matches!(*right, FilterExpr::And(..)));
    }

    #[test]
    fn not_binds_tightest() {
        let expr = parse_filter(r#"not (active eq true) and title pr"#).unwrap();
        let FilterExpr::And(left, _) = expr else {
            panic!("expected And at top");
        };
        assert!(matches!(*left, FilterExpr::Not(_)));
    }

    #[test]
    fn parses_value_path() {
        let expr = parse_filter(r#"emails[type eq "work" and primary eq true]"#).unwrap();
        let FilterExpr::ValuePath { path, expr } = expr else {
            panic!("expected ValuePath");
        };
        assert_eq!(path.attr, "emails");
        assert!(matches!(*expr, FilterExpr::And(..)));
    }

    #[test]
    fn parses_sub_attribute_path() {
        let expr = parse_filter(r#"name.givenName sw "Bar""#).unwrap();
        assert_eq!(
            expr,
            FilterExpr::Compare {
                path: AttrPath::with_sub("name", "givenName"),
                op: CompareOp::Sw,
                value: json!("Bar"),
            }
        );
    }

    #[test]
    fn parses_urn_prefixed_path() {
        let expr = parse_filter(
            r#"urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber eq "42""#,
        )
        .unwrap();
        let FilterExpr::Compare { path, .. } = expr else {
            panic!("expected Compare");
        };
        assert_eq!(
            path.urn.as_deref(),
            Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
        );
        assert_eq!(path.attr, "employeeNumber");
    }

    #[test]
    fn syntax_error_carries_column() {
        let error = parse_filter(r#"userName eq"#).unwrap_err();
        match error {
            ScimError::InvalidFilter { column, .. } => assert_eq!(column, Some(12)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn trailing_garbage_rejected() {
        assert!(parse_filter(r#"userName pr userName"#).is_err());
    }

    #[test]
    fn unbalanced_parens_rejected() {
        assert!(parse_filter(r#"(userName pr"#).is_err());
        assert!(parse_filter(r#"userName pr)"#).is_err());
    }

    #[test]
    fn deep_path_rejected() {
        assert!(parse_filter(r#"a.b.c eq "x""#).is_err());
    }

    #[test]
    fn value_filter_after_sub_attribute_rejected() {
        assert!(parse_filter(r#"name.givenName[x eq "y"]"#).is_err());
    }

    #[test]
    fn round_trip_is_structurally_stable() {
        for input in [
            r#"userName eq "bjensen""#,
            r#"userName sw "bo" and (emails.type eq "work" or active eq true)"#,
            r#"not (emails[type eq "work"]) or title pr"#,
            r#"a eq "1" or b eq "2" and c eq "3""#,
            r#"meta.lastModified gt "2011-05-13T04:42:34Z""#,
            r#"emails[type eq "work" and value co "@example.com"]"#,
        ] {
            let parsed = parse_filter(input).unwrap();
            let rendered = parsed.to_string();
            let reparsed = parse_filter(&rendered).unwrap();
            assert_eq!(parsed, reparsed, "round trip failed for {}", input);
        }
    }
}
