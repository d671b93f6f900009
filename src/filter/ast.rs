//! Filter expression AST.
//!
//! `Display` renders the canonical text form; re-parsing a rendered
//! expression yields a structurally equal AST.

use serde_json::Value;
use std::fmt;

/// Comparison operators of the filter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// Classify an operator keyword, case-insensitively.
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "co" => Some(Self::Co),
            "sw" => Some(Self::Sw),
            "ew" => Some(Self::Ew),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Co => "co",
            Self::Sw => "sw",
            Self::Ew => "ew",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attribute path: optional schema URN, attribute name, optional
/// sub-attribute. Case is preserved; comparisons downstream are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPath {
    pub urn: Option<String>,
    pub attr: String,
    pub sub_attr: Option<String>,
}

impl AttrPath {
    pub fn new(attr: impl Into<String>) -> Self {
        Self {
            urn: None,
            attr: attr.into(),
            sub_attr: None,
        }
    }

    pub fn with_sub(attr: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            urn: None,
            attr: attr.into(),
            sub_attr: Some(sub.into()),
        }
    }

    /// The dotted form without the URN prefix, e.g. `emails.value`.
    pub fn dotted(&self) -> String {
        match &self.sub_attr {
            Some(sub) => format!("{}.{}", self.attr, sub),
            None => self.attr.clone(),
        }
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(urn) = &self.urn {
            write!(f, "{}:", urn)?;
        }
        f.write_str(&self.attr)?;
        if let Some(sub) = &self.sub_attr {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `path op value`
    Compare {
        path: AttrPath,
        op: CompareOp,
        value: Value,
    },
    /// `path pr`
    Present(AttrPath),
    /// `not (expr)`
    Not(Box<FilterExpr>),
    /// `left and right`
    And(Box<FilterExpr>, Box<FilterExpr>),
    /// `left or right`
    Or(Box<FilterExpr>, Box<FilterExpr>),
    /// `path[expr]`
    ValuePath {
        path: AttrPath,
        expr: Box<FilterExpr>,
    },
}

impl FilterExpr {
    /// Binding strength, used by `Display` to insert the parentheses needed
    /// for a structurally faithful round trip.
    fn precedence(&self) -> u8 {
        match self {
            Self::Or(..) => 1,
            Self::And(..) => 2,
            Self::Not(_) => 3,
            _ => 4,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { path, op, value } => {
                // Literals render in their JSON form, so strings come out
                // quoted and escaped.
                write!(f, "{} {} {}", path, op, value)
            }
            Self::Present(path) => write!(f, "{} pr", path),
            Self::Not(inner) => write!(f, "not ({})", inner),
            Self::And(left, right) => {
                left.fmt_child(f, 2)?;
                f.write_str(" and ")?;
                // Equal precedence on the right would re-associate when
                // parsed back, so it gets parentheses too.
                right.fmt_child(f, 3)
            }
            Self::Or(left, right) => {
                left.fmt_child(f, 1)?;
                f.write_str(" or ")?;
                right.fmt_child(f, 2)
            }
            Self::ValuePath { path, expr } => write!(f, "{}[{}]", path, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_compare_quotes_strings() {
        let expr = FilterExpr::Compare {
            path: AttrPath::new("userName"),
            op: CompareOp::Eq,
            value: json!("bjensen"),
        };
        assert_eq!(expr.to_string(), r#"userName eq "bjensen""#);
    }

    #[test]
    fn display_nests_parentheses_for_precedence() {
        let expr = FilterExpr::And(
            Box::new(FilterExpr::Or(
                Box::new(FilterExpr::Present(AttrPath::new("title"))),
                Box::new(FilterExpr::Present(AttrPath::new("nickName"))),
            )),
            Box::new(FilterExpr::Compare {
                path: AttrPath::new("active"),
                op: CompareOp::Eq,
                value: json!(true),
            }),
        );
        assert_eq!(
            expr.to_string(),
            "(title pr or nickName pr) and active eq true"
        );
    }

    #[test]
    fn display_value_path() {
        let expr = FilterExpr::ValuePath {
            path: AttrPath::new("emails"),
            expr: Box::new(FilterExpr::Compare {
                path: AttrPath::new("type"),
                op: CompareOp::Eq,
                value: json!("work"),
            }),
        };
        assert_eq!(expr.to_string(), r#"emails[type eq "work"]"#);
    }
}
