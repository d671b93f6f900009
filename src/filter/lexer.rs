//! Tokenizer for filter and path expressions.
//!
//! Tokens carry the 1-based column at which they start so parse errors can
//! point at the offending input. Whitespace separates tokens everywhere
//! outside string literals, including inside brackets.

use crate::error::{ScimError, ScimResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Attribute name, URN-prefixed path, operator keyword or logical
    /// keyword; classification happens in the parser.
    Ident(String),
    /// Decoded JSON string literal.
    Str(String),
    Number(serde_json::Number),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    /// 1-based column of the token's first character.
    pub column: usize,
}

pub fn tokenize(input: &str) -> ScimResult<Vec<SpannedToken>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let column = pos + 1;
        match c {
            c if c.is_whitespace() => {
                pos += 1;
            }
            '(' => {
                tokens.push(SpannedToken { token: Token::LParen, column });
                pos += 1;
            }
            ')' => {
                tokens.push(SpannedToken { token: Token::RParen, column });
                pos += 1;
            }
            '[' => {
                tokens.push(SpannedToken { token: Token::LBracket, column });
                pos += 1;
            }
            ']' => {
                tokens.push(SpannedToken { token: Token::RBracket, column });
                pos += 1;
            }
            '.' => {
                tokens.push(SpannedToken { token: Token::Dot, column });
                pos += 1;
            }
            '"' => {
                let (literal, next) = lex_string(&chars, pos)?;
                tokens.push(SpannedToken { token: Token::Str(literal), column });
                pos = next;
            }
            '-' | '0'..='9' => {
                let (number, next) = lex_number(&chars, pos)?;
                tokens.push(SpannedToken { token: Token::Number(number), column });
                pos = next;
            }
            c if is_ident_start(c) => {
                let start = pos;
                while pos < chars.len() && is_ident_char(chars[pos]) {
                    pos += 1;
                }
                // A trailing dot belongs to the grammar, not the identifier;
                // "emails." splits into Ident("emails") Dot.
                let mut end = pos;
                while end > start && chars[end - 1] == '.' {
                    end -= 1;
                }
                let word: String = chars[start..end].iter().collect();
                pos = start + (end - start);
                tokens.push(SpannedToken {
                    token: classify_word(word),
                    column,
                });
            }
            other => {
                return Err(ScimError::invalid_filter_at(
                    format!("unexpected character '{}'", other),
                    column,
                ));
            }
        }
    }

    Ok(tokens)
}

fn classify_word(word: String) -> Token {
    match word.to_ascii_lowercase().as_str() {
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        _ => Token::Ident(word),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '$' | '.' | ':')
}

fn lex_string(chars: &[char], start: usize) -> ScimResult<(String, usize)> {
    let mut pos = start + 1;
    let mut out = String::new();
    while pos < chars.len() {
        match chars[pos] {
            '"' => return Ok((out, pos + 1)),
            '\\' => {
                pos += 1;
                let Some(&escaped) = chars.get(pos) else {
                    break;
                };
                match escaped {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    '/' => out.push('/'),
                    'b' => out.push('\u{0008}'),
                    'f' => out.push('\u{000C}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => {
                        let hex: String = chars.get(pos + 1..pos + 5).unwrap_or(&[]).iter().collect();
                        let code = u32::from_str_radix(&hex, 16).map_err(|_| {
                            ScimError::invalid_filter_at(
                                "invalid unicode escape in string literal",
                                pos + 1,
                            )
                        })?;
                        let c = char::from_u32(code).ok_or_else(|| {
                            ScimError::invalid_filter_at(
                                "invalid unicode escape in string literal",
                                pos + 1,
                            )
                        })?;
                        out.push(c);
                        pos += 4;
                    }
                    other => {
                        return Err(ScimError::invalid_filter_at(
                            format!("invalid escape '\\{}' in string literal", other),
                            pos + 1,
                        ));
                    }
                }
                pos += 1;
            }
            c => {
                out.push(c);
                pos += 1;
            }
        }
    }
    Err(ScimError::invalid_filter_at(
        "unterminated string literal",
        start + 1,
    ))
}

fn lex_number(chars: &[char], start: usize) -> ScimResult<(serde_json::Number, usize)> {
    let mut pos = start;
    if chars[pos] == '-' {
        pos += 1;
    }
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut is_float = false;
    if pos < chars.len() && chars[pos] == '.' && chars.get(pos + 1).is_some_and(|c| c.is_ascii_digit())
    {
        is_float = true;
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < chars.len() && matches!(chars[pos], 'e' | 'E') {
        is_float = true;
        pos += 1;
        if pos < chars.len() && matches!(chars[pos], '+' | '-') {
            pos += 1;
        }
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }

    let text: String = chars[start..pos].iter().collect();
    let number = if is_float {
        text.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
    } else {
        text.parse::<i64>().ok().map(serde_json::Number::from)
    };
    match number {
        Some(n) => Ok((n, pos)),
        None => Err(ScimError::invalid_filter_at(
            format!("invalid numeric literal '{}'", text),
            start + 1,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idents(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn lexes_simple_comparison() {
        assert_eq!(
            idents(r#"userName eq "bjensen""#),
            vec![
                Token::Ident("userName".into()),
                Token::Ident("eq".into()),
                Token::Str("bjensen".into()),
            ]
        );
    }

    #[test]
    fn lexes_brackets_and_parens() {
        assert_eq!(
            idents(r#"emails[type eq "work"]"#),
            vec![
                Token::Ident("emails".into()),
                Token::LBracket,
                Token::Ident("type".into()),
                Token::Ident("eq".into()),
                Token::Str("work".into()),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn whitespace_inside_brackets_is_insignificant() {
        assert_eq!(
            idents("emails[ type eq \"work\" ]"),
            idents("emails[type eq \"work\"]")
        );
    }

    #[test]
    fn keeps_urn_prefixed_identifiers_whole() {
        let tokens = idents("urn:ietf:params:scim:schemas:core:2.0:User:userName pr");
        assert_eq!(
            tokens[0],
            Token::Ident("urn:ietf:params:scim:schemas:core:2.0:User:userName".into())
        );
    }

    #[test]
    fn decodes_json_escapes() {
        assert_eq!(
            idents(r#"displayName eq "say \"hi\"\n""#)[2],
            Token::Str("say \"hi\"\n".into())
        );
    }

    #[test]
    fn lexes_numbers_and_booleans() {
        assert_eq!(
            idents("age gt 30 and active eq true"),
            vec![
                Token::Ident("age".into()),
                Token::Ident("gt".into()),
                Token::Number(serde_json::Number::from(30)),
                Token::Ident("and".into()),
                Token::Ident("active".into()),
                Token::Ident("eq".into()),
                Token::True,
            ]
        );
    }

    #[test]
    fn column_is_one_based() {
        let error = tokenize("a eq #").unwrap_err();
        match error {
            ScimError::InvalidFilter { column, .. } => assert_eq!(column, Some(6)),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn unterminated_string_errors() {
        assert!(tokenize(r#"a eq "oops"#).is_err());
    }

    #[test]
    fn trailing_dot_splits_from_identifier() {
        assert_eq!(
            idents("emails. value"),
            vec![
                Token::Ident("emails".into()),
                Token::Dot,
                Token::Ident("value".into()),
            ]
        );
    }
}
