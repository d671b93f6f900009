//! The transport-facing request struct.
//!
//! The engine consumes a plain request description and returns a plain
//! response; binding it to axum, actix or anything else is the host's
//! concern. Paths are relative to the engine's base URL.

use crate::error::{ScimError, ScimResult};
use serde_json::Value;
use std::collections::HashMap;

/// A SCIM HTTP request as seen by the engine.
#[derive(Debug, Clone, Default)]
pub struct ScimHttpRequest {
    /// HTTP method name.
    pub method: String,
    /// Path relative to the base URL, e.g. `/Users/2819c223`.
    pub path: String,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
    /// Request headers with lowercased names.
    pub headers: HashMap<String, String>,
    /// Raw request body.
    pub body: Option<String>,
    /// Opaque authorization value forwarded to handlers untouched.
    pub authorization: Option<String>,
}

impl ScimHttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Populate the query map from a raw query string, decoding
    /// percent-escapes and `+`.
    pub fn with_query_string(mut self, raw: &str) -> Self {
        for pair in raw.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            self.query
                .insert(percent_decode(name), percent_decode(value));
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON, enforcing the SCIM content type when the
    /// transport supplied one. `application/json` is accepted as a
    /// compatibility fallback.
    pub fn json_body(&self) -> ScimResult<Value> {
        if let Some(content_type) = self.header("content-type") {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if essence != "application/scim+json" && essence != "application/json" {
                return Err(ScimError::InvalidSyntax(format!(
                    "unsupported content type '{}'",
                    essence
                )));
            }
        }
        let body = self
            .body
            .as_deref()
            .ok_or_else(|| ScimError::InvalidSyntax("request body is required".into()))?;
        Ok(serde_json::from_str(body)?)
    }
}

fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'+' => {
                out.push(b' ');
                pos += 1;
            }
            b'%' if pos + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[pos + 1..pos + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(byte) => {
                        out.push(byte);
                        pos += 3;
                    }
                    None => {
                        out.push(b'%');
                        pos += 1;
                    }
                }
            }
            other => {
                out.push(other);
                pos += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_decoding() {
        let request = ScimHttpRequest::new("GET", "/Users")
            .with_query_string("filter=userName%20eq%20%22bob%22&count=10&sortBy=userName");
        assert_eq!(request.query_param("filter"), Some(r#"userName eq "bob""#));
        assert_eq!(request.query_param("count"), Some("10"));
        assert_eq!(request.query_param("SORTBY"), Some("userName"));
    }

    #[test]
    fn plus_decodes_to_space() {
        let request = ScimHttpRequest::new("GET", "/Users")
            .with_query_string("filter=title+pr");
        assert_eq!(request.query_param("filter"), Some("title pr"));
    }

    #[test]
    fn json_body_accepts_scim_content_type() {
        let request = ScimHttpRequest::new("POST", "/Users")
            .with_header("Content-Type", "application/scim+json; charset=utf-8")
            .with_body(r#"{"userName":"bob"}"#);
        assert_eq!(request.json_body().unwrap()["userName"], "bob");
    }

    #[test]
    fn json_body_rejects_foreign_content_type() {
        let request = ScimHttpRequest::new("POST", "/Users")
            .with_header("Content-Type", "text/xml")
            .with_body("<user/>");
        assert!(request.json_body().is_err());
    }

    #[test]
    fn malformed_json_is_invalid_syntax() {
        let request = ScimHttpRequest::new("POST", "/Users").with_body("{nope");
        let error = request.json_body().unwrap_err();
        assert_eq!(error.scim_type(), Some("invalidSyntax"));
    }
}
