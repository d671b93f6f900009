//! Client-side configuration.
//!
//! The engine itself is transport-free; this configuration struct is the
//! contract a SCIM client adapter built on top of it is expected to honor,
//! including the automatic bulk request splitting implemented in
//! [`crate::bulk::splitting`].

use std::collections::HashMap;

/// Default timeout, in seconds, for request, socket and connect timeouts.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Configuration for a SCIM client adapter.
#[derive(Debug, Clone)]
pub struct ScimClientConfig {
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Socket read timeout in seconds.
    pub socket_timeout: u64,
    /// Connect timeout in seconds.
    pub connect_timeout: u64,
    /// Whether the underlying HTTP client keeps cookies between requests.
    pub enable_cookie_management: bool,
    /// Split bulk requests that exceed the server's advertised
    /// `bulk.maxOperations` into several requests, rewriting bulkId
    /// references with assigned ids between rounds. A failure mid-sequence
    /// can leave earlier rounds applied.
    pub enable_automatic_bulk_request_splitting: bool,
    /// TLS protocol version used for outbound connections.
    pub tls_version: String,
    /// Additional headers sent with every request, multi-valued.
    pub http_headers: HashMap<String, Vec<String>>,
    /// Expected response headers:
    /// `None` checks for the standard `application/scim+json` content type,
    /// an empty map disables the check, a populated map checks exactly its
    /// entries.
    pub expected_http_response_headers: Option<HashMap<String, String>>,
}

impl Default for ScimClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT_SECONDS,
            socket_timeout: DEFAULT_TIMEOUT_SECONDS,
            connect_timeout: DEFAULT_TIMEOUT_SECONDS,
            enable_cookie_management: false,
            enable_automatic_bulk_request_splitting: false,
            tls_version: "TLSv1.2".to_string(),
            http_headers: HashMap::new(),
            expected_http_response_headers: None,
        }
    }
}

impl ScimClientConfig {
    /// Whether a response's headers satisfy the configured expectation.
    pub fn response_headers_acceptable(&self, headers: &HashMap<String, String>) -> bool {
        let expected: HashMap<String, String> = match &self.expected_http_response_headers {
            None => HashMap::from([(
                "content-type".to_string(),
                "application/scim+json".to_string(),
            )]),
            Some(map) if map.is_empty() => return true,
            Some(map) => map
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
        };
        expected.iter().all(|(name, value)| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, actual)| actual.to_lowercase().starts_with(&value.to_lowercase()))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = ScimClientConfig::default();
        assert_eq!(config.request_timeout, 10);
        assert_eq!(config.socket_timeout, 10);
        assert_eq!(config.connect_timeout, 10);
        assert_eq!(config.tls_version, "TLSv1.2");
        assert!(!config.enable_automatic_bulk_request_splitting);
    }

    #[test]
    fn default_header_check_requires_scim_content_type() {
        let config = ScimClientConfig::default();
        let mut headers = HashMap::new();
        headers.insert(
            "Content-Type".to_string(),
            "application/scim+json; charset=utf-8".to_string(),
        );
        assert!(config.response_headers_acceptable(&headers));
        headers.insert("Content-Type".to_string(), "text/html".to_string());
        assert!(!config.response_headers_acceptable(&headers));
    }

    #[test]
    fn empty_expectation_disables_the_check() {
        let config = ScimClientConfig {
            expected_http_response_headers: Some(HashMap::new()),
            ..Default::default()
        };
        assert!(config.response_headers_acceptable(&HashMap::new()));
    }
}
