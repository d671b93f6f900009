//! The transport-facing response struct and SCIM message envelopes.

use crate::error::ScimError;
use serde_json::{json, Value};

/// Schema URN of the ListResponse message.
pub const LIST_RESPONSE_URN: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";
/// Schema URN of the SearchRequest message.
pub const SEARCH_REQUEST_URN: &str = "urn:ietf:params:scim:api:messages:2.0:SearchRequest";

/// The SCIM media type set on every response with a body.
pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";

/// A SCIM HTTP response handed back to the transport.
#[derive(Debug, Clone)]
pub struct ScimHttpResponse {
    pub status: u16,
    /// Response headers; names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ScimHttpResponse {
    /// A JSON response with the SCIM content type.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), SCIM_CONTENT_TYPE.into())],
            body: Some(body.to_string()),
        }
    }

    /// An empty response, e.g. 204 on delete or 304 on a precondition.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Render an error as its SCIM error body.
    pub fn from_error(error: &ScimError) -> Self {
        if matches!(error, ScimError::NotModified) {
            return Self::empty(304);
        }
        Self::json(error.status(), &error.to_error_response())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into().to_lowercase(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON, for hosts and tests that inspect it.
    pub fn json_body(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

/// Assemble a ListResponse envelope (RFC 7644 §3.4.2).
pub fn list_response(resources: Vec<Value>, total_results: usize, start_index: usize) -> Value {
    json!({
        "schemas": [LIST_RESPONSE_URN],
        "totalResults": total_results,
        "itemsPerPage": resources.len(),
        "startIndex": start_index,
        "Resources": resources,
    })
}
