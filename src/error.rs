//! Error types for the SCIM protocol engine.
//!
//! Every failure the engine can produce maps onto the RFC 7644 §3.12 error
//! vocabulary: an HTTP status code plus, for 4xx responses, a `scimType`
//! keyword. Handler implementations raise [`ScimError`] directly to control
//! the response; any other handler error is wrapped as an internal error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Schema URN of the SCIM error message body.
pub const ERROR_SCHEMA_URN: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// Main error type for SCIM engine operations.
///
/// Variants correspond to the `scimType` keywords of RFC 7644 §3.12 plus the
/// status-only categories (authentication, authorization, not-found,
/// conflict, precondition failures and internal errors).
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// The specified filter syntax was invalid or the attribute/comparison
    /// combination is not supported. Carries the 1-based column of the
    /// offending token when the parser can point at one.
    #[error("invalid filter: {message}")]
    InvalidFilter {
        message: String,
        column: Option<usize>,
    },

    /// The filter yields more results than the server is willing to compute.
    #[error("too many results: {0}")]
    TooMany(String),

    /// An attribute value violated a uniqueness constraint.
    #[error("uniqueness violation on '{attribute}'")]
    Uniqueness { attribute: String },

    /// A modification is incompatible with the target attribute's mutability.
    #[error("mutability violation on '{attribute}': {message}")]
    Mutability { attribute: String, message: String },

    /// The request body structure was unparsable or syntactically invalid.
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    /// A PATCH `path` attribute was invalid or malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A PATCH operation's path did not yield a target to operate on.
    #[error("no target: {0}")]
    NoTarget(String),

    /// A required value was missing or a value was incompatible with the
    /// attribute definition.
    #[error("invalid value for '{attribute}': {message}")]
    InvalidValue { attribute: String, message: String },

    /// The resource version in the request does not match the stored version.
    #[error("invalid version: {0}")]
    InvalidVersion(String),

    /// The request cannot be completed for security reasons.
    #[error("sensitive data in request: {0}")]
    Sensitive(String),

    /// The request lacks valid authentication.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The authenticated caller is not permitted to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource lookup failed.
    #[error("resource not found: {resource_type} with id '{id}'")]
    NotFound { resource_type: String, id: String },

    /// The requested endpoint is not registered.
    #[error("unknown endpoint '{0}'")]
    UnknownEndpoint(String),

    /// The resource conflicts with an existing one.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An `If-Match` precondition failed.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// An `If-None-Match` precondition matched on a read. Not an error in
    /// the usual sense but surfaced through the same channel so dispatch
    /// code can short-circuit into a 304 response.
    #[error("not modified")]
    NotModified,

    /// The requested feature is disabled or not offered by this server.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Unexpected failure inside the engine or a handler.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ScimError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidFilter { .. }
            | Self::TooMany(_)
            | Self::Mutability { .. }
            | Self::InvalidSyntax(_)
            | Self::InvalidPath(_)
            | Self::NoTarget(_)
            | Self::InvalidValue { .. }
            | Self::InvalidVersion(_) => 400,
            Self::Authentication(_) => 401,
            Self::Forbidden(_) | Self::Sensitive(_) => 403,
            Self::NotFound { .. } | Self::UnknownEndpoint(_) => 404,
            Self::Uniqueness { .. } | Self::Conflict(_) => 409,
            Self::PreconditionFailed(_) => 412,
            Self::NotModified => 304,
            Self::NotImplemented(_) => 501,
            Self::Internal(_) => 500,
        }
    }

    /// The RFC 7644 §3.12 `scimType` keyword, present only on 4xx errors
    /// that define one.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::InvalidFilter { .. } => Some("invalidFilter"),
            Self::TooMany(_) => Some("tooMany"),
            Self::Uniqueness { .. } => Some("uniqueness"),
            Self::Mutability { .. } => Some("mutability"),
            Self::InvalidSyntax(_) => Some("invalidSyntax"),
            Self::InvalidPath(_) => Some("invalidPath"),
            Self::NoTarget(_) => Some("noTarget"),
            Self::InvalidValue { .. } => Some("invalidValue"),
            Self::InvalidVersion(_) => Some("invalidVers"),
            Self::Sensitive(_) => Some("sensitive"),
            _ => None,
        }
    }

    /// Render the SCIM error response body.
    ///
    /// 5xx responses carry no `scimType`; the 304 short-circuit produces an
    /// empty body at the dispatch layer and never reaches this method.
    pub fn to_error_response(&self) -> Value {
        let mut body = json!({
            "schemas": [ERROR_SCHEMA_URN],
            "status": self.status().to_string(),
            "detail": self.to_string(),
        });
        if let Some(scim_type) = self.scim_type() {
            body["scimType"] = Value::String(scim_type.to_string());
        }
        body
    }

    /// Create an invalid filter error without column information.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
            column: None,
        }
    }

    /// Create an invalid filter error pointing at a 1-based column.
    pub fn invalid_filter_at(message: impl Into<String>, column: usize) -> Self {
        Self::InvalidFilter {
            message: message.into(),
            column: Some(column),
        }
    }

    /// Create an invalid value error for a named attribute.
    pub fn invalid_value(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create a mutability violation error for a named attribute.
    pub fn mutability(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mutability {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<serde_json::Error> for ScimError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidSyntax(format!("malformed JSON: {}", err))
    }
}

/// Errors raised while registering schemas and resource types at startup.
///
/// These are configuration mistakes rather than wire errors and should be
/// caught during development; if one leaks into request handling it maps to
/// an internal server error.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// A schema document violated a structural invariant.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A resource type referenced an unknown schema or was malformed.
    #[error("invalid resource type: {0}")]
    InvalidResourceType(String),
}

impl From<RegistrationError> for ScimError {
    fn from(err: RegistrationError) -> Self {
        ScimError::Internal(err.to_string())
    }
}

/// Deserialized form of a SCIM error body, used when inspecting nested bulk
/// operation responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub schemas: Vec<String>,
    pub status: String,
    #[serde(rename = "scimType", skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Result type alias for engine operations.
pub type ScimResult<T> = Result<T, ScimError>;
