//! Service provider configuration.
//!
//! Process-wide feature flags and limits, read by the dispatcher, the bulk
//! processor and handlers. The configuration is built at startup and shared
//! as an `Arc` snapshot; a runtime reconfiguration replaces the whole
//! structure atomically rather than mutating it in place.

use serde_json::{json, Value};

/// Bulk endpoint limits (RFC 7643 §5).
#[derive(Debug, Clone)]
pub struct BulkConfig {
    pub supported: bool,
    /// Maximum number of operations in a single bulk request.
    pub max_operations: usize,
    /// Maximum bulk payload size in bytes.
    pub max_payload_size: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            supported: true,
            max_operations: 1000,
            max_payload_size: 1_048_576,
        }
    }
}

/// Filter limits (RFC 7643 §5).
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub supported: bool,
    /// Maximum number of resources returned per page.
    pub max_results: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            supported: true,
            max_results: 200,
        }
    }
}

/// An advertised authentication scheme.
#[derive(Debug, Clone)]
pub struct AuthenticationScheme {
    pub name: String,
    pub description: String,
    pub spec_uri: Option<String>,
    /// One of `oauth`, `oauth2`, `oauthbearertoken`, `httpbasic`,
    /// `httpdigest`.
    pub scheme_type: String,
}

/// The service provider configuration document served under
/// `/ServiceProviderConfig` and consulted throughout the engine.
#[derive(Debug, Clone)]
pub struct ServiceProviderConfig {
    pub documentation_uri: Option<String>,
    pub patch_supported: bool,
    pub bulk: BulkConfig,
    pub filter: FilterConfig,
    pub change_password_supported: bool,
    pub sort_supported: bool,
    pub etag_supported: bool,
    pub authentication_schemes: Vec<AuthenticationScheme>,
}

impl Default for ServiceProviderConfig {
    fn default() -> Self {
        Self {
            documentation_uri: None,
            patch_supported: true,
            bulk: BulkConfig::default(),
            filter: FilterConfig::default(),
            change_password_supported: false,
            sort_supported: true,
            etag_supported: true,
            authentication_schemes: Vec::new(),
        }
    }
}

impl ServiceProviderConfig {
    /// Render the RFC 7643 §5 discovery document.
    pub fn to_json(&self, base_url: &str) -> Value {
        let mut doc = json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig"],
            "patch": {"supported": self.patch_supported},
            "bulk": {
                "supported": self.bulk.supported,
                "maxOperations": self.bulk.max_operations,
                "maxPayloadSize": self.bulk.max_payload_size,
            },
            "filter": {
                "supported": self.filter.supported,
                "maxResults": self.filter.max_results,
            },
            "changePassword": {"supported": self.change_password_supported},
            "sort": {"supported": self.sort_supported},
            "etag": {"supported": self.etag_supported},
            "authenticationSchemes": self.authentication_schemes.iter().map(|scheme| {
                let mut entry = json!({
                    "name": scheme.name,
                    "description": scheme.description,
                    "type": scheme.scheme_type,
                });
                if let Some(uri) = &scheme.spec_uri {
                    entry["specUri"] = Value::String(uri.clone());
                }
                entry
            }).collect::<Vec<_>>(),
            "meta": {
                "resourceType": "ServiceProviderConfig",
                "location": format!(
                    "{}/ServiceProviderConfig",
                    base_url.trim_end_matches('/')
                ),
            },
        });
        if let Some(uri) = &self.documentation_uri {
            doc["documentationUri"] = Value::String(uri.clone());
        }
        doc
    }
}
