//! Per-request context handed to handlers.
//!
//! A [`Context`] is constructed by the dispatcher for every request and is
//! stable for the duration of the handler call. It carries request
//! metadata, the opaque authorization value supplied by the transport, the
//! base URL and read access to the engine's startup-time state.

use super::resource_type::{ResourceType, ResourceTypeRegistry};
use crate::schema::validation::HttpMethod;
use crate::service_provider::ServiceProviderConfig;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Request-scoped context.
#[derive(Clone)]
pub struct Context {
    /// Unique identifier for this request, for logging and tracing.
    pub request_id: String,
    pub method: HttpMethod,
    /// Base URL the request was addressed to, e.g. `https://example.com/v2`.
    pub base_url: String,
    /// Opaque authorization value from the transport; the engine never
    /// interprets it.
    pub authorization: Option<String>,
    headers: HashMap<String, String>,
    resource_types: Arc<ResourceTypeRegistry>,
    service_provider: Arc<ServiceProviderConfig>,
}

impl Context {
    pub(crate) fn new(
        method: HttpMethod,
        base_url: String,
        authorization: Option<String>,
        headers: HashMap<String, String>,
        resource_types: Arc<ResourceTypeRegistry>,
        service_provider: Arc<ServiceProviderConfig>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method,
            base_url,
            authorization,
            headers,
            resource_types,
            service_provider,
        }
    }

    /// Look up a request header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Resolve a `$ref` URI or resource type name, e.g. for validating
    /// resource references inside documents.
    pub fn resolve_resource_type(&self, reference: &str) -> Option<Arc<ResourceType>> {
        self.resource_types.resolve_ref(reference).cloned()
    }

    /// Snapshot of the service provider configuration.
    pub fn service_provider(&self) -> &ServiceProviderConfig {
        &self.service_provider
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("method", &self.method.as_str())
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_headers(headers: &[(&str, &str)]) -> Context {
        Context::new(
            HttpMethod::Get,
            "https://example.com/v2".into(),
            None,
            headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            Arc::new(ResourceTypeRegistry::new()),
            Arc::new(ServiceProviderConfig::default()),
        )
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let context = context_with_headers(&[("If-Match", "W/\"v1\"")]);
        assert_eq!(context.header("if-match"), Some("W/\"v1\""));
        assert_eq!(context.header("IF-MATCH"), Some("W/\"v1\""));
        assert_eq!(context.header("if-none-match"), None);
    }

    #[test]
    fn request_ids_are_unique() {
        let a = context_with_headers(&[]);
        let b = context_with_headers(&[]);
        assert_ne!(a.request_id, b.request_id);
    }
}
