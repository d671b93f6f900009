//! Resource type descriptors and their registry.
//!
//! A [`ResourceType`] binds an endpoint to a main schema, optional schema
//! extensions and a [`ResourceHandler`]. Resource types are registered
//! during startup and shared immutably afterwards.

use super::handler::ResourceHandler;
use crate::error::RegistrationError;
use crate::schema::registry::SchemaRegistry;
use crate::schema::validation::SchemaSet;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Engine features toggled per resource type.
///
/// `auto_filtering` and `auto_sorting` let the engine evaluate filters and
/// sorting in memory for handlers that ignore them; `etag` opts the type
/// into version preconditions when the service provider supports them.
#[derive(Debug, Clone, Copy)]
pub struct ResourceTypeFeatures {
    pub auto_filtering: bool,
    pub auto_sorting: bool,
    pub etag: bool,
}

impl Default for ResourceTypeFeatures {
    fn default() -> Self {
        Self {
            auto_filtering: true,
            auto_sorting: true,
            etag: true,
        }
    }
}

/// A named endpoint descriptor: schema binding plus handler.
pub struct ResourceType {
    pub name: String,
    pub description: String,
    /// Endpoint path relative to the base URL, with a leading slash.
    pub endpoint: String,
    pub schema_urn: String,
    /// Extension URNs with their `required` flag.
    pub extensions: Vec<(String, bool)>,
    pub features: ResourceTypeFeatures,
    schema_set: SchemaSet,
    handler: Arc<dyn ResourceHandler>,
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("schema_urn", &self.schema_urn)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl ResourceType {
    /// Parse a resource type document and bind it to a handler.
    ///
    /// All referenced schema URNs must already be registered; an unknown
    /// URN fails registration.
    pub fn from_json(
        registry: &SchemaRegistry,
        document: &Value,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<Self, RegistrationError> {
        let obj = document.as_object().ok_or_else(|| {
            RegistrationError::InvalidResourceType("document must be a JSON object".into())
        })?;

        let name = required_str(obj, "name")?;
        let endpoint = required_str(obj, "endpoint")?;
        let endpoint = if endpoint.starts_with('/') {
            endpoint
        } else {
            format!("/{}", endpoint)
        };
        let schema_urn = required_str(obj, "schema")?;
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut extensions = Vec::new();
        if let Some(raw) = obj.get("schemaExtensions").and_then(Value::as_array) {
            for entry in raw {
                let urn = entry
                    .get("schema")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        RegistrationError::InvalidResourceType(
                            "schemaExtensions entries require a 'schema' URN".into(),
                        )
                    })?;
                let required = entry
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                extensions.push((urn.to_string(), required));
            }
        }

        let schema_set =
            SchemaSet::resolve(registry, &schema_urn, &extensions).ok_or_else(|| {
                RegistrationError::InvalidResourceType(format!(
                    "resource type '{}' references an unregistered schema",
                    name
                ))
            })?;

        Ok(Self {
            name,
            description,
            endpoint,
            schema_urn,
            extensions,
            features: ResourceTypeFeatures::default(),
            schema_set,
            handler,
        })
    }

    /// Override the default feature toggles.
    pub fn with_features(mut self, features: ResourceTypeFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn handler(&self) -> &dyn ResourceHandler {
        self.handler.as_ref()
    }

    pub fn schema_set(&self) -> &SchemaSet {
        &self.schema_set
    }

    /// The location of a resource of this type.
    pub fn resource_location(&self, base_url: &str, id: &str) -> String {
        format!("{}{}/{}", base_url.trim_end_matches('/'), self.endpoint, id)
    }

    /// The discovery document served under `/ResourceTypes`.
    pub fn to_json(&self, base_url: &str) -> Value {
        let mut doc = json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ResourceType"],
            "id": self.name,
            "name": self.name,
            "description": self.description,
            "endpoint": self.endpoint,
            "schema": self.schema_urn,
            "meta": {
                "resourceType": "ResourceType",
                "location": format!(
                    "{}/ResourceTypes/{}",
                    base_url.trim_end_matches('/'),
                    self.name
                ),
            },
        });
        if !self.extensions.is_empty() {
            doc["schemaExtensions"] = Value::Array(
                self.extensions
                    .iter()
                    .map(|(urn, required)| json!({"schema": urn, "required": required}))
                    .collect(),
            );
        }
        doc
    }
}

/// Registry of resource types keyed by name and endpoint.
#[derive(Default)]
pub struct ResourceTypeRegistry {
    types: Vec<Arc<ResourceType>>,
}

impl ResourceTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type; duplicate names or endpoints are rejected.
    pub fn register(&mut self, resource_type: ResourceType) -> Result<Arc<ResourceType>, RegistrationError> {
        if self.by_name(&resource_type.name).is_some() {
            return Err(RegistrationError::InvalidResourceType(format!(
                "resource type '{}' is already registered",
                resource_type.name
            )));
        }
        if self.by_endpoint(&resource_type.endpoint).is_some() {
            return Err(RegistrationError::InvalidResourceType(format!(
                "endpoint '{}' is already registered",
                resource_type.endpoint
            )));
        }
        let resource_type = Arc::new(resource_type);
        resource_type.handler().post_construct(&resource_type);
        self.types.push(resource_type.clone());
        Ok(resource_type)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.types
            .iter()
            .find(|rt| rt.name.eq_ignore_ascii_case(name))
    }

    pub fn by_endpoint(&self, endpoint: &str) -> Option<&Arc<ResourceType>> {
        self.types
            .iter()
            .find(|rt| rt.endpoint.eq_ignore_ascii_case(endpoint))
    }

    /// Resolve a `$ref` URI or type name to a resource type, e.g. `User`,
    /// `https://host/v2/Users` or `https://host/v2/Users/2819c223`.
    pub fn resolve_ref(&self, reference: &str) -> Option<&Arc<ResourceType>> {
        if let Some(by_name) = self.by_name(reference) {
            return Some(by_name);
        }
        self.types.iter().find(|rt| {
            let marker = format!("{}/", rt.endpoint);
            let lowered = reference.to_lowercase();
            lowered.ends_with(&rt.endpoint.to_lowercase())
                || lowered.contains(&marker.to_lowercase())
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn required_str(
    obj: &serde_json::Map<String, Value>,
    field: &str,
) -> Result<String, RegistrationError> {
    obj.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            RegistrationError::InvalidResourceType(format!("missing required field '{}'", field))
        })
}
