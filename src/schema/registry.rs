//! Schema registry: loading, validating and resolving schema definitions.
//!
//! The registry is populated during startup and read-only afterwards, so it
//! can be shared across request tasks without synchronization. Construction
//! bootstraps the embedded RFC 7643 definitions; the meta-schema is loaded
//! first and every further document must validate against it.

use super::embedded;
use super::types::{AttrIndex, Schema};
use super::validation::ValidationContext;
use crate::error::{RegistrationError, ScimError, ScimResult};
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// URN of the meta-schema that schema documents are validated against.
pub const SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Schema";
/// URN of the resource type meta-schema.
pub const RESOURCE_TYPE_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:ResourceType";
/// URN of the service provider configuration schema.
pub const SERVICE_PROVIDER_CONFIG_URN: &str =
    "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig";
/// URN of the core User schema.
pub const USER_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
/// URN of the Enterprise User extension schema.
pub const ENTERPRISE_USER_URN: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
/// URN of the core Group schema.
pub const GROUP_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// Registry of parsed schemas keyed by URN.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
    /// Registration order, for stable discovery listings.
    order: Vec<String>,
    /// Common attributes (`id`, `externalId`, `meta`) validated on every
    /// resource regardless of its declared schemas.
    common: Arc<Schema>,
}

impl SchemaRegistry {
    /// Create a registry pre-loaded with the embedded RFC 7643 definitions.
    ///
    /// The meta-schema is parsed first; the remaining built-ins then pass
    /// through the same validation path as user schemas.
    pub fn new() -> Result<Self, RegistrationError> {
        let meta_document: Value = serde_json::from_str(embedded::schema_meta_schema())
            .map_err(|e| RegistrationError::InvalidSchema(e.to_string()))?;
        let meta = Arc::new(Schema::from_json(&meta_document)?);

        let common_document: Value = serde_json::from_str(embedded::common_schema())
            .map_err(|e| RegistrationError::InvalidSchema(e.to_string()))?;
        let common = Arc::new(Schema::from_json(&common_document)?);

        let mut registry = Self {
            schemas: HashMap::new(),
            order: Vec::new(),
            common,
        };
        registry.insert(meta);

        for source in [
            embedded::resource_type_schema(),
            embedded::service_provider_config_schema(),
            embedded::user_schema(),
            embedded::enterprise_user_schema(),
            embedded::group_schema(),
        ] {
            let document: Value = serde_json::from_str(source)
                .map_err(|e| RegistrationError::InvalidSchema(e.to_string()))?;
            registry.register_schema(&document)?;
        }

        Ok(registry)
    }

    /// Parse and register a schema document.
    ///
    /// The document is validated against the meta-schema and the structural
    /// invariants of [`Schema::from_json`]; duplicate URNs are rejected.
    pub fn register_schema(&mut self, document: &Value) -> Result<Arc<Schema>, RegistrationError> {
        self.validate_against_meta_schema(document)?;
        let schema = Schema::from_json(document)?;
        if self.schemas.contains_key(&schema.id) {
            return Err(RegistrationError::InvalidSchema(format!(
                "schema '{}' is already registered",
                schema.id
            )));
        }
        debug!("registered schema '{}' ({})", schema.name, schema.id);
        let schema = Arc::new(schema);
        self.insert(schema.clone());
        Ok(schema)
    }

    fn insert(&mut self, schema: Arc<Schema>) {
        self.order.push(schema.id.clone());
        self.schemas.insert(schema.id.clone(), schema);
    }

    fn validate_against_meta_schema(&self, document: &Value) -> Result<(), RegistrationError> {
        let meta = match self.schemas.get(SCHEMA_URN) {
            Some(meta) => meta,
            // Bootstrapping: the meta-schema itself is not validated.
            None => return Ok(()),
        };
        let mut ctx = ValidationContext::new();
        super::validation::check_document_structure(meta, document, &mut ctx);
        match ctx.into_first_error() {
            Some(error) => Err(RegistrationError::InvalidSchema(error.to_string())),
            None => Ok(()),
        }
    }

    /// Look up a schema by URN.
    pub fn schema(&self, urn: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(urn)
    }

    /// All registered schemas in registration order.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.order.iter().filter_map(|urn| self.schemas.get(urn))
    }

    /// The common-attribute definitions (`id`, `externalId`, `meta`).
    pub fn common_attributes(&self) -> &Arc<Schema> {
        &self.common
    }

    /// Resolve a dotted attribute path across a main schema and its
    /// extensions, case-insensitively.
    ///
    /// A path may carry a URN prefix (`urn:...:attr.sub`), which pins the
    /// lookup to that schema. Unprefixed paths search the main schema first;
    /// a match there wins outright. A name defined by two extensions with no
    /// main-schema match is ambiguous and rejected.
    pub fn resolve_attribute<'a>(
        &'a self,
        main_urn: &str,
        extension_urns: &[String],
        dotted_path: &str,
    ) -> ScimResult<Option<(&'a Arc<Schema>, AttrIndex)>> {
        if let Some((urn, remainder)) = split_urn_prefix(dotted_path) {
            let schema = match self.lookup_urn_case_insensitive(&urn) {
                Some(schema) => schema,
                None => return Ok(None),
            };
            return Ok(schema.find_attribute(&remainder).map(|idx| (schema, idx)));
        }

        if let Some(schema) = self.schemas.get(main_urn) {
            if let Some(index) = schema.find_attribute(dotted_path) {
                return Ok(Some((schema, index)));
            }
        }
        if let Some(index) = self.common.find_attribute(dotted_path) {
            return Ok(Some((&self.common, index)));
        }

        let mut found: Option<(&Arc<Schema>, AttrIndex)> = None;
        for urn in extension_urns {
            let Some(schema) = self.schemas.get(urn) else {
                continue;
            };
            if let Some(index) = schema.find_attribute(dotted_path) {
                if let Some((first, _)) = found {
                    return Err(ScimError::InvalidPath(format!(
                        "attribute '{}' is ambiguous: defined by '{}' and '{}'",
                        dotted_path, first.id, schema.id
                    )));
                }
                found = Some((schema, index));
            }
        }
        Ok(found)
    }

    fn lookup_urn_case_insensitive(&self, urn: &str) -> Option<&Arc<Schema>> {
        if let Some(schema) = self.schemas.get(urn) {
            return Some(schema);
        }
        let lowered = urn.to_lowercase();
        self.schemas
            .values()
            .find(|schema| schema.id.to_lowercase() == lowered)
    }
}

/// Split `urn:...:attrName` into the URN and the trailing attribute path.
///
/// The attribute path is whatever follows the last colon, provided the value
/// actually starts with `urn:` and the remainder is not itself part of the
/// URN namespace. A trailing segment containing a dot is an attribute path
/// (`urn:...:User:name.givenName`); a URN with no attribute suffix returns
/// `None`.
pub fn split_urn_prefix(path: &str) -> Option<(String, String)> {
    if !path.to_lowercase().starts_with("urn:") {
        return None;
    }
    let colon = path.rfind(':')?;
    let (urn, attr) = (&path[..colon], &path[colon + 1..]);
    if attr.is_empty() || urn.eq_ignore_ascii_case("urn") {
        return None;
    }
    // Version-ish segments such as "2.0" belong to the URN, not the path.
    if attr.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    Some((urn.to_string(), attr.to_string()))
}
