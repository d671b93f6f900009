//! Endpoint dispatcher: URL → resource type → operation.
//!
//! [`ScimEngine`] is the entry point of the crate. It is configured once
//! through [`ScimEngineBuilder`], shared immutably across request tasks,
//! and consumes transport-agnostic [`ScimHttpRequest`] values, producing
//! [`ScimHttpResponse`] values with conformant SCIM bodies.

pub mod request;
pub mod response;
pub mod sorting;

pub use request::ScimHttpRequest;
pub use response::{list_response, ScimHttpResponse, LIST_RESPONSE_URN, SEARCH_REQUEST_URN};

use crate::bulk;
use crate::error::{RegistrationError, ScimError, ScimResult};
use crate::filter::{parse_filter, FilterEvaluator, FilterExpr};
use crate::patch::{apply_patch, PatchRequest};
use crate::resource::context::Context;
use crate::resource::handler::{ListRequest, ResourceHandler, SortOrder};
use crate::resource::resource_type::{ResourceType, ResourceTypeFeatures, ResourceTypeRegistry};
use crate::resource::version::ResourceVersion;
use crate::schema::registry::SchemaRegistry;
use crate::schema::types::Schema;
use crate::schema::validation::{
    validate_request, validate_response, AttributeProjection, HttpMethod, ValidationContext,
};
use crate::service_provider::ServiceProviderConfig;
use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Configures and assembles a [`ScimEngine`].
pub struct ScimEngineBuilder {
    base_url: String,
    schema_registry: SchemaRegistry,
    resource_types: ResourceTypeRegistry,
    service_provider: ServiceProviderConfig,
}

impl ScimEngineBuilder {
    /// Start a builder with the RFC 7643 built-in schemas loaded.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RegistrationError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            schema_registry: SchemaRegistry::new()?,
            resource_types: ResourceTypeRegistry::new(),
            service_provider: ServiceProviderConfig::default(),
        })
    }

    /// Register a user-supplied schema document.
    pub fn register_schema(&mut self, document: &Value) -> Result<(), RegistrationError> {
        self.schema_registry.register_schema(document)?;
        Ok(())
    }

    /// Register a resource type bound to its handler.
    pub fn register_resource_type(
        &mut self,
        document: &Value,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<Arc<ResourceType>, RegistrationError> {
        let resource_type = ResourceType::from_json(&self.schema_registry, document, handler)?;
        self.resource_types.register(resource_type)
    }

    /// Register a resource type with explicit feature toggles.
    pub fn register_resource_type_with_features(
        &mut self,
        document: &Value,
        handler: Arc<dyn ResourceHandler>,
        features: ResourceTypeFeatures,
    ) -> Result<Arc<ResourceType>, RegistrationError> {
        let resource_type = ResourceType::from_json(&self.schema_registry, document, handler)?
            .with_features(features);
        self.resource_types.register(resource_type)
    }

    /// Replace the default service provider configuration.
    pub fn service_provider(mut self, config: ServiceProviderConfig) -> Self {
        self.service_provider = config;
        self
    }

    pub fn build(self) -> ScimEngine {
        info!(
            "SCIM engine ready at '{}' with {} resource types",
            self.base_url,
            self.resource_types.len()
        );
        ScimEngine {
            base_url: self.base_url,
            schema_registry: Arc::new(self.schema_registry),
            resource_types: Arc::new(self.resource_types),
            service_provider: Arc::new(self.service_provider),
        }
    }
}

/// The SCIM protocol engine.
///
/// All state is written during construction and read-only afterwards, so an
/// engine can be shared across concurrent request tasks without locking.
#[derive(Clone)]
pub struct ScimEngine {
    base_url: String,
    schema_registry: Arc<SchemaRegistry>,
    resource_types: Arc<ResourceTypeRegistry>,
    service_provider: Arc<ServiceProviderConfig>,
}

/// List parameters after query/body parsing and clamping.
struct ListParams {
    start_index: usize,
    count: usize,
    filter: Option<FilterExpr>,
    sort_by: Option<String>,
    sort_order: SortOrder,
    projection: AttributeProjection,
}

impl ScimEngine {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn schema_registry(&self) -> &SchemaRegistry {
        &self.schema_registry
    }

    pub fn service_provider(&self) -> &ServiceProviderConfig {
        &self.service_provider
    }

    pub fn resource_type(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.resource_types.by_name(name)
    }

    /// Process one request, mapping every failure onto its SCIM error body.
    pub async fn handle(&self, request: ScimHttpRequest) -> ScimHttpResponse {
        let method = request.method.clone();
        let path = request.path.clone();
        debug!("SCIM request {} {}", method, path);

        match self.dispatch(request).await {
            Ok(response) => {
                debug!("SCIM response {} for {} {}", response.status, method, path);
                response
            }
            Err(error) => {
                if error.status() >= 500 {
                    warn!("SCIM {} {} failed: {}", method, path, error);
                } else {
                    debug!("SCIM {} {} rejected: {}", method, path, error);
                }
                ScimHttpResponse::from_error(&error)
            }
        }
    }

    /// `handle` behind a boxed future, for recursive callers such as the
    /// bulk processor.
    pub(crate) fn handle_boxed(
        &self,
        request: ScimHttpRequest,
    ) -> Pin<Box<dyn Future<Output = ScimHttpResponse> + Send + '_>> {
        Box::pin(self.handle(request))
    }

    async fn dispatch(&self, request: ScimHttpRequest) -> ScimResult<ScimHttpResponse> {
        let method = HttpMethod::parse(&request.method).ok_or_else(|| {
            ScimError::InvalidSyntax(format!("unsupported HTTP method '{}'", request.method))
        })?;
        let context = self.context_for(method, &request);

        let path = request.path.trim_matches('/').to_string();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            ["ServiceProviderConfig"] => {
                self.require_get(method)?;
                Ok(ScimHttpResponse::json(
                    200,
                    &self.service_provider.to_json(&self.base_url),
                ))
            }
            ["Schemas"] => {
                self.require_get(method)?;
                let documents: Vec<Value> = self
                    .schema_registry
                    .schemas()
                    .map(|schema| self.schema_document(schema))
                    .collect();
                let total = documents.len();
                Ok(ScimHttpResponse::json(
                    200,
                    &list_response(documents, total, 1),
                ))
            }
            ["Schemas", id] => {
                self.require_get(method)?;
                let schema = self
                    .schema_registry
                    .schema(id)
                    .ok_or_else(|| ScimError::not_found("Schema", *id))?;
                Ok(ScimHttpResponse::json(200, &self.schema_document(schema)))
            }
            ["ResourceTypes"] => {
                self.require_get(method)?;
                let documents: Vec<Value> = self
                    .resource_types
                    .iter()
                    .map(|rt| rt.to_json(&self.base_url))
                    .collect();
                let total = documents.len();
                Ok(ScimHttpResponse::json(
                    200,
                    &list_response(documents, total, 1),
                ))
            }
            ["ResourceTypes", name] => {
                self.require_get(method)?;
                let resource_type = self
                    .resource_types
                    .by_name(name)
                    .ok_or_else(|| ScimError::not_found("ResourceType", *name))?;
                Ok(ScimHttpResponse::json(
                    200,
                    &resource_type.to_json(&self.base_url),
                ))
            }
            ["Bulk"] => {
                if method != HttpMethod::Post {
                    return Err(ScimError::NotImplemented(
                        "the bulk endpoint only accepts POST".into(),
                    ));
                }
                if !self.service_provider.bulk.supported {
                    return Err(ScimError::NotImplemented(
                        "bulk requests are not supported".into(),
                    ));
                }
                bulk::process_bulk(self, &request).await
            }
            [endpoint] => {
                let resource_type = self.endpoint_type(endpoint)?;
                match method {
                    HttpMethod::Post => self.create(&resource_type, &request, &context).await,
                    HttpMethod::Get => {
                        let params = self.params_from_query(&resource_type, &request)?;
                        self.list(&resource_type, params, &context).await
                    }
                    _ => Err(ScimError::NotImplemented(format!(
                        "{} is not supported on '{}'",
                        method.as_str(),
                        resource_type.endpoint
                    ))),
                }
            }
            [endpoint, ".search"] => {
                let resource_type = self.endpoint_type(endpoint)?;
                if method != HttpMethod::Post {
                    return Err(ScimError::NotImplemented(
                        ".search only accepts POST".into(),
                    ));
                }
                let params = self.params_from_search_body(&resource_type, &request)?;
                self.list(&resource_type, params, &context).await
            }
            [endpoint, id] => {
                let resource_type = self.endpoint_type(endpoint)?;
                match method {
                    HttpMethod::Get => self.get_by_id(&resource_type, id, &request, &context).await,
                    HttpMethod::Put => self.replace(&resource_type, id, &request, &context).await,
                    HttpMethod::Patch => self.patch(&resource_type, id, &request, &context).await,
                    HttpMethod::Delete => self.delete(&resource_type, id, &request, &context).await,
                    HttpMethod::Post => Err(ScimError::NotImplemented(
                        "POST targets the collection, not a resource".into(),
                    )),
                }
            }
            _ => Err(ScimError::UnknownEndpoint(request.path.clone())),
        }
    }

    fn require_get(&self, method: HttpMethod) -> ScimResult<()> {
        if method == HttpMethod::Get {
            Ok(())
        } else {
            Err(ScimError::NotImplemented(
                "discovery endpoints are read-only".into(),
            ))
        }
    }

    fn endpoint_type(&self, endpoint: &str) -> ScimResult<Arc<ResourceType>> {
        self.resource_types
            .by_endpoint(&format!("/{}", endpoint))
            .cloned()
            .ok_or_else(|| ScimError::UnknownEndpoint(format!("/{}", endpoint)))
    }

    fn context_for(&self, method: HttpMethod, request: &ScimHttpRequest) -> Context {
        let headers: HashMap<String, String> = request
            .headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        Context::new(
            method,
            self.base_url.clone(),
            request.authorization.clone(),
            headers,
            self.resource_types.clone(),
            self.service_provider.clone(),
        )
    }

    fn schema_document(&self, schema: &Arc<Schema>) -> Value {
        let mut doc = schema.to_json();
        doc["meta"] = json!({
            "resourceType": "Schema",
            "location": format!("{}/Schemas/{}", self.base_url, schema.id),
        });
        doc
    }

    // ---- resource operations -------------------------------------------

    async fn create(
        &self,
        resource_type: &ResourceType,
        request: &ScimHttpRequest,
        context: &Context,
    ) -> ScimResult<ScimHttpResponse> {
        info!(
            "SCIM create {} (request: '{}')",
            resource_type.name, context.request_id
        );
        let body = request.json_body()?;
        let set = resource_type.schema_set();
        let validated = validate_request(set, &body, HttpMethod::Post, None)?;

        if let Some(validator) = resource_type.handler().request_validator() {
            let mut errors = ValidationContext::new();
            validator.validate_create(&validated, &mut errors, context).await;
            errors.finish(())?;
        }

        let stored = resource_type.handler().create(validated, context).await?;
        let projection = self.projection_from_query(request)?;
        let (document, version, location) =
            self.finalize(resource_type, stored, &projection, Some(&body))?;

        let mut response =
            ScimHttpResponse::json(201, &document).with_header("location", location);
        if let Some(version) = version {
            response = response.with_header("etag", version.to_etag());
        }
        Ok(response)
    }

    async fn get_by_id(
        &self,
        resource_type: &ResourceType,
        id: &str,
        request: &ScimHttpRequest,
        context: &Context,
    ) -> ScimResult<ScimHttpResponse> {
        debug!(
            "SCIM get {} '{}' (request: '{}')",
            resource_type.name, id, context.request_id
        );
        let projection = self.projection_from_query(request)?;
        let stored = resource_type.handler().get(id, &projection, context).await?;

        let version = stored_version(&stored);
        self.check_preconditions(resource_type, request, version.as_ref(), HttpMethod::Get)?;

        let (document, version, location) =
            self.finalize(resource_type, stored, &projection, None)?;
        let mut response = ScimHttpResponse::json(200, &document).with_header("location", location);
        if let Some(version) = version {
            response = response.with_header("etag", version.to_etag());
        }
        Ok(response)
    }

    async fn list(
        &self,
        resource_type: &ResourceType,
        params: ListParams,
        context: &Context,
    ) -> ScimResult<ScimHttpResponse> {
        debug!(
            "SCIM list {} (request: '{}')",
            resource_type.name, context.request_id
        );
        let set = resource_type.schema_set();
        let max_results = self.service_provider.filter.max_results;

        let list_request = ListRequest {
            start_index: params.start_index,
            count: params.count,
            filter: params.filter.clone(),
            sort_by: params.sort_by.clone(),
            sort_order: params.sort_order,
            projection: params.projection.clone(),
        };
        let partial = resource_type
            .handler()
            .list(&list_request, context)
            .await?;

        let features = resource_type.features;
        let (page, total_results) = if features.auto_filtering {
            // The handler returned the full candidate set; evaluate the
            // filter, sort and paginate here.
            let mut all = partial.resources;
            if all.len() > max_results {
                return Err(ScimError::TooMany(format!(
                    "result set of {} exceeds the maximum of {}",
                    all.len(),
                    max_results
                )));
            }
            if let Some(filter) = &params.filter {
                let evaluator = FilterEvaluator::new(set);
                all.retain(|resource| evaluator.matches(filter, resource));
            }
            if features.auto_sorting {
                if let Some(sort_by) = &params.sort_by {
                    sorting::sort_resources(&mut all, set, sort_by, params.sort_order);
                }
            }
            let total = all.len();
            let page: Vec<Value> = all
                .into_iter()
                .skip(params.start_index - 1)
                .take(params.count)
                .collect();
            (page, total)
        } else {
            let mut page = partial.resources;
            if features.auto_sorting {
                if let Some(sort_by) = &params.sort_by {
                    sorting::sort_resources(&mut page, set, sort_by, params.sort_order);
                }
            }
            (page, partial.total_results)
        };

        let mut resources = Vec::with_capacity(page.len());
        for stored in page {
            let (document, _, _) = self.finalize(resource_type, stored, &params.projection, None)?;
            resources.push(document);
        }

        Ok(ScimHttpResponse::json(
            200,
            &list_response(resources, total_results, params.start_index),
        ))
    }

    async fn replace(
        &self,
        resource_type: &ResourceType,
        id: &str,
        request: &ScimHttpRequest,
        context: &Context,
    ) -> ScimResult<ScimHttpResponse> {
        info!(
            "SCIM replace {} '{}' (request: '{}')",
            resource_type.name, id, context.request_id
        );
        let body = request.json_body()?;
        let set = resource_type.schema_set();

        let stored = resource_type
            .handler()
            .get(id, &AttributeProjection::none(), context)
            .await?;
        self.check_preconditions(
            resource_type,
            request,
            stored_version(&stored).as_ref(),
            HttpMethod::Put,
        )?;

        let mut validated = validate_request(set, &body, HttpMethod::Put, Some(&stored))?;

        if let Some(validator) = resource_type.handler().request_validator() {
            let mut errors = ValidationContext::new();
            validator
                .validate_update(&stored, &validated, &mut errors, context)
                .await;
            errors.finish(())?;
        }

        validated["id"] = Value::String(id.to_string());
        let updated = resource_type.handler().update(id, validated, context).await?;

        let projection = self.projection_from_query(request)?;
        let (document, version, location) =
            self.finalize(resource_type, updated, &projection, Some(&body))?;
        let mut response = ScimHttpResponse::json(200, &document).with_header("location", location);
        if let Some(version) = version {
            response = response.with_header("etag", version.to_etag());
        }
        Ok(response)
    }

    async fn patch(
        &self,
        resource_type: &ResourceType,
        id: &str,
        request: &ScimHttpRequest,
        context: &Context,
    ) -> ScimResult<ScimHttpResponse> {
        info!(
            "SCIM patch {} '{}' (request: '{}')",
            resource_type.name, id, context.request_id
        );
        if !self.service_provider.patch_supported {
            return Err(ScimError::NotImplemented("PATCH is not supported".into()));
        }
        let body = request.json_body()?;
        let patch_request = PatchRequest::from_json(&body)?;
        let set = resource_type.schema_set();

        let stored = resource_type
            .handler()
            .get(id, &AttributeProjection::none(), context)
            .await?;
        self.check_preconditions(
            resource_type,
            request,
            stored_version(&stored).as_ref(),
            HttpMethod::Patch,
        )?;

        let mut patched = apply_patch(set, &stored, &patch_request)?;

        if let Some(validator) = resource_type.handler().request_validator() {
            let mut errors = ValidationContext::new();
            validator
                .validate_update(&stored, &patched, &mut errors, context)
                .await;
            errors.finish(())?;
        }

        patched["id"] = Value::String(id.to_string());
        let updated = resource_type.handler().update(id, patched.clone(), context).await?;

        let projection = self.projection_from_query(request)?;
        let (document, version, location) =
            self.finalize(resource_type, updated, &projection, Some(&patched))?;
        let mut response = ScimHttpResponse::json(200, &document).with_header("location", location);
        if let Some(version) = version {
            response = response.with_header("etag", version.to_etag());
        }
        Ok(response)
    }

    async fn delete(
        &self,
        resource_type: &ResourceType,
        id: &str,
        request: &ScimHttpRequest,
        context: &Context,
    ) -> ScimResult<ScimHttpResponse> {
        info!(
            "SCIM delete {} '{}' (request: '{}')",
            resource_type.name, id, context.request_id
        );
        let stored = resource_type
            .handler()
            .get(id, &AttributeProjection::none(), context)
            .await?;
        self.check_preconditions(
            resource_type,
            request,
            stored_version(&stored).as_ref(),
            HttpMethod::Delete,
        )?;

        resource_type.handler().delete(id, context).await?;
        Ok(ScimHttpResponse::empty(204))
    }

    // ---- shared pieces --------------------------------------------------

    /// Overwrite the server-owned `meta`, then validate and project the
    /// outbound document. Returns the document, its version and location.
    fn finalize(
        &self,
        resource_type: &ResourceType,
        mut stored: Value,
        projection: &AttributeProjection,
        request_body: Option<&Value>,
    ) -> ScimResult<(Value, Option<ResourceVersion>, String)> {
        let id = stored
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ScimError::internal("handler returned a resource without an id"))?
            .to_string();
        let location = resource_type.resource_location(&self.base_url, &id);

        let version = if self.service_provider.etag_supported && resource_type.features.etag {
            stored_version(&stored)
        } else {
            None
        };

        let created = stored
            .pointer("/meta/created")
            .and_then(Value::as_str)
            .map(str::to_string);
        let last_modified = stored
            .pointer("/meta/lastModified")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

        let mut meta = json!({
            "resourceType": resource_type.name,
            "lastModified": last_modified,
            "location": location,
        });
        if let Some(created) = created {
            meta["created"] = Value::String(created);
        }
        if let Some(version) = &version {
            meta["version"] = Value::String(version.to_etag());
        }
        stored["meta"] = meta;

        let document = validate_response(
            resource_type.schema_set(),
            &stored,
            projection,
            request_body,
        )?;
        Ok((document, version, location))
    }

    fn check_preconditions(
        &self,
        resource_type: &ResourceType,
        request: &ScimHttpRequest,
        version: Option<&ResourceVersion>,
        method: HttpMethod,
    ) -> ScimResult<()> {
        if !self.service_provider.etag_supported || !resource_type.features.etag {
            return Ok(());
        }

        if let Some(condition) = request.header("if-match") {
            // The resource exists by the time preconditions run, so `*`
            // always passes here.
            if condition.trim() != "*" {
                if let Some(current) = version {
                    let matched = condition
                        .split(',')
                        .filter_map(|tag| tag.trim().parse::<ResourceVersion>().ok())
                        .any(|tag| &tag == current);
                    if !matched {
                        return Err(ScimError::PreconditionFailed(format!(
                            "version '{}' does not match If-Match",
                            current.to_etag()
                        )));
                    }
                }
            }
        }

        if let Some(condition) = request.header("if-none-match") {
            let matched = condition.trim() == "*"
                || version
                    .map(|current| {
                        condition
                            .split(',')
                            .filter_map(|tag| tag.trim().parse::<ResourceVersion>().ok())
                            .any(|tag| &tag == current)
                    })
                    .unwrap_or(false);
            if matched {
                return match method {
                    HttpMethod::Get => Err(ScimError::NotModified),
                    _ => Err(ScimError::PreconditionFailed(
                        "If-None-Match matched the current version".into(),
                    )),
                };
            }
        }

        Ok(())
    }

    fn projection_from_query(&self, request: &ScimHttpRequest) -> ScimResult<AttributeProjection> {
        AttributeProjection::from_params(
            request.query_param("attributes"),
            request.query_param("excludedAttributes"),
        )
    }

    fn params_from_query(
        &self,
        resource_type: &ResourceType,
        request: &ScimHttpRequest,
    ) -> ScimResult<ListParams> {
        self.build_list_params(
            resource_type,
            request.query_param("startIndex"),
            request.query_param("count"),
            request.query_param("filter"),
            request.query_param("sortBy"),
            request.query_param("sortOrder"),
            self.projection_from_query(request)?,
        )
    }

    fn params_from_search_body(
        &self,
        resource_type: &ResourceType,
        request: &ScimHttpRequest,
    ) -> ScimResult<ListParams> {
        let body = request.json_body()?;
        let declares = body
            .get("schemas")
            .and_then(Value::as_array)
            .map(|urns| {
                urns.iter()
                    .filter_map(Value::as_str)
                    .any(|urn| urn.eq_ignore_ascii_case(SEARCH_REQUEST_URN))
            })
            .unwrap_or(false);
        if !declares {
            return Err(ScimError::InvalidSyntax(format!(
                "search body must declare '{}'",
                SEARCH_REQUEST_URN
            )));
        }

        let joined = |key: &str| -> Option<String> {
            body.get(key).and_then(Value::as_array).map(|paths| {
                paths
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            })
        };
        let projection = AttributeProjection::from_params(
            joined("attributes").as_deref(),
            joined("excludedAttributes").as_deref(),
        )?;

        let number_string = |key: &str| -> Option<String> {
            body.get(key).map(|v| match v {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        };

        self.build_list_params(
            resource_type,
            number_string("startIndex").as_deref(),
            number_string("count").as_deref(),
            body.get("filter").and_then(Value::as_str),
            body.get("sortBy").and_then(Value::as_str),
            body.get("sortOrder").and_then(Value::as_str),
            projection,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build_list_params(
        &self,
        resource_type: &ResourceType,
        start_index: Option<&str>,
        count: Option<&str>,
        filter: Option<&str>,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
        projection: AttributeProjection,
    ) -> ScimResult<ListParams> {
        let max_results = self.service_provider.filter.max_results;

        // startIndex below 1 clamps to 1; count clamps into [0, maxResults].
        let start_index = match start_index {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| ScimError::invalid_value("startIndex", "must be an integer"))?
                .max(1) as usize,
            None => 1,
        };
        let count = match count {
            Some(raw) => {
                let parsed = raw
                    .parse::<i64>()
                    .map_err(|_| ScimError::invalid_value("count", "must be an integer"))?;
                parsed.clamp(0, max_results as i64) as usize
            }
            None => max_results,
        };

        let filter = match filter {
            Some(expression) => {
                if !self.service_provider.filter.supported {
                    return Err(ScimError::Forbidden("filtering is not supported".into()));
                }
                Some(parse_filter(expression)?)
            }
            None => None,
        };

        let sort_by = match sort_by {
            Some(path) if self.service_provider.sort_supported => {
                let extension_urns: Vec<String> = resource_type
                    .extensions
                    .iter()
                    .map(|(urn, _)| urn.clone())
                    .collect();
                let resolved = self.schema_registry.resolve_attribute(
                    &resource_type.schema_urn,
                    &extension_urns,
                    path,
                )?;
                match resolved {
                    Some((schema, index)) => Some(schema.attribute(index).node_name.clone()),
                    None => {
                        return Err(ScimError::invalid_value(
                            "sortBy",
                            format!("unknown attribute '{}'", path),
                        ));
                    }
                }
            }
            // Sorting not supported: the parameter is ignored, per RFC.
            Some(_) => None,
            None => None,
        };

        let sort_order = match sort_order {
            Some(raw) => SortOrder::parse(raw)
                .ok_or_else(|| ScimError::invalid_value("sortOrder", "must be 'ascending' or 'descending'"))?,
            None => SortOrder::default(),
        };

        Ok(ListParams {
            start_index,
            count,
            filter,
            sort_by,
            sort_order,
            projection,
        })
    }
}

/// Extract the handler-supplied version from a stored resource.
fn stored_version(stored: &Value) -> Option<ResourceVersion> {
    stored
        .pointer("/meta/version")
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse().ok())
}
