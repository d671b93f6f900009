//! The resource handler seam.
//!
//! A [`ResourceHandler`] implements persistence for one resource type. The
//! engine guarantees that the document passed to a write operation has been
//! fully validated, and validates whatever the handler returns before it
//! leaves the server. Handlers may be called concurrently; the engine does
//! no per-id locking.

use super::context::Context;
use crate::error::ScimResult;
use crate::filter::FilterExpr;
use crate::schema::validation::{AttributeProjection, ValidationContext};
use async_trait::async_trait;
use serde_json::Value;

/// Sort direction for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Parse the `sortOrder` query parameter, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ascending" => Some(Self::Ascending),
            "descending" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// Paging, filtering and sorting parameters for a list call.
///
/// `start_index` is always ≥ 1 and `count` is already clamped to the
/// service provider's `filter.maxResults` by the time a handler sees it.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub start_index: usize,
    pub count: usize,
    pub filter: Option<FilterExpr>,
    /// Dotted path of the sort attribute, already resolved against the
    /// resource type's schemas.
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub projection: AttributeProjection,
}

/// A handler's paged result: the slice of resources for the requested page
/// plus the total number of matches.
#[derive(Debug, Clone)]
pub struct PartialListResponse {
    pub resources: Vec<Value>,
    pub total_results: usize,
}

impl PartialListResponse {
    pub fn new(resources: Vec<Value>, total_results: usize) -> Self {
        Self {
            resources,
            total_results,
        }
    }

    pub fn empty() -> Self {
        Self {
            resources: Vec::new(),
            total_results: 0,
        }
    }
}

/// Persistence operations for one resource type.
///
/// Implementations raise [`crate::error::ScimError`] to control the HTTP
/// response; any other failure should be mapped before returning.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Store a new resource and return it with its server-assigned id and
    /// any handler-owned metadata (`meta.created`, `meta.version`).
    async fn create(&self, resource: Value, context: &Context) -> ScimResult<Value>;

    /// Fetch a resource by id. The projection is advisory: handlers may use
    /// it to skip expensive joins, the engine projects the response either
    /// way.
    async fn get(
        &self,
        id: &str,
        projection: &AttributeProjection,
        context: &Context,
    ) -> ScimResult<Value>;

    /// Query resources. Handlers may ignore `filter` and `sort_by`; the
    /// engine falls back to in-memory evaluation when the resource type
    /// enables it.
    async fn list(&self, request: &ListRequest, context: &Context)
        -> ScimResult<PartialListResponse>;

    /// Replace the resource with the given id. The engine has already
    /// verified existence and merged immutability rules; the handler simply
    /// overwrites and returns the stored result.
    async fn update(&self, id: &str, resource: Value, context: &Context) -> ScimResult<Value>;

    /// Permanently delete the resource with the given id.
    async fn delete(&self, id: &str, context: &Context) -> ScimResult<()>;

    /// Optional contextual validator, executed after schema validation and
    /// before the handler call.
    fn request_validator(&self) -> Option<&dyn RequestValidator> {
        None
    }

    /// Called once when the resource type is registered.
    fn post_construct(&self, _resource_type: &super::resource_type::ResourceType) {}
}

/// Contextual request validation beyond what the schemas express, e.g.
/// cross-attribute constraints.
#[async_trait]
pub trait RequestValidator: Send + Sync {
    /// Validate a document about to be created.
    async fn validate_create(
        &self,
        resource: &Value,
        errors: &mut ValidationContext,
        context: &Context,
    );

    /// Validate a replacement document against the currently stored one.
    async fn validate_update(
        &self,
        stored: &Value,
        resource: &Value,
        errors: &mut ValidationContext,
        context: &Context,
    );
}
