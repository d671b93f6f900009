//! SCIM 2.0 protocol engine (RFC 7643 / RFC 7644).
//!
//! A transport-agnostic implementation of the server side of SCIM:
//! schema-driven attribute validation, filter and PATCH path evaluation,
//! endpoint dispatch with pagination, sorting and ETag concurrency, and
//! bulk request orchestration. Persistence, authentication and the HTTP
//! server itself stay outside; the engine consumes a request struct and
//! returns a response struct.
//!
//! # Core Components
//!
//! - [`ScimEngine`] - the dispatcher built through [`ScimEngineBuilder`]
//! - [`ResourceHandler`] - trait persistence implementations provide
//! - [`SchemaRegistry`] - runtime-typed schema definitions and lookup
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scim_engine::{ScimEngineBuilder, ScimHttpRequest};
//! # use scim_engine::resource::ResourceHandler;
//! # use std::sync::Arc;
//!
//! # async fn example(handler: Arc<dyn ResourceHandler>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = ScimEngineBuilder::new("https://example.com/scim/v2")?;
//! builder.register_resource_type(
//!     &serde_json::json!({
//!         "name": "User",
//!         "endpoint": "/Users",
//!         "schema": "urn:ietf:params:scim:schemas:core:2.0:User",
//!     }),
//!     handler,
//! )?;
//! let engine = builder.build();
//!
//! let response = engine
//!     .handle(ScimHttpRequest::new("GET", "/Users").with_query("filter", "userName sw \"b\""))
//!     .await;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod filter;
pub mod patch;
pub mod resource;
pub mod schema;
pub mod service_provider;

// Re-export the types most integrations touch.
pub use endpoints::{ScimEngine, ScimEngineBuilder, ScimHttpRequest, ScimHttpResponse};
pub use error::{ErrorResponse, RegistrationError, ScimError, ScimResult};
pub use filter::{parse_filter, parse_patch_path, FilterEvaluator, FilterExpr, PatchPath};
pub use patch::{apply_patch, PatchRequest};
pub use resource::{
    Context, ListRequest, PartialListResponse, RequestValidator, ResourceHandler, ResourceType,
    ResourceTypeFeatures, ResourceVersion, SortOrder,
};
pub use schema::{AttributeProjection, HttpMethod, Schema, SchemaRegistry};
pub use service_provider::ServiceProviderConfig;
