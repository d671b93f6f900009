//! Resource types, handler traits and request context.
//!
//! This module holds the seams between the protocol engine and user code:
//! the [`ResourceHandler`] trait that persistence implementations provide,
//! the [`ResourceType`] descriptor binding an endpoint to its schemas and
//! handler, and the per-request [`Context`] handed to every handler call.

pub mod context;
pub mod handler;
pub mod resource_type;
pub mod version;

pub use context::Context;
pub use handler::{
    ListRequest, PartialListResponse, RequestValidator, ResourceHandler, SortOrder,
};
pub use resource_type::{ResourceType, ResourceTypeFeatures, ResourceTypeRegistry};
pub use version::ResourceVersion;
