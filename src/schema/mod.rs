//! Schema definitions, registry and attribute validation.
//!
//! The schema subsystem owns the runtime-typed attribute trees that every
//! document passing through the engine is validated against. Schemas are
//! parsed once at registration, stored immutably in the [`SchemaRegistry`],
//! and consulted by the validator, the filter evaluator and the dispatcher.

pub mod embedded;
pub mod registry;
pub mod types;
pub mod validation;

pub use registry::SchemaRegistry;
pub use types::{
    AttrIndex, AttributeType, Mutability, ReferenceType, Returned, Schema, SchemaAttribute,
    Uniqueness,
};
pub use validation::{AttributeProjection, HttpMethod, ValidationContext};
