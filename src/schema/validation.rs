//! Attribute-level document validation.
//!
//! The validator walks a JSON document against a resource type's schemas in
//! one of two directions. Inbound (`validate_request`) it coerces types,
//! lifts single values into arrays for multi-valued attributes, strips
//! attributes the client may not write and enforces required/canonical/
//! mutability rules. Outbound (`validate_response`) it applies the
//! `returned` policy and the `attributes`/`excludedAttributes` projection.
//!
//! Errors are collected per attribute path in a [`ValidationContext`]; the
//! dispatcher surfaces the first hard error.

use super::registry::{split_urn_prefix, SchemaRegistry};
use super::types::{
    AttrIndex, AttributeType, Mutability, ReferenceType, Returned, Schema, SchemaAttribute,
};
use crate::error::{ScimError, ScimResult};
use base64::Engine;
use chrono::{DateTime, FixedOffset};
use log::trace;
use serde_json::{Map, Value};
use std::sync::Arc;

/// HTTP method of the request being validated; mutability enforcement
/// differs between creation and modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Parse a method name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// The schemas a resource type validates against: its main schema, its
/// extensions (with the required flag) and the common attributes.
#[derive(Debug, Clone)]
pub struct SchemaSet {
    pub main: Arc<Schema>,
    pub extensions: Vec<(Arc<Schema>, bool)>,
    pub common: Arc<Schema>,
}

impl SchemaSet {
    /// Build a schema set by resolving URNs against the registry.
    pub fn resolve(
        registry: &SchemaRegistry,
        main_urn: &str,
        extensions: &[(String, bool)],
    ) -> Option<Self> {
        let main = registry.schema(main_urn)?.clone();
        let mut resolved = Vec::with_capacity(extensions.len());
        for (urn, required) in extensions {
            resolved.push((registry.schema(urn)?.clone(), *required));
        }
        Some(Self {
            main,
            extensions: resolved,
            common: registry.common_attributes().clone(),
        })
    }

    fn extension_by_urn(&self, key: &str) -> Option<&(Arc<Schema>, bool)> {
        self.extensions
            .iter()
            .find(|(schema, _)| schema.id.eq_ignore_ascii_case(key))
    }

    /// Find an attribute definition by dotted path, searching the main
    /// schema, the common attributes, then the extensions.
    pub fn find_attribute(&self, dotted_path: &str) -> Option<&SchemaAttribute> {
        if let Some(index) = self.main.find_attribute(dotted_path) {
            return Some(self.main.attribute(index));
        }
        if let Some(index) = self.common.find_attribute(dotted_path) {
            return Some(self.common.attribute(index));
        }
        self.extensions.iter().find_map(|(schema, _)| {
            schema
                .find_attribute(dotted_path)
                .map(|index| schema.attribute(index))
        })
    }
}

/// Attribute projection requested by the client.
///
/// Paths are normalized to lowercase dotted form with any URN prefix
/// stripped. `attributes` and `excludedAttributes` are mutually exclusive.
#[derive(Debug, Clone, Default)]
pub struct AttributeProjection {
    attributes: Vec<String>,
    excluded: Vec<String>,
}

impl AttributeProjection {
    /// Parse the two comma-separated query parameters.
    pub fn from_params(
        attributes: Option<&str>,
        excluded_attributes: Option<&str>,
    ) -> ScimResult<Self> {
        if attributes.is_some() && excluded_attributes.is_some() {
            return Err(ScimError::InvalidSyntax(
                "'attributes' and 'excludedAttributes' are mutually exclusive".into(),
            ));
        }
        Ok(Self {
            attributes: split_paths(attributes),
            excluded: split_paths(excluded_attributes),
        })
    }

    /// Projection that keeps everything with `returned=default`.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.excluded.is_empty()
    }

    /// The normalized `attributes` paths, for handlers that want them.
    pub fn attribute_paths(&self) -> &[String] {
        &self.attributes
    }

    /// The normalized `excludedAttributes` paths.
    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded
    }

    /// Decide whether a `returned=default` attribute at `path` survives.
    fn keeps_default(&self, path: &str) -> bool {
        if !self.attributes.is_empty() {
            return self.attributes.iter().any(|listed| related(listed, path));
        }
        if !self.excluded.is_empty() {
            return !self
                .excluded
                .iter()
                .any(|listed| listed == path || is_ancestor(listed, path));
        }
        true
    }

    /// Decide whether a `returned=request` attribute was explicitly asked for.
    fn requests(&self, path: &str) -> bool {
        self.attributes.iter().any(|listed| related(listed, path))
    }
}

fn split_paths(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|path| match split_urn_prefix(path) {
                Some((_, attr)) => attr.to_lowercase(),
                None => path.to_lowercase(),
            })
            .collect()
    })
    .unwrap_or_default()
}

/// `listed` keeps `path` when they are equal or one contains the other.
fn related(listed: &str, path: &str) -> bool {
    listed == path || is_ancestor(listed, path) || is_ancestor(path, listed)
}

fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'.'
}

/// Accumulates validation failures keyed by the attribute path they occurred
/// at. Request validators registered by handlers push into the same context.
#[derive(Debug, Default)]
pub struct ValidationContext {
    errors: Vec<ScimError>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure.
    pub fn push(&mut self, error: ScimError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ScimError] {
        &self.errors
    }

    /// Consume the context, returning the first recorded error.
    pub fn into_first_error(self) -> Option<ScimError> {
        self.errors.into_iter().next()
    }

    /// Return `Ok(value)` if clean, otherwise the first recorded error.
    pub fn finish<T>(self, value: T) -> ScimResult<T> {
        match self.into_first_error() {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }
}

/// Direction-specific policy applied while walking the attribute tree.
#[derive(Clone, Copy)]
enum Direction<'a> {
    Request {
        method: HttpMethod,
        stored: Option<&'a Value>,
    },
    Response {
        projection: &'a AttributeProjection,
        request_body: Option<&'a Value>,
    },
    /// Structural check only: types, cardinality, canonical values and
    /// required. Used to validate documents against the meta-schema.
    Structure,
}

impl Direction<'_> {
    /// Whether the attribute at `path` participates at all, before looking
    /// at its value. `Drop` removes silently, `Keep` proceeds.
    fn admits(&self, attr: &SchemaAttribute, path: &str) -> bool {
        match self {
            Direction::Request { .. } => attr.mutability != Mutability::ReadOnly,
            Direction::Response {
                projection,
                request_body,
            } => {
                let lower = path.to_lowercase();
                match attr.returned {
                    Returned::Never => false,
                    Returned::Always => true,
                    Returned::Default => projection.keeps_default(&lower),
                    Returned::Request => {
                        projection.requests(&lower)
                            || request_body
                                .map(|body| lookup_path(body, path).is_some())
                                .unwrap_or(false)
                    }
                }
            }
            Direction::Structure => true,
        }
    }

    /// Whether a missing value for a required attribute is an error, and
    /// which error to report.
    fn missing_required_error(&self, attr: &SchemaAttribute, path: &str) -> Option<ScimError> {
        if !attr.required {
            return None;
        }
        match self {
            // Required is evaluated after mutability stripping: a readOnly
            // required attribute is not required from the client.
            Direction::Request { .. } => Some(ScimError::invalid_value(
                path.to_string(),
                "required attribute is missing",
            )),
            // The handler must produce every required attribute that the
            // returned policy admits; its absence is a server fault.
            Direction::Response { .. } => Some(ScimError::internal(format!(
                "handler omitted required attribute '{}'",
                path
            ))),
            Direction::Structure => Some(ScimError::invalid_value(
                path.to_string(),
                "required attribute is missing",
            )),
        }
    }

    fn lifts_single_values(&self) -> bool {
        matches!(self, Direction::Request { .. })
    }
}

/// Validate an inbound resource document.
///
/// Returns the coerced document with client-unwritable attributes stripped.
/// `stored` is the currently persisted resource, consulted for `immutable`
/// enforcement on PUT and PATCH.
pub fn validate_request(
    set: &SchemaSet,
    document: &Value,
    method: HttpMethod,
    stored: Option<&Value>,
) -> ScimResult<Value> {
    let mut ctx = ValidationContext::new();
    let direction = Direction::Request { method, stored };
    let result = validate_document(set, document, direction, &mut ctx);
    ctx.finish(result)
}

/// Validate an outbound resource document.
///
/// Applies the `returned` policy and the client's projection. `request_body`
/// is the client-supplied document of the triggering write, consulted for
/// `returned=request` attributes.
pub fn validate_response(
    set: &SchemaSet,
    document: &Value,
    projection: &AttributeProjection,
    request_body: Option<&Value>,
) -> ScimResult<Value> {
    let mut ctx = ValidationContext::new();
    let direction = Direction::Response {
        projection,
        request_body,
    };
    let result = validate_document(set, document, direction, &mut ctx);
    ctx.finish(result)
}

/// Structural validation of a document against a single schema, without
/// direction policies. The registry uses this for meta-schema checks.
pub fn check_document_structure(schema: &Schema, document: &Value, ctx: &mut ValidationContext) {
    let Some(obj) = document.as_object() else {
        ctx.push(ScimError::InvalidSyntax(
            "document must be a JSON object".into(),
        ));
        return;
    };
    let mut output = Map::new();
    walk_attributes(
        schema,
        schema.root_attributes(),
        obj,
        "",
        Direction::Structure,
        ctx,
        &mut output,
    );
}

fn validate_document(
    set: &SchemaSet,
    document: &Value,
    direction: Direction<'_>,
    ctx: &mut ValidationContext,
) -> Value {
    let Some(obj) = document.as_object() else {
        ctx.push(ScimError::InvalidSyntax(
            "resource must be a JSON object".into(),
        ));
        return Value::Null;
    };

    let declared = declared_schemas(obj);
    let mut output = Map::new();

    // Top-level key audit: anything that is neither a known attribute, a
    // common attribute, "schemas", nor a registered schema URN is a syntax
    // error; an extension object must also be declared in "schemas".
    for key in obj.keys() {
        if key == "schemas"
            || set.main.find_attribute(key).is_some()
            || set.common.find_attribute(key).is_some()
        {
            continue;
        }
        if key.to_lowercase().starts_with("urn:") {
            if set.extension_by_urn(key).is_some() || set.main.id.eq_ignore_ascii_case(key) {
                if !declared.iter().any(|urn| urn.eq_ignore_ascii_case(key)) {
                    ctx.push(ScimError::InvalidSyntax(format!(
                        "extension '{}' is present but not declared in 'schemas'",
                        key
                    )));
                }
                continue;
            }
            ctx.push(ScimError::InvalidSyntax(format!(
                "'{}' is not a registered schema of this resource type",
                key
            )));
            continue;
        }
        ctx.push(ScimError::InvalidSyntax(format!(
            "unknown attribute '{}'",
            key
        )));
    }

    if let Direction::Request { .. } = direction {
        if !declared
            .iter()
            .any(|urn| urn.eq_ignore_ascii_case(&set.main.id))
        {
            ctx.push(ScimError::InvalidSyntax(format!(
                "'schemas' must declare '{}'",
                set.main.id
            )));
        }
        for urn in &declared {
            if !known_urn(set, urn) {
                ctx.push(ScimError::InvalidSyntax(format!(
                    "unknown schema URN '{}' in 'schemas'",
                    urn
                )));
            }
        }
    }
    if !declared.is_empty() {
        output.insert(
            "schemas".into(),
            Value::Array(declared.iter().map(|s| Value::String(s.clone())).collect()),
        );
    }

    // Common attributes, main schema, then extensions.
    walk_attributes(
        &set.common,
        set.common.root_attributes(),
        obj,
        "",
        direction,
        ctx,
        &mut output,
    );
    walk_attributes(
        &set.main,
        set.main.root_attributes(),
        obj,
        "",
        direction,
        ctx,
        &mut output,
    );

    for (extension, required) in &set.extensions {
        let key = obj
            .keys()
            .find(|k| extension.id.eq_ignore_ascii_case(k))
            .cloned();
        let ext_value = key.as_ref().and_then(|k| obj.get(k));
        let ext_obj = ext_value.and_then(Value::as_object);

        let missing = ext_obj.map(|o| o.is_empty()).unwrap_or(true);
        if missing {
            if *required && matches!(direction, Direction::Request { .. }) {
                ctx.push(ScimError::InvalidSyntax(format!(
                    "required extension '{}' is missing or empty",
                    extension.id
                )));
            }
            if ext_value.map(|v| !v.is_object() && !v.is_null()).unwrap_or(false) {
                ctx.push(ScimError::invalid_value(
                    extension.id.clone(),
                    "extension value must be an object",
                ));
            }
            continue;
        }
        let ext_obj = ext_obj.unwrap();

        let mut ext_output = Map::new();
        walk_attributes(
            extension,
            extension.root_attributes(),
            ext_obj,
            "",
            direction,
            ctx,
            &mut ext_output,
        );
        if !ext_output.is_empty() {
            output.insert(extension.id.clone(), Value::Object(ext_output));
        }
    }

    Value::Object(output)
}

fn declared_schemas(obj: &Map<String, Value>) -> Vec<String> {
    obj.get("schemas")
        .and_then(Value::as_array)
        .map(|urns| {
            urns.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn known_urn(set: &SchemaSet, urn: &str) -> bool {
    set.main.id.eq_ignore_ascii_case(urn)
        || set
            .extensions
            .iter()
            .any(|(schema, _)| schema.id.eq_ignore_ascii_case(urn))
}

fn walk_attributes(
    schema: &Schema,
    indices: &[AttrIndex],
    obj: &Map<String, Value>,
    path_prefix: &str,
    direction: Direction<'_>,
    ctx: &mut ValidationContext,
    output: &mut Map<String, Value>,
) {
    for &index in indices {
        let attr = schema.attribute(index);
        let path = if path_prefix.is_empty() {
            attr.node_name.clone()
        } else {
            format!("{}.{}", path_prefix, attr.name)
        };

        if !direction.admits(attr, &path) {
            continue;
        }

        let value = obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&attr.name))
            .map(|(_, v)| v);

        let present = value.map(|v| !v.is_null()).unwrap_or(false);
        if !present {
            if let Some(error) = direction.missing_required_error(attr, &path) {
                ctx.push(error);
            }
            continue;
        }
        let value = value.unwrap();

        let Some(coerced) = coerce_attribute(schema, index, value, &path, direction, ctx) else {
            continue;
        };

        if let Direction::Request { method, stored } = direction {
            if attr.mutability == Mutability::Immutable
                && matches!(method, HttpMethod::Put | HttpMethod::Patch)
            {
                if let Some(stored_value) = stored.and_then(|s| lookup_path(s, &path)) {
                    if !stored_value.is_null() && stored_value != &coerced {
                        ctx.push(ScimError::mutability(
                            path.clone(),
                            "immutable attribute does not match its stored value",
                        ));
                        continue;
                    }
                }
            }
        }

        output.insert(attr.name.clone(), coerced);
    }
}

/// Type and cardinality coercion shared by all directions.
fn coerce_attribute(
    schema: &Schema,
    index: AttrIndex,
    value: &Value,
    path: &str,
    direction: Direction<'_>,
    ctx: &mut ValidationContext,
) -> Option<Value> {
    let attr = schema.attribute(index);
    trace!("validating attribute '{}'", path);

    if attr.multi_valued {
        let elements: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            single if direction.lifts_single_values() => vec![single],
            _ => {
                ctx.push(ScimError::invalid_value(
                    path.to_string(),
                    "multi-valued attribute requires an array",
                ));
                return None;
            }
        };
        let mut coerced = Vec::with_capacity(elements.len());
        for element in elements {
            if element.is_null() {
                continue;
            }
            if let Some(item) = coerce_single(schema, index, element, path, direction, ctx) {
                coerced.push(item);
            }
        }
        return Some(Value::Array(coerced));
    }

    if value.is_array() {
        ctx.push(ScimError::invalid_value(
            path.to_string(),
            "single-valued attribute must not be an array",
        ));
        return None;
    }
    coerce_single(schema, index, value, path, direction, ctx)
}

fn coerce_single(
    schema: &Schema,
    index: AttrIndex,
    value: &Value,
    path: &str,
    direction: Direction<'_>,
    ctx: &mut ValidationContext,
) -> Option<Value> {
    let attr = schema.attribute(index);
    if attr.attr_type != AttributeType::Complex {
        return coerce_simple(attr, value, path, ctx);
    }

    let Some(obj) = value.as_object() else {
        ctx.push(ScimError::invalid_value(
            path.to_string(),
            "complex attribute requires an object",
        ));
        return None;
    };

    // Unknown nested keys are invalid values, unlike top-level keys.
    for key in obj.keys() {
        let known = schema
            .sub_attributes(index)
            .any(|sub| sub.name.eq_ignore_ascii_case(key));
        if !known {
            ctx.push(ScimError::invalid_value(
                format!("{}.{}", path, key),
                "unknown sub-attribute",
            ));
        }
    }

    let mut output = Map::new();
    walk_attributes(
        schema,
        &schema.attribute(index).sub_attributes.clone(),
        obj,
        path,
        direction,
        ctx,
        &mut output,
    );
    Some(Value::Object(output))
}

fn coerce_simple(
    attr: &SchemaAttribute,
    value: &Value,
    path: &str,
    ctx: &mut ValidationContext,
) -> Option<Value> {
    if value.is_array() || value.is_object() {
        ctx.push(ScimError::invalid_value(
            path.to_string(),
            format!("expected a {} value", attr.attr_type),
        ));
        return None;
    }

    if !check_canonical_values(attr, value, path, ctx) {
        return None;
    }

    match attr.attr_type {
        AttributeType::String => match value.as_str() {
            Some(_) => Some(value.clone()),
            None => {
                type_mismatch(attr, value, path, ctx);
                None
            }
        },
        AttributeType::Boolean => match value.as_bool() {
            Some(_) => Some(value.clone()),
            None => {
                type_mismatch(attr, value, path, ctx);
                None
            }
        },
        AttributeType::Integer => match integer_value(value) {
            Some(n) => Some(Value::from(n)),
            None => {
                ctx.push(ScimError::invalid_value(
                    path.to_string(),
                    format!("'{}' is not an integer", value),
                ));
                None
            }
        },
        AttributeType::Decimal => match value.as_f64() {
            Some(_) => Some(value.clone()),
            None => {
                type_mismatch(attr, value, path, ctx);
                None
            }
        },
        AttributeType::DateTime => {
            let Some(text) = value.as_str() else {
                type_mismatch(attr, value, path, ctx);
                return None;
            };
            if DateTime::<FixedOffset>::parse_from_rfc3339(text).is_err() {
                ctx.push(ScimError::invalid_value(
                    path.to_string(),
                    format!("'{}' is not a valid dateTime", text),
                ));
                return None;
            }
            Some(value.clone())
        }
        AttributeType::Binary => {
            let Some(text) = value.as_str() else {
                type_mismatch(attr, value, path, ctx);
                return None;
            };
            if base64::engine::general_purpose::STANDARD
                .decode(text)
                .is_err()
            {
                ctx.push(ScimError::invalid_value(
                    path.to_string(),
                    "value is not valid base64 data",
                ));
                return None;
            }
            Some(value.clone())
        }
        AttributeType::Reference => {
            let Some(text) = value.as_str() else {
                type_mismatch(attr, value, path, ctx);
                return None;
            };
            if !check_reference_types(attr, text) {
                ctx.push(ScimError::invalid_value(
                    path.to_string(),
                    format!(
                        "'{}' does not satisfy any of the declared reference types",
                        text
                    ),
                ));
                return None;
            }
            Some(value.clone())
        }
        AttributeType::Complex => unreachable!("complex handled by coerce_single"),
    }
}

fn integer_value(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    // Accept integer-valued floats such as 5.0; reject fractions.
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn type_mismatch(attr: &SchemaAttribute, value: &Value, path: &str, ctx: &mut ValidationContext) {
    ctx.push(ScimError::invalid_value(
        path.to_string(),
        format!("value '{}' is not of type '{}'", value, attr.attr_type),
    ));
}

/// Canonical value enforcement.
///
/// Case-insensitive comparison unless the attribute is `caseExact`. A
/// case-exact attribute whose value matches only case-insensitively gets a
/// distinct diagnostic pointing at the casing.
fn check_canonical_values(
    attr: &SchemaAttribute,
    value: &Value,
    path: &str,
    ctx: &mut ValidationContext,
) -> bool {
    if attr.canonical_values.is_empty() {
        return true;
    }
    let Some(text) = value.as_str() else {
        return true;
    };

    if attr.case_exact {
        if attr.canonical_values.iter().any(|c| c == text) {
            return true;
        }
        if attr
            .canonical_values
            .iter()
            .any(|c| c.eq_ignore_ascii_case(text))
        {
            ctx.push(ScimError::invalid_value(
                path.to_string(),
                format!(
                    "'{}' matches a canonical value only case-insensitively, but the attribute is caseExact",
                    text
                ),
            ));
            return false;
        }
    } else if attr
        .canonical_values
        .iter()
        .any(|c| c.eq_ignore_ascii_case(text))
    {
        return true;
    }

    ctx.push(ScimError::invalid_value(
        path.to_string(),
        format!(
            "'{}' is not one of the canonical values {:?}",
            text, attr.canonical_values
        ),
    ));
    false
}

/// A reference value is accepted if it satisfies any declared reference
/// type. `external` and resource-type names match unconditionally; `uri`
/// and `url` demand a parsable identifier. An empty declaration accepts
/// anything.
fn check_reference_types(attr: &SchemaAttribute, value: &str) -> bool {
    if attr.reference_types.is_empty() {
        return true;
    }
    attr.reference_types.iter().any(|kind| match kind {
        ReferenceType::External | ReferenceType::Resource(_) => true,
        ReferenceType::Uri => is_uri(value),
        ReferenceType::Url => is_url(value),
    })
}

fn is_uri(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_whitespace)
}

fn is_url(value: &str) -> bool {
    is_uri(value) && value.contains("://")
}

/// Navigate a document by a dotted path, case-insensitively. Returns the
/// first match; does not descend into arrays.
fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        let obj = current.as_object()?;
        current = obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(segment))
            .map(|(_, v)| v)?;
    }
    Some(current)
}
