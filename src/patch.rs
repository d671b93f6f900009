//! PATCH operation application (RFC 7644 §3.5.2).
//!
//! Operations apply strictly in declared order against a working copy of
//! the stored resource; the first failure aborts the whole patch so no
//! partial effect is ever persisted. The patched document is then
//! revalidated as a full resource under the PUT ruleset.

use crate::error::{ScimError, ScimResult};
use crate::filter::evaluator::FilterEvaluator;
use crate::filter::path::{parse_patch_path, PatchPath};
use crate::schema::types::SchemaAttribute;
use crate::schema::validation::{validate_request, HttpMethod, SchemaSet};
use log::debug;
use serde_json::{Map, Value};

/// Schema URN of the PatchOp message body.
pub const PATCH_OP_URN: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// The three PATCH operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

impl PatchOpKind {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "add" => Some(Self::Add),
            "replace" => Some(Self::Replace),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// One operation of a PatchOp message.
#[derive(Debug, Clone)]
pub struct PatchOperation {
    pub kind: PatchOpKind,
    pub path: Option<PatchPath>,
    pub value: Option<Value>,
}

/// A parsed PatchOp message.
#[derive(Debug, Clone)]
pub struct PatchRequest {
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    /// Parse and structurally validate a PatchOp body.
    pub fn from_json(body: &Value) -> ScimResult<Self> {
        let obj = body
            .as_object()
            .ok_or_else(|| ScimError::InvalidSyntax("PATCH body must be a JSON object".into()))?;

        let declares_patch_op = obj
            .get("schemas")
            .and_then(Value::as_array)
            .map(|urns| {
                urns.iter()
                    .filter_map(Value::as_str)
                    .any(|urn| urn.eq_ignore_ascii_case(PATCH_OP_URN))
            })
            .unwrap_or(false);
        if !declares_patch_op {
            return Err(ScimError::InvalidSyntax(format!(
                "PATCH body must declare schema '{}'",
                PATCH_OP_URN
            )));
        }

        let raw_operations = obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("operations"))
            .and_then(|(_, v)| v.as_array())
            .ok_or_else(|| ScimError::InvalidSyntax("missing 'Operations' array".into()))?;
        if raw_operations.is_empty() {
            return Err(ScimError::InvalidSyntax(
                "'Operations' must contain at least one operation".into(),
            ));
        }

        let mut operations = Vec::with_capacity(raw_operations.len());
        for raw in raw_operations {
            operations.push(Self::parse_operation(raw)?);
        }
        Ok(Self { operations })
    }

    fn parse_operation(raw: &Value) -> ScimResult<PatchOperation> {
        let obj = raw
            .as_object()
            .ok_or_else(|| ScimError::InvalidSyntax("each operation must be an object".into()))?;

        let op_word = obj
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| ScimError::InvalidSyntax("operation is missing 'op'".into()))?;
        let kind = PatchOpKind::parse(op_word).ok_or_else(|| {
            ScimError::invalid_value("op", format!("unknown operation '{}'", op_word))
        })?;

        let path = match obj.get("path") {
            Some(Value::String(path)) => Some(parse_patch_path(path)?),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(ScimError::InvalidPath("'path' must be a string".into()));
            }
        };

        let value = obj.get("value").filter(|v| !v.is_null()).cloned();

        match kind {
            PatchOpKind::Add | PatchOpKind::Replace => {
                if value.is_none() {
                    return Err(ScimError::invalid_value(
                        "value",
                        format!("'{}' requires a value", op_word),
                    ));
                }
            }
            PatchOpKind::Remove => {
                if path.is_none() {
                    return Err(ScimError::NoTarget(
                        "'remove' requires a 'path'".into(),
                    ));
                }
            }
        }

        Ok(PatchOperation { kind, path, value })
    }
}

/// Apply a patch to a stored resource and revalidate the result.
///
/// Returns the patched document after request validation under the PUT
/// ruleset, with server-owned attributes stripped. The stored value is
/// never modified.
pub fn apply_patch(set: &SchemaSet, stored: &Value, request: &PatchRequest) -> ScimResult<Value> {
    let mut working = stored.clone();
    for (index, operation) in request.operations.iter().enumerate() {
        debug!(
            "applying patch operation {} ({:?} {})",
            index + 1,
            operation.kind,
            operation
                .path
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "<no path>".into())
        );
        apply_operation(set, &mut working, operation)?;
    }
    validate_request(set, &working, HttpMethod::Put, Some(stored))
}

fn apply_operation(
    set: &SchemaSet,
    resource: &mut Value,
    operation: &PatchOperation,
) -> ScimResult<()> {
    let value = || {
        operation
            .value
            .as_ref()
            .ok_or_else(|| ScimError::invalid_value("value", "the operation requires a value"))
    };
    match (&operation.kind, &operation.path) {
        (PatchOpKind::Add, None) => merge_document(resource, value()?, false),
        (PatchOpKind::Replace, None) => merge_document(resource, value()?, true),
        (PatchOpKind::Add, Some(path)) => {
            apply_to_path(set, resource, path, Some(value()?), PatchOpKind::Add)
        }
        (PatchOpKind::Replace, Some(path)) => {
            apply_to_path(set, resource, path, Some(value()?), PatchOpKind::Replace)
        }
        (PatchOpKind::Remove, Some(path)) => {
            apply_to_path(set, resource, path, None, PatchOpKind::Remove)
        }
        (PatchOpKind::Remove, None) => {
            Err(ScimError::NoTarget("'remove' requires a 'path'".into()))
        }
    }
}

/// Merge `value` into the resource root: scalars and complex values
/// overwrite, multi-valued arrays append (`add`) or are replaced wholesale
/// (`replace`).
fn merge_document(resource: &mut Value, value: &Value, replace_arrays: bool) -> ScimResult<()> {
    let Some(additions) = value.as_object() else {
        return Err(ScimError::invalid_value(
            "value",
            "a patch without a path requires an object value",
        ));
    };
    let Some(target) = resource.as_object_mut() else {
        return Err(ScimError::internal("stored resource is not an object"));
    };

    for (key, addition) in additions {
        if key.eq_ignore_ascii_case("schemas") {
            continue;
        }
        let existing_key = target
            .keys()
            .find(|k| k.eq_ignore_ascii_case(key))
            .cloned()
            .unwrap_or_else(|| key.clone());

        match (target.get_mut(&existing_key), addition) {
            (Some(Value::Array(current)), Value::Array(items)) if !replace_arrays => {
                current.extend(items.iter().cloned());
            }
            // Extension objects merge one level deep rather than clobbering
            // attributes the patch did not mention.
            (Some(Value::Object(current)), Value::Object(items))
                if key.to_lowercase().starts_with("urn:") =>
            {
                for (sub_key, sub_value) in items {
                    current.insert(sub_key.clone(), sub_value.clone());
                }
            }
            _ => {
                target.insert(existing_key, addition.clone());
            }
        }
    }
    Ok(())
}

/// Resolve the container object and attribute definition for a path.
///
/// Unprefixed paths live at the top level when the main or common schema
/// defines them; attributes defined only by an extension live under the
/// extension's URN key.
fn locate<'a>(
    set: &'a SchemaSet,
    path: &PatchPath,
) -> ScimResult<(Option<String>, &'a SchemaAttribute)> {
    let dotted = path.dotted();

    if let Some(urn) = &path.attr.urn {
        if set.main.id.eq_ignore_ascii_case(urn) {
            let index = set
                .main
                .find_attribute(&dotted)
                .ok_or_else(|| ScimError::InvalidPath(format!("unknown attribute '{}'", path)))?;
            return Ok((None, set.main.attribute(index)));
        }
        for (schema, _) in &set.extensions {
            if schema.id.eq_ignore_ascii_case(urn) {
                let index = schema.find_attribute(&dotted).ok_or_else(|| {
                    ScimError::InvalidPath(format!("unknown attribute '{}'", path))
                })?;
                return Ok((Some(schema.id.clone()), schema.attribute(index)));
            }
        }
        return Err(ScimError::InvalidPath(format!(
            "'{}' is not a schema of this resource type",
            urn
        )));
    }

    if let Some(index) = set.main.find_attribute(&dotted) {
        return Ok((None, set.main.attribute(index)));
    }
    if let Some(index) = set.common.find_attribute(&dotted) {
        return Ok((None, set.common.attribute(index)));
    }
    for (schema, _) in &set.extensions {
        if let Some(index) = schema.find_attribute(&dotted) {
            return Ok((Some(schema.id.clone()), schema.attribute(index)));
        }
    }
    Err(ScimError::InvalidPath(format!(
        "unknown attribute '{}'",
        path
    )))
}

fn apply_to_path(
    set: &SchemaSet,
    resource: &mut Value,
    path: &PatchPath,
    value: Option<&Value>,
    kind: PatchOpKind,
) -> ScimResult<()> {
    let (container_urn, attr) = locate(set, path)?;

    let container = match &container_urn {
        Some(urn) => {
            let root = resource
                .as_object_mut()
                .ok_or_else(|| ScimError::internal("stored resource is not an object"))?;
            let key = root
                .keys()
                .find(|k| k.eq_ignore_ascii_case(urn))
                .cloned()
                .unwrap_or_else(|| urn.clone());
            root.entry(key).or_insert_with(|| Value::Object(Map::new()))
        }
        None => resource,
    };

    match &path.value_filter {
        Some(filter) => apply_filtered(set, container, path, filter, attr, value, kind),
        None => apply_unfiltered(container, path, attr, value, kind),
    }
}

fn apply_unfiltered(
    container: &mut Value,
    path: &PatchPath,
    attr: &SchemaAttribute,
    value: Option<&Value>,
    kind: PatchOpKind,
) -> ScimResult<()> {
    let obj = container
        .as_object_mut()
        .ok_or_else(|| ScimError::internal("patch container is not an object"))?;
    let attr_key = obj
        .keys()
        .find(|k| k.eq_ignore_ascii_case(&path.attr.attr))
        .cloned()
        .unwrap_or_else(|| path.attr.attr.clone());

    match &path.sub_attr {
        None => match kind {
            PatchOpKind::Remove => {
                if obj.remove(&attr_key).is_none() {
                    return Err(ScimError::NoTarget(format!(
                        "attribute '{}' has no value to remove",
                        path
                    )));
                }
                Ok(())
            }
            PatchOpKind::Add if attr.multi_valued => {
                let value = value.unwrap();
                let entry = obj.entry(attr_key).or_insert_with(|| Value::Array(Vec::new()));
                let Value::Array(elements) = entry else {
                    *entry = Value::Array(vec![entry.take()]);
                    return append_to(entry, value);
                };
                append_elements(elements, value);
                Ok(())
            }
            PatchOpKind::Add | PatchOpKind::Replace => {
                obj.insert(attr_key, value.unwrap().clone());
                Ok(())
            }
        },
        Some(sub) => {
            // Without a filter, a sub-attribute path addresses the single
            // complex value, or every element of a multi-valued one.
            let target = obj.entry(attr_key).or_insert_with(|| {
                if attr.multi_valued {
                    Value::Array(Vec::new())
                } else {
                    Value::Object(Map::new())
                }
            });
            match target {
                Value::Object(_) => set_or_remove_sub(target, sub, value, kind, path),
                Value::Array(elements) => {
                    if elements.is_empty() && kind == PatchOpKind::Remove {
                        return Err(ScimError::NoTarget(format!(
                            "path '{}' matched no values",
                            path
                        )));
                    }
                    for element in elements.iter_mut() {
                        set_or_remove_sub(element, sub, value, kind, path)?;
                    }
                    Ok(())
                }
                _ => Err(ScimError::InvalidPath(format!(
                    "'{}' does not address a complex value",
                    path
                ))),
            }
        }
    }
}

fn append_to(entry: &mut Value, value: &Value) -> ScimResult<()> {
    if let Value::Array(elements) = entry {
        append_elements(elements, value);
    }
    Ok(())
}

fn append_elements(elements: &mut Vec<Value>, value: &Value) {
    match value {
        Value::Array(items) => elements.extend(items.iter().cloned()),
        single => elements.push(single.clone()),
    }
}

fn set_or_remove_sub(
    element: &mut Value,
    sub: &str,
    value: Option<&Value>,
    kind: PatchOpKind,
    path: &PatchPath,
) -> ScimResult<()> {
    let obj = element.as_object_mut().ok_or_else(|| {
        ScimError::InvalidPath(format!("'{}' does not address a complex value", path))
    })?;
    let sub_key = obj
        .keys()
        .find(|k| k.eq_ignore_ascii_case(sub))
        .cloned()
        .unwrap_or_else(|| sub.to_string());
    match kind {
        PatchOpKind::Remove => {
            if obj.remove(&sub_key).is_none() {
                return Err(ScimError::NoTarget(format!(
                    "attribute '{}' has no value to remove",
                    path
                )));
            }
        }
        PatchOpKind::Add | PatchOpKind::Replace => {
            obj.insert(sub_key, value.unwrap().clone());
        }
    }
    Ok(())
}

fn apply_filtered(
    set: &SchemaSet,
    container: &mut Value,
    path: &PatchPath,
    filter: &crate::filter::ast::FilterExpr,
    attr: &SchemaAttribute,
    value: Option<&Value>,
    kind: PatchOpKind,
) -> ScimResult<()> {
    if !attr.multi_valued {
        return Err(ScimError::InvalidPath(format!(
            "'{}' applies a value filter to a single-valued attribute",
            path.attr.attr
        )));
    }
    let obj = container
        .as_object_mut()
        .ok_or_else(|| ScimError::internal("patch container is not an object"))?;
    let Some(attr_key) = obj.keys().find(|k| k.eq_ignore_ascii_case(&path.attr.attr)).cloned()
    else {
        return Err(ScimError::NoTarget(format!(
            "path '{}' matched no values",
            path
        )));
    };
    let Some(Value::Array(elements)) = obj.get_mut(&attr_key) else {
        return Err(ScimError::NoTarget(format!(
            "path '{}' matched no values",
            path
        )));
    };

    let evaluator = FilterEvaluator::scoped(set, &path.attr.attr);
    let matches: Vec<usize> = elements
        .iter()
        .enumerate()
        .filter(|(_, element)| evaluator.matches(filter, element))
        .map(|(index, _)| index)
        .collect();

    if matches.is_empty() {
        return Err(ScimError::NoTarget(format!(
            "path '{}' matched no values",
            path
        )));
    }

    match kind {
        PatchOpKind::Remove => match &path.sub_attr {
            None => {
                let mut index = 0usize;
                elements.retain(|_| {
                    let keep = !matches.contains(&index);
                    index += 1;
                    keep
                });
                // An emptied multi-valued attribute disappears entirely.
                if elements.is_empty() {
                    obj.remove(&attr_key);
                }
                Ok(())
            }
            Some(sub) => {
                for &index in &matches {
                    set_or_remove_sub(&mut elements[index], sub, None, kind, path)?;
                }
                Ok(())
            }
        },
        PatchOpKind::Add | PatchOpKind::Replace => {
            let value = value.unwrap();
            for &index in &matches {
                match &path.sub_attr {
                    Some(sub) => {
                        set_or_remove_sub(&mut elements[index], sub, Some(value), kind, path)?
                    }
                    None => match (elements[index].as_object_mut(), value.as_object()) {
                        // Merging an object into the selected element keeps
                        // sub-attributes the patch did not mention.
                        (Some(element), Some(additions)) if kind == PatchOpKind::Add => {
                            for (k, v) in additions {
                                element.insert(k.clone(), v.clone());
                            }
                        }
                        _ => elements[index] = value.clone(),
                    },
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{SchemaRegistry, ENTERPRISE_USER_URN, USER_URN};
    use serde_json::json;

    fn user_set() -> SchemaSet {
        let registry = SchemaRegistry::new().unwrap();
        SchemaSet::resolve(
            &registry,
            USER_URN,
            &[(ENTERPRISE_USER_URN.to_string(), false)],
        )
        .unwrap()
    }

    fn stored_user() -> Value {
        json!({
            "schemas": [USER_URN],
            "id": "2819c223",
            "userName": "bjensen",
            "displayName": "Babs",
            "name": {"givenName": "Barbara", "familyName": "Jensen"},
            "emails": [
                {"value": "bjensen@example.com", "type": "work"},
                {"value": "babs@jensen.org", "type": "home"}
            ]
        })
    }

    fn patch(operations: Value) -> PatchRequest {
        PatchRequest::from_json(&json!({
            "schemas": [PATCH_OP_URN],
            "Operations": operations
        }))
        .unwrap()
    }

    #[test]
    fn body_must_declare_patch_op_schema() {
        let result = PatchRequest::from_json(&json!({
            "Operations": [{"op": "add", "value": {}}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn replace_with_filtered_path_updates_matching_element_only() {
        let set = user_set();
        let request = patch(json!([
            {"op": "replace", "path": "emails[type eq \"work\"].value", "value": "b@x"}
        ]));
        let result = apply_patch(&set, &stored_user(), &request).unwrap();
        let emails = result["emails"].as_array().unwrap();
        assert_eq!(emails[0]["value"], "b@x");
        assert_eq!(emails[0]["type"], "work");
        assert_eq!(emails[1]["value"], "babs@jensen.org");
    }

    #[test]
    fn remove_with_unmatched_filter_is_no_target() {
        let set = user_set();
        let request = patch(json!([
            {"op": "remove", "path": "emails[type eq \"other\"]"}
        ]));
        let error = apply_patch(&set, &stored_user(), &request).unwrap_err();
        assert_eq!(error.scim_type(), Some("noTarget"));
    }

    #[test]
    fn remove_matching_elements() {
        let set = user_set();
        let request = patch(json!([
            {"op": "remove", "path": "emails[type eq \"home\"]"}
        ]));
        let result = apply_patch(&set, &stored_user(), &request).unwrap();
        let emails = result["emails"].as_array().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0]["type"], "work");
    }

    #[test]
    fn remove_last_element_drops_attribute() {
        let set = user_set();
        let request = patch(json!([
            {"op": "remove", "path": "emails[type eq \"home\"]"},
            {"op": "remove", "path": "emails[type eq \"work\"]"}
        ]));
        let result = apply_patch(&set, &stored_user(), &request).unwrap();
        assert!(result.get("emails").is_none());
    }

    #[test]
    fn add_without_path_merges_and_appends() {
        let set = user_set();
        let request = patch(json!([
            {"op": "add", "value": {
                "nickName": "Babsy",
                "emails": [{"value": "third@example.com", "type": "other"}]
            }}
        ]));
        let result = apply_patch(&set, &stored_user(), &request).unwrap();
        assert_eq!(result["nickName"], "Babsy");
        assert_eq!(result["emails"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn replace_without_path_overwrites_arrays() {
        let set = user_set();
        let request = patch(json!([
            {"op": "replace", "value": {
                "emails": [{"value": "only@example.com", "type": "work"}]
            }}
        ]));
        let result = apply_patch(&set, &stored_user(), &request).unwrap();
        assert_eq!(result["emails"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn add_to_multi_valued_appends() {
        let set = user_set();
        let request = patch(json!([
            {"op": "add", "path": "emails", "value": {"value": "new@example.com", "type": "other"}}
        ]));
        let result = apply_patch(&set, &stored_user(), &request).unwrap();
        assert_eq!(result["emails"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn add_to_single_valued_overwrites() {
        let set = user_set();
        let request = patch(json!([
            {"op": "add", "path": "displayName", "value": "Barbara J"}
        ]));
        let result = apply_patch(&set, &stored_user(), &request).unwrap();
        assert_eq!(result["displayName"], "Barbara J");
    }

    #[test]
    fn replace_sub_attribute() {
        let set = user_set();
        let request = patch(json!([
            {"op": "replace", "path": "name.familyName", "value": "Smith"}
        ]));
        let result = apply_patch(&set, &stored_user(), &request).unwrap();
        assert_eq!(result["name"]["familyName"], "Smith");
        assert_eq!(result["name"]["givenName"], "Barbara");
    }

    #[test]
    fn remove_missing_attribute_is_no_target() {
        let set = user_set();
        let request = patch(json!([
            {"op": "remove", "path": "nickName"}
        ]));
        let error = apply_patch(&set, &stored_user(), &request).unwrap_err();
        assert_eq!(error.scim_type(), Some("noTarget"));
    }

    #[test]
    fn remove_requires_path() {
        let result = PatchRequest::from_json(&json!({
            "schemas": [PATCH_OP_URN],
            "Operations": [{"op": "remove"}]
        }));
        assert_eq!(result.unwrap_err().scim_type(), Some("noTarget"));
    }

    #[test]
    fn unknown_path_attribute_is_invalid_path() {
        let set = user_set();
        let request = patch(json!([
            {"op": "replace", "path": "shoeSize", "value": 44}
        ]));
        let error = apply_patch(&set, &stored_user(), &request).unwrap_err();
        assert_eq!(error.scim_type(), Some("invalidPath"));
    }

    #[test]
    fn extension_attribute_lands_under_urn_key() {
        let set = user_set();
        let request = patch(json!([
            {"op": "add", "path": "employeeNumber", "value": "701984"}
        ]));
        let mut stored = stored_user();
        stored["schemas"] = json!([USER_URN, ENTERPRISE_USER_URN]);
        let result = apply_patch(&set, &stored, &request).unwrap();
        assert_eq!(result[ENTERPRISE_USER_URN]["employeeNumber"], "701984");
    }

    #[test]
    fn failed_operation_leaves_stored_untouched() {
        let set = user_set();
        let stored = stored_user();
        let request = patch(json!([
            {"op": "replace", "path": "displayName", "value": "Changed"},
            {"op": "remove", "path": "emails[type eq \"missing\"]"}
        ]));
        let error = apply_patch(&set, &stored, &request).unwrap_err();
        assert_eq!(error.scim_type(), Some("noTarget"));
        // the caller's document is untouched by the partial application
        assert_eq!(stored["displayName"], "Babs");
    }

    #[test]
    fn result_is_revalidated() {
        let set = user_set();
        // removing userName leaves the resource without a required attribute
        let request = patch(json!([
            {"op": "remove", "path": "userName"}
        ]));
        let error = apply_patch(&set, &stored_user(), &request).unwrap_err();
        assert_eq!(error.scim_type(), Some("invalidValue"));
    }
}
