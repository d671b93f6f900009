//! Bulk request processing (RFC 7644 §3.7).
//!
//! Operations may reference each other's server-assigned ids through
//! `bulkId:XYZ` tokens anywhere in their `data` or `path`. The processor
//! builds the dependency graph up front, rejects cycles before executing
//! anything, then runs the operations sequentially in topological order
//! through the dispatcher, rewriting tokens with assigned ids as they
//! become known.

pub mod splitting;

use crate::endpoints::{ScimHttpRequest, ScimHttpResponse};
use crate::error::{ScimError, ScimResult};
use crate::ScimEngine;
use log::{debug, info};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

/// Schema URN of the BulkRequest message.
pub const BULK_REQUEST_URN: &str = "urn:ietf:params:scim:api:messages:2.0:BulkRequest";
/// Schema URN of the BulkResponse message.
pub const BULK_RESPONSE_URN: &str = "urn:ietf:params:scim:api:messages:2.0:BulkResponse";

const BULK_ID_PREFIX: &str = "bulkId:";

/// One operation of a bulk request.
#[derive(Debug, Clone)]
pub struct BulkOperation {
    pub method: String,
    pub path: String,
    pub bulk_id: Option<String>,
    pub data: Option<Value>,
    /// Forwarded as `If-Match` on the dispatched request.
    pub version: Option<String>,
}

impl BulkOperation {
    fn from_json(raw: &Value) -> ScimResult<Self> {
        let obj = raw.as_object().ok_or_else(|| {
            ScimError::InvalidSyntax("bulk operations must be objects".into())
        })?;
        let method = obj
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| ScimError::InvalidSyntax("bulk operation is missing 'method'".into()))?
            .to_string();
        let path = obj
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ScimError::InvalidSyntax("bulk operation is missing 'path'".into()))?
            .to_string();
        Ok(Self {
            method,
            path,
            bulk_id: obj.get("bulkId").and_then(Value::as_str).map(str::to_string),
            data: obj.get("data").cloned().filter(|v| !v.is_null()),
            version: obj.get("version").and_then(Value::as_str).map(str::to_string),
        })
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("method".into(), Value::String(self.method.clone()));
        obj.insert("path".into(), Value::String(self.path.clone()));
        if let Some(bulk_id) = &self.bulk_id {
            obj.insert("bulkId".into(), Value::String(bulk_id.clone()));
        }
        if let Some(data) = &self.data {
            obj.insert("data".into(), data.clone());
        }
        if let Some(version) = &self.version {
            obj.insert("version".into(), Value::String(version.clone()));
        }
        Value::Object(obj)
    }

    /// All `bulkId:` tokens referenced from the path or data.
    fn references(&self) -> HashSet<String> {
        let mut refs = HashSet::new();
        collect_refs_str(&self.path, &mut refs);
        if let Some(data) = &self.data {
            collect_refs(data, &mut refs);
        }
        refs
    }
}

/// A parsed bulk request.
#[derive(Debug, Clone)]
pub struct BulkRequest {
    pub fail_on_errors: Option<usize>,
    pub operations: Vec<BulkOperation>,
}

impl BulkRequest {
    /// Parse and structurally validate a BulkRequest body.
    pub fn from_json(body: &Value) -> ScimResult<Self> {
        let obj = body
            .as_object()
            .ok_or_else(|| ScimError::InvalidSyntax("bulk body must be a JSON object".into()))?;
        let declares = obj
            .get("schemas")
            .and_then(Value::as_array)
            .map(|urns| {
                urns.iter()
                    .filter_map(Value::as_str)
                    .any(|urn| urn.eq_ignore_ascii_case(BULK_REQUEST_URN))
            })
            .unwrap_or(false);
        if !declares {
            return Err(ScimError::InvalidSyntax(format!(
                "bulk body must declare '{}'",
                BULK_REQUEST_URN
            )));
        }

        let fail_on_errors = match obj.get("failOnErrors") {
            Some(Value::Number(n)) => Some(n.as_u64().ok_or_else(|| {
                ScimError::invalid_value("failOnErrors", "must be a non-negative integer")
            })? as usize),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(ScimError::invalid_value(
                    "failOnErrors",
                    "must be a non-negative integer",
                ));
            }
        };

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
            operations.push(BulkOperation::from_json(raw)?);
        }
        Ok(Self {
            fail_on_errors,
            operations,
        })
    }

    /// Render back to the wire form, used by the client-side splitter.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("schemas".into(), json!([BULK_REQUEST_URN]));
        if let Some(limit) = self.fail_on_errors {
            obj.insert("failOnErrors".into(), Value::from(limit));
        }
        obj.insert(
            "Operations".into(),
            Value::Array(self.operations.iter().map(BulkOperation::to_json).collect()),
        );
        Value::Object(obj)
    }
}

/// Execute a bulk request through the engine's dispatcher.
pub(crate) async fn process_bulk(
    engine: &ScimEngine,
    request: &ScimHttpRequest,
) -> ScimResult<ScimHttpResponse> {
    let config = &engine.service_provider().bulk;
    if let Some(body) = &request.body {
        if body.len() > config.max_payload_size {
            return Err(ScimError::TooMany(format!(
                "bulk payload of {} bytes exceeds the maximum of {}",
                body.len(),
                config.max_payload_size
            )));
        }
    }

    let body = request.json_body()?;
    let bulk_request = BulkRequest::from_json(&body)?;
    if bulk_request.operations.len() > config.max_operations {
        return Err(ScimError::TooMany(format!(
            "{} bulk operations exceed the maximum of {}",
            bulk_request.operations.len(),
            config.max_operations
        )));
    }

    info!(
        "SCIM bulk request with {} operations (failOnErrors: {:?})",
        bulk_request.operations.len(),
        bulk_request.fail_on_errors
    );

    let order = execution_order(&bulk_request.operations)?;

    let mut assigned: HashMap<String, String> = HashMap::new();
    let mut failed_bulk_ids: HashSet<String> = HashSet::new();
    let mut responses: Vec<Value> = Vec::new();
    let mut error_count = 0usize;

    for index in order {
        if let Some(limit) = bulk_request.fail_on_errors {
            if error_count >= limit {
                debug!("failOnErrors budget of {} reached; skipping remaining operations", limit);
                break;
            }
        }

        let operation = &bulk_request.operations[index];
        let outcome = execute_operation(engine, request, operation, &assigned, &failed_bulk_ids).await;

        let mut entry = Map::new();
        entry.insert("method".into(), Value::String(operation.method.clone()));
        if let Some(bulk_id) = &operation.bulk_id {
            entry.insert("bulkId".into(), Value::String(bulk_id.clone()));
        }

        match outcome {
            Ok(response) => {
                entry.insert("status".into(), Value::String(response.status.to_string()));
                if let Some(location) = response.header("location") {
                    entry.insert("location".into(), Value::String(location.to_string()));
                }
                if response.status < 400 {
                    if let Some(bulk_id) = &operation.bulk_id {
                        if let Some(id) = assigned_id(&response) {
                            assigned.insert(bulk_id.clone(), id);
                        }
                    }
                } else {
                    error_count += 1;
                    if let Some(bulk_id) = &operation.bulk_id {
                        failed_bulk_ids.insert(bulk_id.clone());
                    }
                    if let Some(error_body) = response.json_body() {
                        entry.insert("response".into(), error_body);
                    }
                }
            }
            Err(error) => {
                error_count += 1;
                if let Some(bulk_id) = &operation.bulk_id {
                    failed_bulk_ids.insert(bulk_id.clone());
                }
                entry.insert("status".into(), Value::String(error.status().to_string()));
                entry.insert("response".into(), error.to_error_response());
            }
        }
        responses.push(Value::Object(entry));
    }

    Ok(ScimHttpResponse::json(
        200,
        &json!({
            "schemas": [BULK_RESPONSE_URN],
            "Operations": responses,
        }),
    ))
}

async fn execute_operation(
    engine: &ScimEngine,
    bulk_http: &ScimHttpRequest,
    operation: &BulkOperation,
    assigned: &HashMap<String, String>,
    failed_bulk_ids: &HashSet<String>,
) -> ScimResult<ScimHttpResponse> {
    // Every reference must point at a known, successfully executed
    // operation by now; anything else fails just this operation.
    for reference in operation.references() {
        if failed_bulk_ids.contains(&reference) {
            return Err(ScimError::invalid_value(
                "bulkId",
                format!("referenced operation 'bulkId:{}' failed", reference),
            ));
        }
        if !assigned.contains_key(&reference) {
            return Err(ScimError::invalid_value(
                "bulkId",
                format!("unknown bulkId reference '{}'", reference),
            ));
        }
    }

    let path = resolve_refs_str(&operation.path, assigned);
    let mut dispatched = ScimHttpRequest::new(operation.method.clone(), path);
    dispatched.authorization = bulk_http.authorization.clone();
    if let Some(version) = &operation.version {
        dispatched = dispatched.with_header("if-match", version.clone());
    }
    if let Some(data) = &operation.data {
        let resolved = resolve_refs(data, assigned);
        dispatched = dispatched.with_body(resolved.to_string());
    }

    Ok(engine.handle_boxed(dispatched).await)
}

/// Topological execution order over bulkId dependencies.
///
/// Declaration order is preserved among operations whose dependencies are
/// satisfied. References to unknown bulkIds do not participate in the
/// graph; they fail their operation at execution time. A dependency cycle
/// fails the whole request before anything executes.
fn execution_order(operations: &[BulkOperation]) -> ScimResult<Vec<usize>> {
    let mut by_bulk_id: HashMap<&str, usize> = HashMap::new();
    for (index, operation) in operations.iter().enumerate() {
        if let Some(bulk_id) = &operation.bulk_id {
            if by_bulk_id.insert(bulk_id.as_str(), index).is_some() {
                return Err(ScimError::InvalidSyntax(format!(
                    "duplicate bulkId '{}'",
                    bulk_id
                )));
            }
        }
    }

    let dependencies: Vec<Vec<usize>> = operations
        .iter()
        .enumerate()
        .map(|(index, operation)| {
            operation
                .references()
                .iter()
                .filter_map(|reference| by_bulk_id.get(reference.as_str()).copied())
                .filter(|&dep| dep != index)
                .collect()
        })
        .collect();

    let mut done = vec![false; operations.len()];
    let mut order = Vec::with_capacity(operations.len());
    while order.len() < operations.len() {
        let next = (0..operations.len()).find(|&index| {
            !done[index] && dependencies[index].iter().all(|&dep| done[dep])
        });
        match next {
            Some(index) => {
                done[index] = true;
                order.push(index);
            }
            None => {
                return Err(ScimError::InvalidSyntax(
                    "bulkId references form a cycle".into(),
                ));
            }
        }
    }
    Ok(order)
}

fn assigned_id(response: &ScimHttpResponse) -> Option<String> {
    if let Some(body) = response.json_body() {
        if let Some(id) = body.get("id").and_then(Value::as_str) {
            return Some(id.to_string());
        }
    }
    response
        .header("location")
        .and_then(|location| location.rsplit('/').next())
        .map(str::to_string)
}

fn collect_refs(value: &Value, refs: &mut HashSet<String>) {
    match value {
        Value::String(s) => collect_refs_str(s, refs),
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, refs)),
        Value::Object(obj) => obj.values().for_each(|item| collect_refs(item, refs)),
        _ => {}
    }
}

fn collect_refs_str(text: &str, refs: &mut HashSet<String>) {
    let mut remainder = text;
    while let Some(start) = remainder.find(BULK_ID_PREFIX) {
        let tail = &remainder[start + BULK_ID_PREFIX.len()..];
        let end = tail
            .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(tail.len());
        if end > 0 {
            refs.insert(tail[..end].to_string());
        }
        remainder = &tail[end..];
    }
}

fn resolve_refs(value: &Value, assigned: &HashMap<String, String>) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_refs_str(s, assigned)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| resolve_refs(item, assigned)).collect())
        }
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), resolve_refs(v, assigned)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_refs_str(text: &str, assigned: &HashMap<String, String>) -> String {
    let mut result = text.to_string();
    for (bulk_id, id) in assigned {
        let token = format!("{}{}", BULK_ID_PREFIX, bulk_id);
        if result.contains(&token) {
            result = result.replace(&token, id);
        }
    }
    result
}
