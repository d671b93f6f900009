//! Client-side bulk request splitting.
//!
//! A client whose bulk request exceeds the server's advertised
//! `bulk.maxOperations` can split it into several rounds. Operations only
//! enter a round once every `bulkId` they reference is either resolved
//! from an earlier round or defined within the same round; between rounds
//! the caller feeds the server's bulk response back so assigned ids
//! replace the now-stale `bulkId:` tokens.

use super::{BulkOperation, BulkRequest};
use crate::error::{ScimError, ScimResult};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Stateful splitter driving a multi-round bulk exchange.
///
/// ```no_run
/// # use scim_engine::bulk::{BulkRequest, splitting::BulkRequestSplitter};
/// # fn send(body: serde_json::Value) -> serde_json::Value { unimplemented!() }
/// # fn example(oversized: BulkRequest) -> Result<(), scim_engine::ScimError> {
/// let mut splitter = BulkRequestSplitter::new(oversized, 1000);
/// while let Some(round) = splitter.next_request()? {
///     let response = send(round.to_json());
///     splitter.record_response(&response);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BulkRequestSplitter {
    remaining: Vec<BulkOperation>,
    fail_on_errors: Option<usize>,
    max_operations: usize,
    resolved: HashMap<String, String>,
}

impl BulkRequestSplitter {
    pub fn new(request: BulkRequest, max_operations: usize) -> Self {
        Self {
            remaining: request.operations,
            fail_on_errors: request.fail_on_errors,
            max_operations: max_operations.max(1),
            resolved: HashMap::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Build the next round, or `None` when everything has been dispatched.
    ///
    /// Fails when the remaining operations reference each other so that no
    /// round can make progress, which mirrors the server's cycle error.
    pub fn next_request(&mut self) -> ScimResult<Option<BulkRequest>> {
        if self.remaining.is_empty() {
            return Ok(None);
        }

        let mut round: Vec<BulkOperation> = Vec::new();
        let mut round_ids: HashSet<String> = HashSet::new();
        let mut deferred: Vec<BulkOperation> = Vec::new();

        for operation in self.remaining.drain(..) {
            if round.len() >= self.max_operations {
                deferred.push(operation);
                continue;
            }
            let satisfiable = operation.references().iter().all(|reference| {
                self.resolved.contains_key(reference) || round_ids.contains(reference)
            });
            if satisfiable {
                let mut operation = operation;
                operation.path = super::resolve_refs_str(&operation.path, &self.resolved);
                if let Some(data) = &operation.data {
                    operation.data = Some(super::resolve_refs(data, &self.resolved));
                }
                if let Some(bulk_id) = &operation.bulk_id {
                    round_ids.insert(bulk_id.clone());
                }
                round.push(operation);
            } else {
                deferred.push(operation);
            }
        }
        self.remaining = deferred;

        if round.is_empty() {
            return Err(ScimError::InvalidSyntax(
                "bulk operations reference each other in a way that cannot be split".into(),
            ));
        }
        Ok(Some(BulkRequest {
            fail_on_errors: self.fail_on_errors,
            operations: round,
        }))
    }

    /// Harvest assigned resource ids out of a bulk response body.
    pub fn record_response(&mut self, response: &Value) {
        let Some(operations) = response
            .as_object()
            .and_then(|obj| {
                obj.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("operations"))
                    .map(|(_, v)| v)
            })
            .and_then(Value::as_array)
        else {
            return;
        };
        for entry in operations {
            let Some(bulk_id) = entry.get("bulkId").and_then(Value::as_str) else {
                continue;
            };
            let status_ok = entry
                .get("status")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<u16>().ok())
                .map(|status| status < 400)
                .unwrap_or(false);
            if !status_ok {
                continue;
            }
            if let Some(id) = entry
                .get("location")
                .and_then(Value::as_str)
                .and_then(|location| location.rsplit('/').next())
            {
                self.resolved.insert(bulk_id.to_string(), id.to_string());
            }
        }
    }
}
