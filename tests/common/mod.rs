//! Shared test harness: an in-memory resource handler and engine builders.
#![allow(dead_code)]

use async_trait::async_trait;
use scim_engine::resource::{Context, ListRequest, PartialListResponse, ResourceHandler};
use scim_engine::schema::AttributeProjection;
use scim_engine::{
    ResourceVersion, ScimEngine, ScimEngineBuilder, ScimError, ScimHttpRequest, ScimResult,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const BASE_URL: &str = "https://example.com/scim/v2";
pub const USER_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const ENTERPRISE_URN: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
pub const GROUP_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// A trivial store keyed by id, shared between test assertions and the
/// engine through clones.
#[derive(Clone, Default)]
pub struct InMemoryHandler {
    resource_type: String,
    store: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemoryHandler {
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn stored(&self, id: &str) -> Option<Value> {
        self.store.lock().unwrap().get(id).cloned()
    }

    pub fn insert(&self, resource: Value) -> String {
        let id = resource["id"].as_str().expect("seeded resource needs an id").to_string();
        self.store.lock().unwrap().insert(id.clone(), resource);
        id
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    fn stamp(&self, mut resource: Value, id: &str, created: Option<String>) -> Value {
        let created = created
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
        let version = ResourceVersion::from_content(resource.to_string().as_bytes());
        resource["id"] = json!(id);
        resource["meta"] = json!({
            "resourceType": self.resource_type,
            "created": created,
            "lastModified": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "version": version.as_str(),
        });
        resource
    }
}

#[async_trait]
impl ResourceHandler for InMemoryHandler {
    async fn create(&self, resource: Value, _context: &Context) -> ScimResult<Value> {
        let id = Uuid::new_v4().to_string();
        let stored = self.stamp(resource, &id, None);
        self.store.lock().unwrap().insert(id, stored.clone());
        Ok(stored)
    }

    async fn get(
        &self,
        id: &str,
        _projection: &AttributeProjection,
        _context: &Context,
    ) -> ScimResult<Value> {
        self.store
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ScimError::not_found(&self.resource_type, id))
    }

    async fn list(
        &self,
        _request: &ListRequest,
        _context: &Context,
    ) -> ScimResult<PartialListResponse> {
        let store = self.store.lock().unwrap();
        let mut resources: Vec<Value> = store.values().cloned().collect();
        // Stable order for pagination assertions.
        resources.sort_by_key(|r| r["id"].as_str().unwrap_or_default().to_string());
        let total = resources.len();
        Ok(PartialListResponse::new(resources, total))
    }

    async fn update(&self, id: &str, resource: Value, _context: &Context) -> ScimResult<Value> {
        let mut store = self.store.lock().unwrap();
        let existing = store
            .get(id)
            .ok_or_else(|| ScimError::not_found(&self.resource_type, id))?;
        let created = existing
            .pointer("/meta/created")
            .and_then(Value::as_str)
            .map(str::to_string);
        let stored = self.stamp(resource, id, created);
        store.insert(id.to_string(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &str, _context: &Context) -> ScimResult<()> {
        self.store
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ScimError::not_found(&self.resource_type, id))
    }
}

/// Engine with User (plus enterprise extension) and Group endpoints backed
/// by in-memory handlers.
pub fn engine() -> (ScimEngine, InMemoryHandler, InMemoryHandler) {
    let users = InMemoryHandler::new("User");
    let groups = InMemoryHandler::new("Group");

    let mut builder = ScimEngineBuilder::new(BASE_URL).unwrap();
    builder
        .register_resource_type(
            &json!({
                "name": "User",
                "endpoint": "/Users",
                "description": "User accounts",
                "schema": USER_URN,
                "schemaExtensions": [{"schema": ENTERPRISE_URN, "required": false}],
            }),
            Arc::new(users.clone()),
        )
        .unwrap();
    builder
        .register_resource_type(
            &json!({
                "name": "Group",
                "endpoint": "/Groups",
                "description": "Groups",
                "schema": GROUP_URN,
            }),
            Arc::new(groups.clone()),
        )
        .unwrap();
    (builder.build(), users, groups)
}

/// A minimal valid user document.
pub fn user_body(user_name: &str) -> Value {
    json!({
        "schemas": [USER_URN],
        "userName": user_name,
    })
}

/// POST a user and return the response body.
pub async fn create_user(engine: &ScimEngine, body: Value) -> Value {
    let response = engine
        .handle(ScimHttpRequest::new("POST", "/Users").with_body(body.to_string()))
        .await;
    assert_eq!(response.status, 201, "create failed: {:?}", response.body);
    response.json_body().unwrap()
}
