//! Discovery endpoints: ServiceProviderConfig, Schemas, ResourceTypes.

mod common;

use common::*;
use scim_engine::ScimHttpRequest;

#[tokio::test]
async fn service_provider_config_document() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("GET", "/ServiceProviderConfig"))
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response.header("content-type"),
        Some("application/scim+json")
    );
    let body = response.json_body().unwrap();
    assert_eq!(body["patch"]["supported"], true);
    assert_eq!(body["bulk"]["maxOperations"], 1000);
    assert_eq!(body["filter"]["maxResults"], 200);
}

#[tokio::test]
async fn schemas_listing_contains_user_schema() {
    let (engine, _, _) = engine();
    let response = engine.handle(ScimHttpRequest::new("GET", "/Schemas")).await;
    assert_eq!(response.status, 200);
    let body = response.json_body().unwrap();
    assert!(body["Resources"]
        .as_array()
        .unwrap()
        .iter()
        .any(|schema| schema["id"] == USER_URN));
}

#[tokio::test]
async fn single_schema_lookup_by_urn() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("GET", format!("/Schemas/{}", USER_URN)))
        .await;
    assert_eq!(response.status, 200);
    let body = response.json_body().unwrap();
    assert_eq!(body["name"], "User");
    assert!(body["attributes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|attr| attr["name"] == "userName"));
    assert_eq!(
        body["meta"]["location"],
        format!("{}/Schemas/{}", BASE_URL, USER_URN)
    );
}

#[tokio::test]
async fn unknown_schema_is_404() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("GET", "/Schemas/urn:nope"))
        .await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn resource_types_listing() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("GET", "/ResourceTypes"))
        .await;
    assert_eq!(response.status, 200);
    let body = response.json_body().unwrap();
    let resources = body["Resources"].as_array().unwrap();
    assert_eq!(resources.len(), 2);
    let user = resources.iter().find(|rt| rt["name"] == "User").unwrap();
    assert_eq!(user["endpoint"], "/Users");
    assert_eq!(user["schema"], USER_URN);
    assert_eq!(user["schemaExtensions"][0]["schema"], ENTERPRISE_URN);
}

#[tokio::test]
async fn resource_type_lookup_by_name() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("GET", "/ResourceTypes/Group"))
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.json_body().unwrap()["endpoint"], "/Groups");
}

#[tokio::test]
async fn discovery_endpoints_are_read_only() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("POST", "/Schemas").with_body("{}"))
        .await;
    assert_eq!(response.status, 501);
}
