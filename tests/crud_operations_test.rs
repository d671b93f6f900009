//! End-to-end CRUD flows through the dispatcher.

mod common;

use common::*;
use scim_engine::ScimHttpRequest;
use serde_json::json;

#[tokio::test]
async fn create_user_assigns_id_and_meta() {
    let (engine, users, _) = engine();
    let body = create_user(&engine, user_body("bob")).await;

    let id = body["id"].as_str().expect("id assigned");
    assert_eq!(body["userName"], "bob");
    assert_eq!(body["meta"]["resourceType"], "User");
    assert!(body["meta"]["created"].is_string());
    assert_eq!(
        body["meta"]["location"],
        format!("{}/Users/{}", BASE_URL, id)
    );
    assert!(users.stored(id).is_some());
}

#[tokio::test]
async fn create_sets_location_header() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("POST", "/Users").with_body(user_body("bob").to_string()))
        .await;
    assert_eq!(response.status, 201);
    let location = response.header("location").expect("location header");
    let body = response.json_body().unwrap();
    assert_eq!(location, body["meta"]["location"].as_str().unwrap());
    assert!(response.header("etag").is_some());
}

#[tokio::test]
async fn create_rejects_missing_required_attribute() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(
            ScimHttpRequest::new("POST", "/Users")
                .with_body(json!({"schemas": [USER_URN], "displayName": "nameless"}).to_string()),
        )
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.json_body().unwrap()["scimType"], "invalidValue");
}

#[tokio::test]
async fn create_never_returns_password() {
    let (engine, _, _) = engine();
    let mut body = user_body("bob");
    body["password"] = json!("hunter2");
    let created = create_user(&engine, body).await;
    assert!(created.get("password").is_none());
}

#[tokio::test]
async fn get_returns_resource_with_refreshed_meta() {
    let (engine, _, _) = engine();
    let created = create_user(&engine, user_body("bob")).await;
    let id = created["id"].as_str().unwrap();

    let response = engine
        .handle(ScimHttpRequest::new("GET", format!("/Users/{}", id)))
        .await;
    assert_eq!(response.status, 200);
    let body = response.json_body().unwrap();
    assert_eq!(body["userName"], "bob");
    assert_eq!(body["meta"]["location"], format!("{}/Users/{}", BASE_URL, id));
}

#[tokio::test]
async fn get_unknown_id_is_404() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("GET", "/Users/nope"))
        .await;
    assert_eq!(response.status, 404);
    let body = response.json_body().unwrap();
    assert_eq!(body["status"], "404");
}

#[tokio::test]
async fn unknown_endpoint_is_404() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("GET", "/Gadgets"))
        .await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn put_replaces_resource() {
    let (engine, users, _) = engine();
    let created = create_user(&engine, user_body("bob")).await;
    let id = created["id"].as_str().unwrap();

    let mut replacement = user_body("bob");
    replacement["displayName"] = json!("Robert");
    let response = engine
        .handle(
            ScimHttpRequest::new("PUT", format!("/Users/{}", id))
                .with_body(replacement.to_string()),
        )
        .await;
    assert_eq!(response.status, 200);
    let body = response.json_body().unwrap();
    assert_eq!(body["displayName"], "Robert");
    assert_eq!(body["id"], id);
    assert_eq!(users.stored(id).unwrap()["displayName"], "Robert");
}

#[tokio::test]
async fn put_on_missing_resource_is_404() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("PUT", "/Users/nope").with_body(user_body("x").to_string()))
        .await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn delete_removes_resource() {
    let (engine, users, _) = engine();
    let created = create_user(&engine, user_body("bob")).await;
    let id = created["id"].as_str().unwrap();

    let response = engine
        .handle(ScimHttpRequest::new("DELETE", format!("/Users/{}", id)))
        .await;
    assert_eq!(response.status, 204);
    assert!(response.body.is_none());
    assert!(users.stored(id).is_none());

    let again = engine
        .handle(ScimHttpRequest::new("DELETE", format!("/Users/{}", id)))
        .await;
    assert_eq!(again.status, 404);
}

#[tokio::test]
async fn unknown_top_level_attribute_is_rejected() {
    let (engine, _, _) = engine();
    let mut body = user_body("bob");
    body["favouriteColor"] = json!("green");
    let response = engine
        .handle(ScimHttpRequest::new("POST", "/Users").with_body(body.to_string()))
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.json_body().unwrap()["scimType"], "invalidSyntax");
}

#[tokio::test]
async fn extension_attributes_survive_create() {
    let (engine, _, _) = engine();
    let mut body = user_body("bob");
    body["schemas"] = json!([USER_URN, ENTERPRISE_URN]);
    body[ENTERPRISE_URN] = json!({"employeeNumber": "701984", "department": "Tour Operations"});
    let created = create_user(&engine, body).await;
    assert_eq!(created[ENTERPRISE_URN]["employeeNumber"], "701984");
    assert!(created["schemas"]
        .as_array()
        .unwrap()
        .iter()
        .any(|urn| urn == ENTERPRISE_URN));
}

#[tokio::test]
async fn projection_limits_returned_attributes() {
    let (engine, _, _) = engine();
    let mut body = user_body("bob");
    body["displayName"] = json!("Bob B");
    body["emails"] = json!([{"value": "bob@example.com", "type": "work"}]);
    let created = create_user(&engine, body).await;
    let id = created["id"].as_str().unwrap();

    let response = engine
        .handle(
            ScimHttpRequest::new("GET", format!("/Users/{}", id))
                .with_query("attributes", "userName"),
        )
        .await;
    let body = response.json_body().unwrap();
    assert_eq!(body["userName"], "bob");
    assert!(body.get("displayName").is_none());
    assert!(body.get("emails").is_none());
    // id is always returned
    assert_eq!(body["id"], id);
}

#[tokio::test]
async fn attributes_and_excluded_attributes_conflict() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(
            ScimHttpRequest::new("GET", "/Users")
                .with_query("attributes", "userName")
                .with_query("excludedAttributes", "emails"),
        )
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.json_body().unwrap()["scimType"], "invalidSyntax");
}
