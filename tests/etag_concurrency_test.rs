//! ETag preconditions per RFC 7232.

mod common;

use common::*;
use scim_engine::ScimHttpRequest;
use serde_json::json;

fn seeded_user_with_version(users: &InMemoryHandler, version: &str) -> String {
    users.insert(json!({
        "schemas": [USER_URN],
        "id": "2819c223",
        "userName": "bjensen",
        "meta": {
            "resourceType": "User",
            "created": "2010-01-23T04:56:22Z",
            "lastModified": "2011-05-13T04:42:34Z",
            "version": version,
        }
    }))
}

#[tokio::test]
async fn if_match_mismatch_is_precondition_failed() {
    let (engine, users, _) = engine();
    let id = seeded_user_with_version(&users, "v2");

    let response = engine
        .handle(
            ScimHttpRequest::new("GET", format!("/Users/{}", id))
                .with_header("If-Match", "\"v1\""),
        )
        .await;
    assert_eq!(response.status, 412);
    let body = response.json_body().unwrap();
    assert_eq!(body["status"], "412");
}

#[tokio::test]
async fn if_match_with_current_version_succeeds() {
    let (engine, users, _) = engine();
    let id = seeded_user_with_version(&users, "v2");

    let response = engine
        .handle(
            ScimHttpRequest::new("GET", format!("/Users/{}", id))
                .with_header("If-Match", "W/\"v2\""),
        )
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("etag"), Some("W/\"v2\""));
}

#[tokio::test]
async fn if_none_match_current_version_is_not_modified() {
    let (engine, users, _) = engine();
    let id = seeded_user_with_version(&users, "v2");

    let response = engine
        .handle(
            ScimHttpRequest::new("GET", format!("/Users/{}", id))
                .with_header("If-None-Match", "W/\"v2\""),
        )
        .await;
    assert_eq!(response.status, 304);
    assert!(response.body.is_none());
}

#[tokio::test]
async fn if_none_match_other_version_returns_resource() {
    let (engine, users, _) = engine();
    let id = seeded_user_with_version(&users, "v2");

    let response = engine
        .handle(
            ScimHttpRequest::new("GET", format!("/Users/{}", id))
                .with_header("If-None-Match", "W/\"v1\""),
        )
        .await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn stale_if_match_blocks_replacement() {
    let (engine, users, _) = engine();
    let id = seeded_user_with_version(&users, "v2");

    let response = engine
        .handle(
            ScimHttpRequest::new("PUT", format!("/Users/{}", id))
                .with_header("If-Match", "\"v1\"")
                .with_body(user_body("bjensen").to_string()),
        )
        .await;
    assert_eq!(response.status, 412);
    // the stored resource is untouched
    assert_eq!(users.stored(&id).unwrap()["meta"]["version"], "v2");
}

#[tokio::test]
async fn if_match_star_passes_for_existing_resource() {
    let (engine, users, _) = engine();
    let id = seeded_user_with_version(&users, "v2");

    let response = engine
        .handle(
            ScimHttpRequest::new("PUT", format!("/Users/{}", id))
                .with_header("If-Match", "*")
                .with_body(user_body("bjensen").to_string()),
        )
        .await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn responses_carry_weak_etags() {
    let (engine, _, _) = engine();
    let response = engine
        .handle(ScimHttpRequest::new("POST", "/Users").with_body(user_body("bob").to_string()))
        .await;
    let etag = response.header("etag").expect("etag header");
    assert!(etag.starts_with("W/\""), "expected weak etag, got {}", etag);
    let body = response.json_body().unwrap();
    assert_eq!(body["meta"]["version"].as_str().unwrap(), etag);
}
