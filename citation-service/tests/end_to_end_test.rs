//! A full session: sign up, annotate, get refused, edit, clean up.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{highlight_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn alice_and_bob_share_a_paper() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    // Alice highlights a passage.
    let res = app
        .request(
            Method::POST,
            "/highlights/",
            Some(&alice),
            Some(highlight_body("10.1234/Example.5678", "Key finding", Some("cite this"))),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.body["id"].as_i64().unwrap();
    let uri = format!("/highlights/{}/", id);

    // Anyone can read it anonymously, without learning who wrote it.
    let res = app.get("/highlights/public/?doi=10.1234/example.5678", None).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert!(res.body[0].get("username").is_none());

    // Bob passes the policy check but not the ownership check.
    let res = app
        .request(
            Method::PUT,
            &uri,
            Some(&bob),
            Some(highlight_body("10.1234/example.5678", "Bob's edit", None)),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    // Bob is refused the admin directory with an identical body.
    let denied = app.get("/users/admin/username/alice/", Some(&bob)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body, res.body);

    // Alice revises her note.
    let res = app
        .request(
            Method::PUT,
            &uri,
            Some(&alice),
            Some(highlight_body("10.1234/example.5678", "Key finding", Some("cite in ch. 2"))),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["comment"], "cite in ch. 2");

    let res = app.get("/users/me/highlights/", Some(&alice)).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    let res = app.get("/users/me/highlights/", Some(&bob)).await;
    assert!(res.body.as_array().unwrap().is_empty());

    let res = app.request(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get("/highlights/public/", None).await;
    assert!(res.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn observability_endpoints() {
    let app = TestApp::new();

    let res = app.get("/health", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");

    let res = app.get("/ping", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body,
        json!({ "ping": "pong", "environment": "dev", "testing": true })
    );

    let res = app.get("/metrics", None).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get("/.well-known/openapi.json", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["paths"].get("/highlights/{id}/").is_some());
    assert!(res.body["components"]["securitySchemes"]
        .get("bearer_auth")
        .is_some());
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::new();

    let res = app.get("/ping", None).await;
    assert!(res.headers.get("x-request-id").is_some());
    assert_eq!(
        res.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let res = app.get("/no/such/route", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get("/users/me/", Some("garbage")).await;
    assert_eq!(res.headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
}

#[test]
fn token_lifetime_is_bounded_at_startup() {
    use citation_service::config::MAX_ACCESS_TOKEN_EXPIRY_MINUTES;

    let mut config = common::test_config();
    config.common.port = 8000;
    assert!(config.validate().is_ok());

    config.jwt.access_token_expiry_minutes = MAX_ACCESS_TOKEN_EXPIRY_MINUTES;
    assert!(config.validate().is_ok());

    config.jwt.access_token_expiry_minutes = MAX_ACCESS_TOKEN_EXPIRY_MINUTES + 1;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("ACCESS_TOKEN_EXPIRE_MINUTES"));

    config.jwt.access_token_expiry_minutes = 0;
    assert!(config.validate().is_err());
}
