mod common;

use axum::http::{Method, StatusCode};
use common::{identity_app, jwt_config, login, register, send};
use moviereview::identity::jwt::JwtKeys;
use serde_json::json;
use time::{Duration, OffsetDateTime};

#[tokio::test]
async fn login_then_validate_returns_the_same_identity() {
    let app = identity_app();
    register(&app, "alice", "Basic User").await;
    let token = login(&app, "alice").await;

    let reply = send(&app, Method::POST, "/validateToken", None, Some(json!({ "token": token }))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["username"], "alice");
    assert_eq!(reply.body["role"], "Basic User");
    assert!(reply.body.get("password").is_none());
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let app = identity_app();
    register(&app, "alice", "Basic User").await;

    let wrong_password = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "not-her-password" })),
    )
    .await;
    let unknown_user = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "mallory", "password": "whatever1" })),
    )
    .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.message(), unknown_user.message());
}

#[tokio::test]
async fn validate_token_rejects_missing_body_and_garbage() {
    let app = identity_app();

    let reply = send(&app, Method::POST, "/validateToken", None, None).await;
    assert_eq!(reply.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let reply = send(&app, Method::POST, "/validateToken", None, Some(json!({ "token": "garbage" }))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.message().contains("invalid"), "{}", reply.message());
}

#[tokio::test]
async fn expired_tokens_are_reported_as_expired() {
    let app = identity_app();
    register(&app, "alice", "Basic User").await;

    let keys = JwtKeys::new(&jwt_config());
    let token = keys
        .issue_at("alice", OffsetDateTime::now_utc() - Duration::hours(2))
        .unwrap();

    let reply = send(&app, Method::POST, "/validateToken", None, Some(json!({ "token": token }))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.message().contains("expired"), "{}", reply.message());
}

#[tokio::test]
async fn duplicate_username_or_email_conflicts() {
    let app = identity_app();
    register(&app, "alice", "Basic User").await;

    let reply = send(
        &app,
        Method::POST,
        "/api/users/",
        None,
        Some(json!({
            "username": "alice",
            "email_address": "other@example.com",
            "password": "secret-pw",
            "role": "Basic User"
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(
        &app,
        Method::POST,
        "/api/users/",
        None,
        Some(json!({
            "username": "alice2",
            "email_address": "alice@example.com",
            "password": "secret-pw",
            "role": "Basic User"
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_returns_location_and_schema_errors_are_400() {
    let app = identity_app();
    let reply = send(
        &app,
        Method::POST,
        "/api/users/",
        None,
        Some(json!({
            "username": "carol",
            "email_address": "carol@example.com",
            "password": "carol-password",
            "role": "Admin"
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.location(), "/api/users/carol/");

    let reply = send(
        &app,
        Method::POST,
        "/api/users/",
        None,
        Some(json!({ "username": "dave", "email_address": "dave@example.com", "role": "Admin" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.message().contains("password"));
}

#[tokio::test]
async fn username_is_immutable_and_delete_is_not_repeatable() {
    let app = identity_app();
    register(&app, "alice", "Basic User").await;

    let reply = send(
        &app,
        Method::PUT,
        "/api/users/alice/",
        None,
        Some(json!({ "username": "alicia", "email_address": "alice@example.com", "role": "Basic User" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.message(), "The username cannot be changed");

    let reply = send(
        &app,
        Method::PUT,
        "/api/users/alice/",
        None,
        Some(json!({ "username": "alice", "email_address": "alice@new.example.com", "role": "Basic User" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = send(&app, Method::GET, "/api/users/alice/", None, None).await;
    assert_eq!(reply.body["email_address"], "alice@new.example.com");

    let first = send(&app, Method::DELETE, "/api/users/alice/", None, None).await;
    let second = send(&app, Method::DELETE, "/api/users/alice/", None, None).await;
    assert_eq!(first.status, StatusCode::NO_CONTENT);
    assert_eq!(second.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tokens_of_deleted_users_stop_validating() {
    let app = identity_app();
    register(&app, "alice", "Basic User").await;
    let token = login(&app, "alice").await;

    send(&app, Method::DELETE, "/api/users/alice/", None, None).await;
    let reply = send(&app, Method::POST, "/validateToken", None, Some(json!({ "token": token }))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_is_a_no_op() {
    let app = identity_app();
    let reply = send(&app, Method::GET, "/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
}
