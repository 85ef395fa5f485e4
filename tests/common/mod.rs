#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use moviereview::{
    app,
    catalog::memory::MemoryCatalogStore,
    config::{CatalogConfig, IdentityConfig, JwtConfig, StoreKind},
    identity::memory::MemoryUserStore,
    state::{CatalogState, IdentityState},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;

pub const SECRET: &str = "integration-test-secret";

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: SECRET.into(),
        issuer: "moviereview-identity".into(),
        ttl_minutes: 60,
    }
}

pub fn identity_app() -> Router {
    let config = IdentityConfig {
        store: StoreKind::Memory,
        database_url: String::new(),
        jwt: jwt_config(),
    };
    let state = IdentityState::from_parts(Arc::new(config), Arc::new(MemoryUserStore::new()));
    app::build_identity_app(state)
}

/// Serves a fresh identity provider on an ephemeral port.
pub async fn spawn_identity() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, identity_app()).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// A url nothing listens on.
pub fn closed_port_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/")).unwrap()
}

pub fn catalog_app(identity_url: Url) -> Router {
    let config = CatalogConfig {
        store: StoreKind::Memory,
        database_url: String::new(),
        identity_url,
        identity_timeout_secs: 2,
        cache_ttl_secs: 60,
    };
    let state = CatalogState::from_parts(Arc::new(config), Arc::new(MemoryCatalogStore::new())).unwrap();
    app::build_catalog_app(state)
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "catalog.test");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    let req = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Reply { status, headers, body }
}

pub async fn register(app: &Router, username: &str, role: &str) {
    let reply = send(
        app,
        Method::POST,
        "/api/users/",
        None,
        Some(json!({
            "username": username,
            "email_address": format!("{username}@example.com"),
            "password": format!("{username}-password"),
            "role": role,
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "register {username}: {:?}", reply.body);
}

pub async fn login(app: &Router, username: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": username, "password": format!("{username}-password") })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "login {username}: {:?}", reply.body);
    reply.body["token"].as_str().unwrap().to_string()
}

/// Logs in against a running identity provider.
pub async fn login_remote(identity: &Url, username: &str) -> String {
    let res = reqwest::Client::new()
        .post(identity.join("login").unwrap())
        .json(&json!({ "username": username, "password": format!("{username}-password") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Creates a user straight on the identity provider, bypassing the catalog.
pub async fn register_remote(identity: &Url, username: &str, role: &str) {
    let res = reqwest::Client::new()
        .post(identity.join("api/users/").unwrap())
        .json(&json!({
            "username": username,
            "email_address": format!("{username}@example.com"),
            "password": format!("{username}-password"),
            "role": role,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}
