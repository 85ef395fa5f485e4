use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::{error::ErrorBody, identity::Identity};

/// Why a token could not be resolved to an identity.
#[derive(Debug, thiserror::Error)]
pub enum ValidationFailure {
    /// The identity service answered and refused the token.
    #[error("{0}")]
    Rejected(String),
    #[error("identity service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("unexpected identity service response: {0}")]
    Unexpected(String),
}

/// Resolves bearer tokens to identities.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<Identity, ValidationFailure>;
}

/// HTTP client for the identity provider. Every call is bounded by the
/// configured timeout and never retried.
#[derive(Clone)]
pub struct IdentityClient {
    http: Client,
    base: Url,
}

impl IdentityClient {
    pub fn new(base: Url, timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !base.cannot_be_a_base(),
            "identity url {base} cannot be used as a base"
        );
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("failed to build identity http client")?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `base` with `segments` appended to its path.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `/api/users/` or `/api/users/<username>/` on the identity provider.
    pub fn users_url(&self, username: Option<&str>) -> Url {
        match username {
            Some(name) => self.endpoint(&["api", "users", name, ""]),
            None => self.endpoint(&["api", "users", ""]),
        }
    }

    pub async fn get(&self, url: Url) -> reqwest::Result<Response> {
        self.http.get(url).send().await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> reqwest::Result<Response> {
        self.http.post(url).json(body).send().await
    }

    pub async fn put_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> reqwest::Result<Response> {
        self.http.put(url).json(body).send().await
    }

    pub async fn delete(&self, url: Url) -> reqwest::Result<Response> {
        self.http.delete(url).send().await
    }
}

#[async_trait]
impl TokenValidator for IdentityClient {
    async fn validate(&self, token: &str) -> Result<Identity, ValidationFailure> {
        let url = self.endpoint(&["validateToken"]);
        let res = self
            .post_json(url, &serde_json::json!({ "token": token }))
            .await
            .map_err(ValidationFailure::Unreachable)?;

        match res.status() {
            StatusCode::OK => res
                .json::<Identity>()
                .await
                .map_err(|e| ValidationFailure::Unexpected(e.to_string())),
            StatusCode::UNAUTHORIZED => {
                let message = res
                    .json::<ErrorBody>()
                    .await
                    .map(|b| b.message)
                    .unwrap_or_else(|_| "Unauthorized".to_string());
                debug!(%message, "token rejected by identity service");
                Err(ValidationFailure::Rejected(message))
            }
            other => Err(ValidationFailure::Unexpected(format!("status {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> IdentityClient {
        IdentityClient::new(Url::parse(base).unwrap(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn endpoints_are_joined_onto_the_base_path() {
        let c = client("http://idp.internal:5001/");
        assert_eq!(c.endpoint(&["validateToken"]).as_str(), "http://idp.internal:5001/validateToken");
        assert_eq!(c.users_url(None).as_str(), "http://idp.internal:5001/api/users/");

        let c = client("http://gateway/identity");
        assert_eq!(c.endpoint(&["login"]).as_str(), "http://gateway/identity/login");
    }

    #[test]
    fn usernames_are_percent_encoded() {
        let c = client("http://idp/");
        assert_eq!(c.users_url(Some("a/b c")).as_str(), "http://idp/api/users/a%2Fb%20c/");
    }

    #[test]
    fn opaque_urls_are_rejected() {
        assert!(IdentityClient::new(Url::parse("mailto:ops@example.com").unwrap(), Duration::from_secs(1)).is_err());
    }
}
