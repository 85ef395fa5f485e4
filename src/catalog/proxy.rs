use std::future::Future;

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{
        header::{CONTENT_TYPE, HOST, LOCATION},
        request::Parts,
        HeaderValue,
    },
    response::Response,
};
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::ApiError;

/// Scheme and host the caller used to reach us, e.g. `https://api.example.com/`.
#[derive(Debug, Clone)]
pub struct CallerOrigin(pub Url);

#[async_trait]
impl<S> FromRequestParts<S> for CallerOrigin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.scheme_str())
            .unwrap_or("http");
        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        let origin = Url::parse(&format!("{scheme}://{host}/"))
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .filter(|u| u.path() == "/" && u.query().is_none() && u.username().is_empty())
            .ok_or_else(|| ApiError::BadRequest("The Host header is invalid".into()))?;
        Ok(CallerOrigin(origin))
    }
}

/// Maps an upstream `Location` onto the caller's origin, keeping only the
/// path and query of the upstream target. A path prefix on the upstream base
/// is dropped, so the result names the catalog route.
pub fn rewrite_location(origin: &Url, upstream_base: &Url, location: &str) -> Option<Url> {
    let target = upstream_base.join(location).ok()?;
    let prefix = upstream_base.path().trim_end_matches('/');
    let path = match target.path().strip_prefix(prefix) {
        Some(rest) if rest.starts_with('/') => rest,
        _ => target.path(),
    };
    let mut out = origin.clone();
    out.set_path(path);
    out.set_query(target.query());
    out.set_fragment(None);
    Some(out)
}

fn is_json(value: Option<&HeaderValue>) -> bool {
    value
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Relays one upstream call. Status and content type pass through; a
/// successful JSON body runs through `decorate`; `Location` is moved onto
/// the caller's origin. Connection failures become `504`.
pub async fn forward<F>(
    origin: &CallerOrigin,
    upstream_base: &Url,
    call: F,
    decorate: Option<fn(Value) -> Value>,
) -> Result<Response, ApiError>
where
    F: Future<Output = reqwest::Result<reqwest::Response>>,
{
    let upstream = call.await.map_err(upstream_failed)?;
    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();
    let location = upstream
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mut body: Bytes = upstream.bytes().await.map_err(upstream_failed)?;

    if let Some(decorate) = decorate {
        if status.as_u16() < 300 && is_json(content_type.as_ref()) {
            match serde_json::from_slice::<Value>(&body) {
                Ok(value) => {
                    let json = serde_json::to_vec(&decorate(value)).map_err(|e| ApiError::Internal(e.into()))?;
                    body = Bytes::from(json);
                }
                Err(e) => debug!(error = %e, "upstream body is not valid json, relaying as is"),
            }
        }
    }

    let mut builder = Response::builder().status(status);
    if let Some(ct) = content_type {
        builder = builder.header(CONTENT_TYPE, ct);
    }
    if let Some(raw) = location {
        match rewrite_location(&origin.0, upstream_base, &raw) {
            Some(url) => {
                let value = HeaderValue::from_str(url.as_str()).map_err(|e| ApiError::Internal(e.into()))?;
                builder = builder.header(LOCATION, value);
            }
            None => warn!(location = %raw, "dropping unparsable upstream location"),
        }
    }
    builder
        .body(Body::from(body))
        .map_err(|e| ApiError::Internal(e.into()))
}

fn upstream_failed(err: reqwest::Error) -> ApiError {
    warn!(error = %err, "identity service call failed");
    ApiError::GatewayTimeout("The identity service could not be reached".into())
}
