use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// Schema checks applied to a decoded request body. The message names the
/// first violation found.
pub trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// JSON request body that rejects non-JSON content with `415` and schema
/// mismatches with `400`.
pub struct JsonBody<T>(pub T);

fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence.eq_ignore_ascii_case("application/json")
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(is_json)
            .unwrap_or(false);
        if !json {
            return Err(ApiError::UnsupportedMediaType);
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::UnsupportedMediaType)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::UnsupportedMediaType);
        }

        let value: T = serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "request body rejected");
            ApiError::Validation(e.to_string())
        })?;
        value.validate().map_err(ApiError::Validation)?;
        Ok(JsonBody(value))
    }
}
