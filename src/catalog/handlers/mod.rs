use axum::{
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::{hypermedia, proxy::CallerOrigin};
use crate::error::ApiError;

pub mod categories;
pub mod movies;
pub mod reviews;
pub mod users;

/// `GET /`
pub async fn index() -> Json<Value> {
    Json(hypermedia::entry_point())
}

/// `201 Created` with `Location` set to `href` on the caller's origin.
pub(crate) fn created(origin: &CallerOrigin, href: &str) -> Result<Response, ApiError> {
    let url = origin
        .0
        .join(href)
        .map_err(|e| ApiError::Internal(e.into()))?;
    let location = HeaderValue::from_str(url.as_str()).map_err(|e| ApiError::Internal(e.into()))?;
    Ok((StatusCode::CREATED, [(LOCATION, location)]).into_response())
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.into()))
}

pub(crate) fn to_json_list<T: Serialize>(values: &[T]) -> Result<Vec<Value>, ApiError> {
    values.iter().map(to_json).collect()
}
