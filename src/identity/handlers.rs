use axum::{
    extract::{Path, State},
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{Identity, LoginRequest, NewUser, TokenResponse, UserUpdate, ValidateTokenRequest},
    services,
};
use crate::{error::ApiError, extract::JsonBody, state::IdentityState};

pub fn auth_routes() -> Router<IdentityState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/validateToken", post(validate_token))
}

pub fn user_routes() -> Router<IdentityState> {
    Router::new()
        .route("/api/users/", get(list_users).post(create_user))
        .route(
            "/api/users/:username/",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<IdentityState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = services::login(state.users.as_ref(), &state.keys, &payload).await?;
    Ok(Json(TokenResponse { token }))
}

/// Tokens are stateless; logging out is up to the client.
pub async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[instrument(skip(state, payload))]
pub async fn validate_token(
    State(state): State<IdentityState>,
    JsonBody(payload): JsonBody<ValidateTokenRequest>,
) -> Result<Json<Identity>, ApiError> {
    let identity = services::validate_token(state.users.as_ref(), &state.keys, &payload.token).await?;
    Ok(Json(identity))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<IdentityState>) -> Result<Json<Vec<Identity>>, ApiError> {
    Ok(Json(services::list_users(state.users.as_ref()).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<IdentityState>,
    JsonBody(payload): JsonBody<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = services::create_user(state.users.as_ref(), payload).await?;
    let location = HeaderValue::from_str(&format!("/api/users/{}/", identity.username))
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok((StatusCode::CREATED, [(LOCATION, location)]))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<IdentityState>,
    Path(username): Path<String>,
) -> Result<Json<Identity>, ApiError> {
    Ok(Json(services::get_user(state.users.as_ref(), &username).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<IdentityState>,
    Path(username): Path<String>,
    JsonBody(payload): JsonBody<UserUpdate>,
) -> Result<StatusCode, ApiError> {
    services::update_user(state.users.as_ref(), &username, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<IdentityState>,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    services::delete_user(state.users.as_ref(), &username).await?;
    Ok(StatusCode::NO_CONTENT)
}
