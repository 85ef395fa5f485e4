//! User routes of the catalog. Records live in the identity service; these
//! handlers apply role and ownership rules, then relay the call.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Extension, Json,
};
use serde_json::Value;
use tracing::{instrument, warn};

use super::{to_json, to_json_list};
use crate::{
    catalog::{
        hypermedia::{self, user_reviews_href},
        ownership::{ensure_owner, Action},
        proxy::{forward, CallerOrigin},
    },
    error::ApiError,
    extract::JsonBody,
    identity::{dto::NewUser, dto::UserUpdate, Identity, Role},
    state::CatalogState,
};

#[instrument(skip(state, origin))]
pub async fn list(State(state): State<CatalogState>, origin: CallerOrigin) -> Result<Response, ApiError> {
    let url = state.identity.users_url(None);
    forward(
        &origin,
        state.identity.base(),
        state.identity.get(url),
        Some(hypermedia::decorate_user_list),
    )
    .await
}

/// Anyone may register a basic user; creating an admin takes an admin.
#[instrument(skip(state, origin, headers, body))]
pub async fn create(
    State(state): State<CatalogState>,
    origin: CallerOrigin,
    headers: HeaderMap,
    JsonBody(body): JsonBody<NewUser>,
) -> Result<Response, ApiError> {
    if body.role == Role::Admin {
        state.gate(Role::Admin).check(&headers).await?;
    }
    let url = state.identity.users_url(None);
    forward(&origin, state.identity.base(), state.identity.post_json(url, &body), None).await
}

#[instrument(skip(state, origin))]
pub async fn get(
    State(state): State<CatalogState>,
    origin: CallerOrigin,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let url = state.identity.users_url(Some(&username));
    forward(
        &origin,
        state.identity.base(),
        state.identity.get(url),
        Some(hypermedia::decorate_user),
    )
    .await
}

#[instrument(skip(state, origin, actor, body), fields(actor = %actor.username))]
pub async fn update(
    State(state): State<CatalogState>,
    origin: CallerOrigin,
    Path(username): Path<String>,
    Extension(actor): Extension<Identity>,
    JsonBody(body): JsonBody<UserUpdate>,
) -> Result<Response, ApiError> {
    ensure_owner(&actor, &username, "profiles", Action::Edit)?;
    if !actor.is_admin() && body.role != actor.role {
        return Err(ApiError::Forbidden(
            "You are not authorized to change your own role".into(),
        ));
    }
    let url = state.identity.users_url(Some(&username));
    forward(&origin, state.identity.base(), state.identity.put_json(url, &body), None).await
}

#[instrument(skip(state, origin, actor), fields(actor = %actor.username))]
pub async fn delete(
    State(state): State<CatalogState>,
    origin: CallerOrigin,
    Path(username): Path<String>,
    Extension(actor): Extension<Identity>,
) -> Result<Response, ApiError> {
    ensure_owner(&actor, &username, "profiles", Action::Delete)?;
    let url = state.identity.users_url(Some(&username));
    let res = forward(&origin, state.identity.base(), state.identity.delete(url), None).await?;
    if res.status().is_success() {
        state.cache.invalidate([user_reviews_href(&username)]).await;
    }
    Ok(res)
}

/// Reviews written by `username`, who must exist in the identity service.
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<CatalogState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let href = user_reviews_href(&username);
    if let Some(hit) = state.cache.get(&href).await {
        return Ok(Json(hit));
    }

    let res = state
        .identity
        .get(state.identity.users_url(Some(&username)))
        .await
        .map_err(|e| {
            warn!(error = %e, "identity service call failed");
            ApiError::GatewayTimeout("The identity service could not be reached".into())
        })?;
    match res.status() {
        s if s.is_success() => {}
        StatusCode::NOT_FOUND => return Err(ApiError::not_found("User", &username)),
        other => {
            return Err(ApiError::Internal(anyhow::anyhow!(
                "identity service answered {other} for user lookup"
            )))
        }
    }

    let reviews = state.store.list_reviews_by_author(&username).await?;
    let doc = hypermedia::decorate_review_list(to_json_list(&reviews)?, href.clone(), None);
    state.cache.put(href, doc.clone()).await;
    Ok(Json(doc))
}

/// The identity the gate resolved for this request.
#[instrument(skip(actor), fields(actor = %actor.username))]
pub async fn current(Extension(actor): Extension<Identity>) -> Result<Json<Value>, ApiError> {
    Ok(Json(hypermedia::decorate_user(to_json(&actor)?)))
}
