use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::Value;
use tracing::{info, instrument};

use super::{created, to_json, to_json_list};
use crate::{
    catalog::{
        hypermedia::{self, categories_href, category_href},
        models::CategoryBody,
        proxy::CallerOrigin,
    },
    error::ApiError,
    extract::JsonBody,
    state::CatalogState,
};

#[instrument(skip(state))]
pub async fn list(State(state): State<CatalogState>) -> Result<Json<Value>, ApiError> {
    let doc = state
        .cache
        .get_or_load(categories_href(), || async {
            let categories = state.store.list_categories().await?;
            Ok::<_, ApiError>(hypermedia::decorate_category_list(to_json_list(&categories)?))
        })
        .await?;
    Ok(Json(doc))
}

#[instrument(skip(state, origin, body))]
pub async fn create(
    State(state): State<CatalogState>,
    origin: CallerOrigin,
    JsonBody(body): JsonBody<CategoryBody>,
) -> Result<Response, ApiError> {
    let category = state.store.insert_category(&body).await?;
    state.cache.invalidate([categories_href()]).await;
    info!(id = category.id, "category created");
    created(&origin, &category_href(category.id))
}

#[instrument(skip(state))]
pub async fn get(State(state): State<CatalogState>, Path(id): Path<i32>) -> Result<Json<Value>, ApiError> {
    let doc = state
        .cache
        .get_or_load(category_href(id), || async {
            let category = state
                .store
                .find_category(id)
                .await?
                .ok_or_else(|| ApiError::not_found("Category", id))?;
            Ok::<_, ApiError>(hypermedia::decorate_category(to_json(&category)?))
        })
        .await?;
    Ok(Json(doc))
}

#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<CatalogState>,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody<CategoryBody>,
) -> Result<StatusCode, ApiError> {
    if !state.store.update_category(id, &body).await? {
        return Err(ApiError::not_found("Category", id));
    }
    state.cache.invalidate([categories_href(), category_href(id)]).await;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete(State(state): State<CatalogState>, Path(id): Path<i32>) -> Result<StatusCode, ApiError> {
    if !state.store.delete_category(id).await? {
        return Err(ApiError::not_found("Category", id));
    }
    state.cache.invalidate([categories_href(), category_href(id)]).await;
    info!(id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}
