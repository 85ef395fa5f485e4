use std::collections::BTreeSet;

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
        hypermedia::{self, movie_href, movie_reviews_href, movies_href, review_href, user_reviews_href},
        models::MovieBody,
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
        .get_or_load(movies_href(), || async {
            let movies = state.store.list_movies().await?;
            Ok::<_, ApiError>(hypermedia::decorate_movie_list(to_json_list(&movies)?))
        })
        .await?;
    Ok(Json(doc))
}

#[instrument(skip(state, origin, body))]
pub async fn create(
    State(state): State<CatalogState>,
    origin: CallerOrigin,
    JsonBody(body): JsonBody<MovieBody>,
) -> Result<Response, ApiError> {
    let movie = state.store.insert_movie(&body).await?;
    state.cache.invalidate([movies_href()]).await;
    info!(id = movie.id, title = %movie.title, "movie created");
    created(&origin, &movie_href(movie.id))
}

#[instrument(skip(state))]
pub async fn get(State(state): State<CatalogState>, Path(id): Path<i32>) -> Result<Json<Value>, ApiError> {
    let doc = state
        .cache
        .get_or_load(movie_href(id), || async {
            let movie = state
                .store
                .find_movie(id)
                .await?
                .ok_or_else(|| ApiError::not_found("Movie", id))?;
            Ok::<_, ApiError>(hypermedia::decorate_movie(to_json(&movie)?))
        })
        .await?;
    Ok(Json(doc))
}

#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<CatalogState>,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody<MovieBody>,
) -> Result<StatusCode, ApiError> {
    if !state.store.update_movie(id, &body).await? {
        return Err(ApiError::not_found("Movie", id));
    }
    state.cache.invalidate([movies_href(), movie_href(id)]).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Also drops the movie's reviews, so every author's review list goes stale.
#[instrument(skip(state))]
pub async fn delete(State(state): State<CatalogState>, Path(id): Path<i32>) -> Result<StatusCode, ApiError> {
    let reviews = state
        .store
        .delete_movie(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", id))?;
    let authors: BTreeSet<&str> = reviews.iter().map(|r| r.author.as_str()).collect();

    let mut stale = vec![movies_href(), movie_href(id), movie_reviews_href(id)];
    stale.extend(authors.iter().map(|a| user_reviews_href(a)));
    stale.extend(reviews.iter().map(|r| review_href(id, r.id)));
    state.cache.invalidate(stale).await;
    info!(id, reviews = reviews.len(), "movie deleted");
    Ok(StatusCode::NO_CONTENT)
}
