use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Extension, Json,
};
use serde_json::Value;
use tracing::{info, instrument};

use super::{created, to_json, to_json_list};
use crate::{
    catalog::{
        hypermedia::{self, movie_reviews_href, review_href, user_reviews_href},
        models::{Review, ReviewBody},
        ownership::{ensure_owner, ensure_review_keys_unchanged, Action},
        proxy::CallerOrigin,
    },
    error::ApiError,
    extract::JsonBody,
    identity::Identity,
    state::CatalogState,
};

async fn require_movie(state: &CatalogState, movie_id: i32) -> Result<(), ApiError> {
    match state.store.find_movie(movie_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("Movie", movie_id)),
    }
}

/// The review `id`, provided it belongs to `movie_id`.
async fn find_nested(state: &CatalogState, movie_id: i32, id: i32) -> Result<Review, ApiError> {
    state
        .store
        .find_review(id)
        .await?
        .filter(|r| r.movie_id == movie_id)
        .ok_or_else(|| ApiError::not_found("Review", id))
}

async fn invalidate_review(state: &CatalogState, review: &Review) {
    state
        .cache
        .invalidate([
            movie_reviews_href(review.movie_id),
            review_href(review.movie_id, review.id),
            user_reviews_href(&review.author),
        ])
        .await;
}

#[instrument(skip(state))]
pub async fn list_for_movie(
    State(state): State<CatalogState>,
    Path(movie_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let href = movie_reviews_href(movie_id);
    let doc = state
        .cache
        .get_or_load(href.clone(), || async {
            require_movie(&state, movie_id).await?;
            let reviews = state.store.list_reviews_for_movie(movie_id).await?;
            Ok::<_, ApiError>(hypermedia::decorate_review_list(
                to_json_list(&reviews)?,
                href.clone(),
                Some(href.clone()),
            ))
        })
        .await?;
    Ok(Json(doc))
}

#[instrument(skip(state, origin, actor, body), fields(actor = %actor.username))]
pub async fn create(
    State(state): State<CatalogState>,
    Path(movie_id): Path<i32>,
    Extension(actor): Extension<Identity>,
    origin: CallerOrigin,
    JsonBody(body): JsonBody<ReviewBody>,
) -> Result<Response, ApiError> {
    require_movie(&state, movie_id).await?;
    if body.movie_id != movie_id {
        return Err(ApiError::BadRequest(
            "The movie_id of the review does not match the movie in the path".into(),
        ));
    }
    ensure_owner(&actor, &body.author, "reviews", Action::Create)?;

    let review = state.store.insert_review(&body).await?;
    invalidate_review(&state, &review).await;
    info!(id = review.id, movie_id, author = %review.author, "review created");
    created(&origin, &review_href(movie_id, review.id))
}

#[instrument(skip(state))]
pub async fn get(
    State(state): State<CatalogState>,
    Path((movie_id, id)): Path<(i32, i32)>,
) -> Result<Json<Value>, ApiError> {
    let doc = state
        .cache
        .get_or_load(review_href(movie_id, id), || async {
            let review = find_nested(&state, movie_id, id).await?;
            Ok::<_, ApiError>(hypermedia::decorate_review(to_json(&review)?))
        })
        .await?;
    Ok(Json(doc))
}

#[instrument(skip(state, actor, body), fields(actor = %actor.username))]
pub async fn update(
    State(state): State<CatalogState>,
    Path((movie_id, id)): Path<(i32, i32)>,
    Extension(actor): Extension<Identity>,
    JsonBody(body): JsonBody<ReviewBody>,
) -> Result<StatusCode, ApiError> {
    let existing = find_nested(&state, movie_id, id).await?;
    ensure_owner(&actor, &existing.author, "reviews", Action::Edit)?;
    ensure_review_keys_unchanged(&existing, &body)?;

    if !state.store.update_review(id, &body).await? {
        return Err(ApiError::not_found("Review", id));
    }
    invalidate_review(&state, &existing).await;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, actor), fields(actor = %actor.username))]
pub async fn delete(
    State(state): State<CatalogState>,
    Path((movie_id, id)): Path<(i32, i32)>,
    Extension(actor): Extension<Identity>,
) -> Result<StatusCode, ApiError> {
    let existing = find_nested(&state, movie_id, id).await?;
    ensure_owner(&actor, &existing.author, "reviews", Action::Delete)?;

    if !state.store.delete_review(id).await? {
        return Err(ApiError::not_found("Review", id));
    }
    invalidate_review(&state, &existing).await;
    info!(id, movie_id, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}
