//! Catalog backend: movies, categories and reviews, plus the user routes
//! relayed to the identity service. Protected routes carry an explicit
//! [`gate::Gate`] layer naming the role they need.

use axum::{
    middleware,
    routing::{get, post, put, MethodRouter},
    Router,
};

use crate::{identity::Role, state::CatalogState};

pub mod cache;
pub mod gate;
pub mod handlers;
pub mod hypermedia;
pub mod identity_client;
pub mod memory;
pub mod models;
pub mod ownership;
pub mod proxy;
pub mod repo;

fn guarded(state: &CatalogState, role: Role, route: MethodRouter<CatalogState>) -> MethodRouter<CatalogState> {
    route.route_layer(middleware::from_fn_with_state(state.gate(role), gate::authorize))
}

pub fn router(state: &CatalogState) -> Router<CatalogState> {
    use handlers::{categories, movies, reviews, users};

    let admin = |route| guarded(state, Role::Admin, route);
    let member = |route| guarded(state, Role::BasicUser, route);

    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/api/categories/",
            get(categories::list).merge(admin(post(categories::create))),
        )
        .route(
            "/api/categories/:id/",
            get(categories::get).merge(admin(put(categories::update).delete(categories::delete))),
        )
        .route(
            "/api/movies/",
            get(movies::list).merge(admin(post(movies::create))),
        )
        .route(
            "/api/movies/:id/",
            get(movies::get).merge(admin(put(movies::update).delete(movies::delete))),
        )
        .route(
            "/api/movies/:movie_id/reviews/",
            get(reviews::list_for_movie).merge(member(post(reviews::create))),
        )
        .route(
            "/api/movies/:movie_id/reviews/:id/",
            get(reviews::get).merge(member(put(reviews::update).delete(reviews::delete))),
        )
        .route(
            "/api/users/",
            admin(get(users::list)).merge(post(users::create)),
        )
        .route(
            "/api/users/:username/",
            member(get(users::get).put(users::update).delete(users::delete)),
        )
        .route("/api/users/:username/reviews/", get(users::reviews))
        .route("/api/current-user/", member(get(users::current)))
}
