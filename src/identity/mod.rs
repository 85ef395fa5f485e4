//! Identity provider: owns user records, issues tokens on login and
//! resolves tokens back to identities.

use crate::state::IdentityState;
use axum::Router;

mod claims;
pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod repo;
pub mod services;

pub use dto::{Identity, Role};

pub fn router() -> Router<IdentityState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::user_routes())
}
