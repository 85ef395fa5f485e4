//! Movie-review catalog: an identity provider issuing signed tokens and a
//! catalog backend that validates them on every protected request.

pub mod app;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod identity;
pub mod state;
pub mod store;
