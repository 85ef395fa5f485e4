//! Resource-level rules applied after the gate admitted the caller.

use super::models::{Review, ReviewBody};
use crate::{error::ApiError, identity::Identity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Edit,
    Delete,
}

impl Action {
    fn phrase(self) -> (&'static str, &'static str) {
        match self {
            Action::Create => ("add", "for"),
            Action::Edit => ("edit", "of"),
            Action::Delete => ("delete", "of"),
        }
    }
}

/// An identity may act on what it owns; admins may act on anything.
pub fn may_act_on(actor: &Identity, owner: &str) -> bool {
    actor.is_admin() || actor.username == owner
}

/// `resource` is the plural noun used in the refusal, e.g. `"reviews"`.
pub fn ensure_owner(actor: &Identity, owner: &str, resource: &str, action: Action) -> Result<(), ApiError> {
    if may_act_on(actor, owner) {
        return Ok(());
    }
    let (verb, preposition) = action.phrase();
    Err(ApiError::Forbidden(format!(
        "You are not authorized to {verb} {resource} {preposition} other users"
    )))
}

/// Author and movie of a review are fixed at creation, for every role.
pub fn ensure_review_keys_unchanged(existing: &Review, update: &ReviewBody) -> Result<(), ApiError> {
    if existing.author != update.author {
        return Err(ApiError::BadRequest("The author cannot be changed".into()));
    }
    if existing.movie_id != update.movie_id {
        return Err(ApiError::BadRequest("The movie_id cannot be changed".into()));
    }
    Ok(())
}
