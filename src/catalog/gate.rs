use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::identity_client::{TokenValidator, ValidationFailure};
use crate::{
    error::ApiError,
    identity::{Identity, Role},
};

/// Guards a route: resolves the caller's token through the identity
/// service and requires at least `required`. The resolved [`Identity`] is
/// placed in the request extensions for the handler.
#[derive(Clone)]
pub struct Gate {
    validator: Arc<dyn TokenValidator>,
    required: Role,
}

impl Gate {
    pub fn new(validator: Arc<dyn TokenValidator>, required: Role) -> Self {
        Self { validator, required }
    }

    /// Runs the whole check against the request headers. The identity
    /// service is not contacted when no token is present.
    pub async fn check(&self, headers: &HeaderMap) -> Result<Identity, ApiError> {
        let token = bearer_token(headers)
            .ok_or_else(|| ApiError::Unauthorized("The Authentication header is missing".into()))?;

        let identity = self.validator.validate(token).await.map_err(|e| match e {
            ValidationFailure::Rejected(message) => ApiError::Unauthorized(message),
            ValidationFailure::Unreachable(err) => {
                warn!(error = %err, "identity service unreachable, denying request");
                ApiError::Unauthorized("The identity service could not be reached".into())
            }
            ValidationFailure::Unexpected(detail) => {
                warn!(%detail, "unexpected answer from identity service, denying request");
                ApiError::Unauthorized("The authentication token could not be validated".into())
            }
        })?;

        if !identity.role.satisfies(self.required) {
            debug!(username = %identity.username, role = %identity.role, required = %self.required, "insufficient role");
            return Err(ApiError::Forbidden(format!(
                "This operation requires the role '{}'",
                self.required
            )));
        }
        Ok(identity)
    }
}

/// The raw `Authorization` value; a leading `Bearer ` is tolerated.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match raw.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(' ') => rest.trim(),
        _ => raw,
    };
    (!token.is_empty()).then_some(token)
}

/// Middleware form of [`Gate::check`], composed per route with
/// `middleware::from_fn_with_state(gate, authorize)`.
pub async fn authorize(State(gate): State<Gate>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let identity = gate.check(req.headers()).await?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
