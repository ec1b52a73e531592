use crate::error::ApiError;
use crate::models::{Role, User};
use crate::repository::RepositoryState;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

/// bearer_token
///
/// Pulls the opaque token out of an `Authorization: Bearer <token>` header.
/// Returns `None` for a missing header, a non-Bearer scheme, or a bare
/// `Bearer` with nothing after it.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let rest = value.strip_prefix("Bearer ")?;
    let token = rest.split_whitespace().next()?;
    if token.is_empty() { None } else { Some(token) }
}

/// AdminUser
///
/// Request guard for admin-only routes. Extraction resolves the bearer token
/// through the repository and checks the role; any failure along the way
/// (no header, unknown token, non-admin role) rejects with the same 403 so
/// callers cannot probe which stage failed. Because extraction runs before
/// the handler body, a rejected request never has its payload read.
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    RepositoryState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repository = RepositoryState::from_ref(state);

        let token = bearer_token(&parts.headers).ok_or(ApiError::Forbidden)?;
        let user = repository
            .find_by_token(token)
            .await
            .ok_or(ApiError::Forbidden)?;

        if user.rol != Role::Admin {
            return Err(ApiError::Forbidden);
        }

        Ok(AdminUser(user))
    }
}
