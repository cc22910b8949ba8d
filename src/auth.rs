use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    error::AppError,
    session::{SessionState, token_from_headers},
};

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers that mutate state take
/// this as an argument and use `id` as the acting user.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    /// The user bound to the request's session token.
    pub id: Uuid,
}

/// AuthUser Extractor Implementation
///
/// 1. Reads the `photo_sid` cookie.
/// 2. Resolves it through the shared `SessionAuthority`.
///
/// Rejection: `AppError::Auth` (401) when the cookie is missing, unknown or expired.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);

        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::auth("Unauthorized"))?;

        let id = sessions
            .resolve(&token)
            .ok_or_else(|| AppError::auth("Unauthorized"))?;

        Ok(AuthUser { id })
    }
}

/// MaybeAuthUser
///
/// Viewer identity for reads that also serve anonymous callers. Never rejects.
#[derive(Debug, Clone, PartialEq)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(
            AuthUser::from_request_parts(parts, state).await.ok(),
        ))
    }
}
