use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::TokenKind, cookies, jwt::JwtKeys};
use crate::{error::AppError, state::AppState};

/// Identity attached to a request by [`require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Session cookie first, then `Authorization: Bearer`.
fn request_token(headers: &HeaderMap) -> Option<&str> {
    cookies::session_token(headers).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

/// Rejects the request with 401 unless it carries a valid session token.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".into()))?;

    let claims = JwtKeys::from_ref(&state)
        .verify_kind(token, TokenKind::Session)
        .map_err(|e| {
            warn!(error = %e, "invalid or expired session token");
            AppError::Unauthorized("Not authorized, token failed".into())
        })?;

    let Some(id) = claims.sub else {
        return Err(AppError::Unauthorized("Not authorized, token failed".into()));
    };
    req.extensions_mut().insert(SessionUser {
        id,
        email: claims.email,
        name: claims.name.unwrap_or_default(),
    });

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".into()))
    }
}
