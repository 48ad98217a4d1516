use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;

use crate::{auth::jwt::TokenService, error::AppError};

/// Extracts and validates the bearer token, returning the user ID.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenService>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::Authentication("authorization header is required".into()))?;

        // Expect "Bearer <token>"
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("invalid token format".into()))?;

        let user_id = tokens.resolve_user_id(token.trim())?;
        Ok(AuthUser(user_id))
    }
}
