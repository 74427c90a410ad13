//! Bearer-token scope enforcement, delegated to `IdentityService`
//! (spec.md §6: "Authorization: every request carries `Authorization:
//! Bearer <token>`. Scopes are verified against the token's claim set").

use axum::http::HeaderMap;
use stormstack_tokens::IdentityService;

use crate::error::ApiError;

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let raw = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::forbidden("missing Authorization header"))?;

    raw.strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::forbidden("Authorization header is not a Bearer token"))
}

pub async fn require_scope(
    identity: &dyn IdentityService,
    headers: &HeaderMap,
    scope: &str,
) -> Result<(), ApiError> {
    let token = bearer_token(headers)?;
    identity.verify_scope(token, scope).await?;
    Ok(())
}
