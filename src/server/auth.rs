use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::GatewayState;
use crate::error::{GatewayError, Result};
use crate::session::SessionId;

/// Session identifier resolved from an `Authorization: Bearer <token>` header.
///
/// Only the token is checked here; whether the session still exists is
/// decided by the operation that uses it.
#[derive(Debug, Clone, Copy)]
pub struct SessionAuth(pub SessionId);

impl FromRequestParts<GatewayState> for SessionAuth {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let id = state.codec.resolve(token)?;
        Ok(Self(id))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| GatewayError::invalid_credential("Missing Authorization header"))?
        .to_str()
        .map_err(|_| GatewayError::invalid_credential("Malformed Authorization header"))?
        .trim();

    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| GatewayError::invalid_credential("Expected a Bearer token"))
}
