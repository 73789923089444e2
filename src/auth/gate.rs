//! Per-request authentication gate.
//!
//! - no `Authorization` header: continue anonymously
//! - header without the `Bearer ` prefix: 400
//! - bearer token that is not a valid access token: 401, handler never runs
//! - valid access token: a [`Principal`] is added to the request extensions

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::errors::AuthError;
use super::types::Principal;
use crate::jwt::{JwtConfig, TokenType};

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the token out of an `Authorization` header value.
pub fn parse_bearer(value: &HeaderValue) -> Result<&str, AuthError> {
    let value = value
        .to_str()
        .map_err(|_| AuthError::BadRequest("Malformed Authorization header"))?;
    value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .ok_or(AuthError::BadRequest("Authorization header must use the Bearer scheme"))
}

/// Resolve the request's principal, if any.
fn resolve(jwt: &JwtConfig, request: &Request) -> Result<Option<Principal>, AuthError> {
    let Some(value) = request.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = parse_bearer(value)?;
    let claims = jwt.validate(token, TokenType::Access).map_err(|e| {
        debug!(error = %e, "Rejected access token");
        AuthError::InvalidToken
    })?;

    Ok(Some(Principal::from(claims)))
}

/// Middleware that authenticates bearer tokens. Layer it over every route.
pub async fn authenticate(
    State(jwt): State<Arc<JwtConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve(&jwt, &request) {
        Ok(Some(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
