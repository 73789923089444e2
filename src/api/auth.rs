//! Token endpoints.
//!
//! - POST `/login` - Exchange username and password for a token pair
//! - POST `/jwt/refresh` - Rotate a refresh token into a new pair
//! - POST `/jwt/exchange` - Trade the social login cookie for a pair
//! - POST `/logout` - Revoke a refresh token and clear the bridge cookie

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::parse_json;
use crate::auth::{
    AuthError, REFRESH_COOKIE_NAME, TokenService, clear_refresh_cookie, get_cookie,
};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct AuthState {
    pub service: TokenService,
    pub secure_cookies: bool,
}

pub fn router(state: AuthState, rate_limit: Arc<RateLimitConfig>) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_login));

    Router::new()
        .route("/jwt/refresh", post(refresh))
        .route("/jwt/exchange", post(exchange))
        .route("/logout", post(logout))
        .with_state(state)
        .merge(login_router)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn login(
    State(state): State<AuthState>,
    body: Bytes,
) -> Result<impl IntoResponse, AuthError> {
    let request: LoginRequest = parse_json(&body)?;
    let pair = state
        .service
        .login(request.username.trim(), &request.password)
        .await?;
    Ok(Json(pair))
}

async fn refresh(
    State(state): State<AuthState>,
    body: Bytes,
) -> Result<impl IntoResponse, AuthError> {
    let request: RefreshRequest = parse_json(&body)?;
    let pair = state.service.rotate(&request.refresh_token).await?;
    Ok(Json(pair))
}

/// The social login success redirect leaves the refresh token in a cookie.
/// Rotate it and hand the pair over in the body. The cookie is cleared
/// whatever the outcome.
async fn exchange(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let clear = [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))];

    let Some(token) = get_cookie(&headers, REFRESH_COOKIE_NAME).filter(|t| !t.is_empty()) else {
        return (clear, AuthError::NotAuthenticated).into_response();
    };

    match state.service.rotate(token).await {
        Ok(pair) => (StatusCode::OK, clear, Json(pair)).into_response(),
        Err(e) => (clear, e).into_response(),
    }
}

async fn logout(
    State(state): State<AuthState>,
    body: Bytes,
) -> Result<impl IntoResponse, AuthError> {
    let request: RefreshRequest = parse_json(&body)?;
    state.service.logout(&request.refresh_token).await?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))],
        Json(MessageResponse {
            message: "Logout successful",
        }),
    ))
}
