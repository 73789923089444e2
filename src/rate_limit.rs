//! Rate limiting for the password login endpoint.
//!
//! Token bucket per client IP to slow down credential guessing.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Bucket shared by requests whose address cannot be determined.
const UNKNOWN_CLIENT: &str = "unknown";

/// Login quota: `per_second` replenishment with a `burst` allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginQuota {
    pub per_second: NonZeroU32,
    pub burst: NonZeroU32,
}

impl Default for LoginQuota {
    fn default() -> Self {
        Self {
            per_second: NonZeroU32::MIN,
            burst: NonZeroU32::new(5).unwrap_or(NonZeroU32::MIN),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
    pub trust_forwarded_for: bool,
}

impl RateLimitConfig {
    pub fn new(quota: LoginQuota, trust_forwarded_for: bool) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(quota.per_second).allow_burst(quota.burst),
            )),
            trust_forwarded_for,
        }
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = extract_client_ip(
        request.headers(),
        request.extensions(),
        config.trust_forwarded_for,
    )
    .map(|ip| ip.to_string())
    .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    match config.login.check_key(&key) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(client = %key, "Login rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "Too many login attempts. Please wait before trying again." })),
            )
                .into_response()
        }
    }
}
