mod admin;
mod auth;
mod error;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, parse_json};
pub use users::ProfileResponse;

/// Create the HTTP router for the token and user endpoints.
pub fn create_api_router(
    db: Database,
    service: TokenService,
    secure_cookies: bool,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        service: service.clone(),
        secure_cookies,
    };

    let users_state = users::UsersState {
        db: db.clone(),
        service: service.clone(),
    };

    let admin_state = admin::AdminState { db, service };

    Router::new()
        .merge(auth::router(auth_state, rate_limit))
        .nest("/api/user", users::router(users_state))
        .nest("/api/admin", admin::router(admin_state))
}
