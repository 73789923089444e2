pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod clock;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod social;

use api::create_api_router;
use auth::{TokenService, authenticate};
use axum::{Router, middleware};
use cleanup::CleanupSchedule;
use clock::Clock;
use db::Database;
use jwt::{JwtConfig, TokenConfig};
use rate_limit::{LoginQuota, RateLimitConfig};
use std::sync::Arc;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing secret and token lifetimes
    pub tokens: TokenConfig,
    /// Time source for token expiry, record timestamps and the cleanup schedule
    pub clock: Arc<dyn Clock>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Trust the first `X-Forwarded-For` entry (only behind a proxy that sets it)
    pub trust_forwarded_for: bool,
    pub login_quota: LoginQuota,
    pub cleanup: CleanupSchedule,
}

impl ServerConfig {
    /// A lifecycle service over this configuration, for callers outside the
    /// router such as the social login success handler.
    pub fn token_service(&self) -> TokenService {
        let jwt = Arc::new(JwtConfig::new(&self.tokens, self.clock.clone()));
        TokenService::new(self.db.clone(), jwt)
    }
}

/// Create the application router with the given configuration.
///
/// The authentication gate runs in front of every route.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.tokens, config.clock.clone()));
    let service = TokenService::new(config.db.clone(), jwt.clone());

    let rate_limit = Arc::new(RateLimitConfig::new(
        config.login_quota,
        config.trust_forwarded_for,
    ));

    create_api_router(
        config.db.clone(),
        service,
        config.secure_cookies,
        rate_limit,
    )
    .layer(middleware::from_fn_with_state(jwt, authenticate))
}

/// Run one cleanup pass and spawn the background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(config: &ServerConfig) -> tokio::task::JoinHandle<()> {
    cleanup::run_cleanup(
        &config.db,
        config.clock.as_ref(),
        config.cleanup.retention_secs,
    )
    .await;
    cleanup::spawn_cleanup_scheduler(config.db.clone(), config.clock.clone(), config.cleanup)
}
