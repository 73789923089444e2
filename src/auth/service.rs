//! Token lifecycle: login, refresh rotation, logout and social login.
//!
//! Data flow:
//! - login: credentials -> mint pair -> whitelist refresh token
//! - rotate: verify refresh -> whitelist check -> mint pair -> swap in store
//! - logout: verify refresh -> delete from whitelist
//!
//! Refresh tokens are only ever honoured while present in the
//! [`RefreshStore`](crate::db::RefreshStore); the store's row-count result
//! is the single point that decides which of two racing rotations wins.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::errors::{AuthError, AuthResultExt};
use crate::db::{Database, SocialUpsert};
use crate::jwt::{JwtConfig, TokenPair, TokenType};
use crate::password;
use crate::social::SocialProvider;

#[derive(Clone)]
pub struct TokenService {
    db: Database,
    jwt: Arc<JwtConfig>,
}

impl TokenService {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self { db, jwt }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    fn now(&self) -> u64 {
        self.jwt.clock().now()
    }

    /// Exchange a username and password for a new token pair.
    ///
    /// Unknown user, locked account and wrong password all fail the same way.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let credentials = self
            .db
            .users()
            .lookup_credentials(username)
            .await
            .internal("Failed to look up credentials")?;

        let verified = match &credentials {
            Some(c) => password::verify_password(password, &c.password_hash).await,
            None => password::verify_against_dummy(password).await,
        };

        let credentials = match credentials {
            Some(c) if verified && !c.locked => c,
            _ => {
                info!(username = %username, "Login failed");
                return Err(AuthError::AuthenticationFailed);
            }
        };

        let pair = self
            .jwt
            .mint_pair(username, credentials.role)
            .internal("Failed to mint token pair")?;

        self.db
            .refresh_tokens()
            .create(username, &pair.refresh_token, self.now())
            .await
            .internal("Failed to store refresh token")?;

        info!(username = %username, "Login succeeded");
        Ok(pair)
    }

    /// Trade a whitelisted refresh token for a new pair. The presented token
    /// is single-use: it is replaced by the new refresh token atomically.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .jwt
            .validate(refresh_token, TokenType::Refresh)
            .map_err(|e| {
                debug!(error = %e, "Rejected refresh token");
                AuthError::InvalidToken
            })?;

        let store = self.db.refresh_tokens();

        if !store
            .exists(refresh_token)
            .await
            .internal("Failed to check refresh token")?
        {
            info!(username = %claims.sub, "Revoked refresh token presented");
            return Err(AuthError::RevokedToken);
        }

        let pair = self
            .jwt
            .mint_pair(&claims.sub, claims.role)
            .internal("Failed to mint token pair")?;

        let rotated = store
            .rotate(refresh_token, &claims.sub, &pair.refresh_token, self.now())
            .await
            .internal("Failed to rotate refresh token")?;

        if !rotated {
            // Someone else used this token between the check and the swap.
            warn!(username = %claims.sub, "Concurrent refresh token reuse rejected");
            return Err(AuthError::RevokedToken);
        }

        debug!(username = %claims.sub, "Refresh token rotated");
        Ok(pair)
    }

    /// Remove a refresh token from the whitelist. Revoking a token that is
    /// already gone is not an error. Returns whether a record was removed.
    pub async fn logout(&self, refresh_token: &str) -> Result<bool, AuthError> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::BadRequest("refreshToken is empty"));
        }

        let claims = self
            .jwt
            .validate(refresh_token, TokenType::Refresh)
            .map_err(|e| {
                debug!(error = %e, "Rejected refresh token at logout");
                AuthError::InvalidToken
            })?;

        let removed = self
            .db
            .refresh_tokens()
            .delete_by_token(refresh_token)
            .await
            .internal("Failed to revoke refresh token")?;

        info!(username = %claims.sub, removed, "Logout");
        Ok(removed)
    }

    /// Revoke every refresh token of a user (account deletion or lock).
    pub async fn revoke_all(&self, username: &str) -> Result<u64, AuthError> {
        let count = self
            .db
            .refresh_tokens()
            .delete_by_username(username)
            .await
            .internal("Failed to revoke refresh tokens")?;
        info!(username = %username, count, "Revoked all refresh tokens");
        Ok(count)
    }

    /// Finish a social login whose OAuth handshake already succeeded.
    ///
    /// Normalizes the provider payload, creates or refreshes the social
    /// account and whitelists a new refresh token, which is returned for the
    /// cookie bridge. The client later trades it at `/jwt/exchange`.
    /// Locked accounts get no token.
    pub async fn social_login(
        &self,
        provider: SocialProvider,
        payload: &Value,
    ) -> Result<String, AuthError> {
        let profile = provider.normalize(payload).map_err(|e| {
            warn!(provider = provider.as_str(), error = %e, "Social login rejected");
            AuthError::AuthenticationFailed
        })?;
        let username = provider.username_for(&profile);

        let account = self
            .db
            .users()
            .upsert_social(
                &SocialUpsert {
                    username: &username,
                    provider: provider.as_str(),
                    nickname: &profile.display_name,
                    email: &profile.email,
                },
                self.now(),
            )
            .await
            .internal("Failed to save social account")?
            .ok_or_else(|| {
                warn!(username = %username, "Social login collides with a local account");
                AuthError::AuthenticationFailed
            })?;

        if account.locked {
            info!(username = %username, "Social login for locked account rejected");
            return Err(AuthError::AuthenticationFailed);
        }

        let refresh = self
            .jwt
            .mint(&username, account.role, TokenType::Refresh)
            .internal("Failed to mint refresh token")?;

        self.db
            .refresh_tokens()
            .create(&username, &refresh.token, self.now())
            .await
            .internal("Failed to store refresh token")?;

        info!(username = %username, provider = provider.as_str(), "Social login succeeded");
        Ok(refresh.token)
    }
}
