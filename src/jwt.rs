//! JWT token generation and validation.
//!
//! Access and refresh tokens share one claim layout and differ only in the
//! `type` claim and their lifetime. Expiry is checked against the injected
//! [`Clock`] rather than the system time so that tests can move time forward.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::Clock;
use crate::db::UserRole;

/// Default access token lifetime: 10 minutes
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 10 * 60;

/// Default refresh token lifetime: 7 days
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived, stateless, never stored
    Access,
    /// Long-lived, only honoured while whitelisted in the refresh store
    Refresh,
}

/// JWT claims carried by both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Authorization role
    pub role: UserRole,
    /// Token type
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Unique token id, keeps tokens minted in the same second distinct
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Signing key and lifetimes, fixed for the life of the process.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: Vec<u8>,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl TokenConfig {
    /// Config with the default lifetimes.
    pub fn with_secret(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
        }
    }
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct MintedToken {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

/// Access + refresh pair as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies tokens.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl JwtConfig {
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&config.secret),
            decoding_key: DecodingKey::from_secret(&config.secret),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn ttl(&self, token_type: TokenType) -> u64 {
        match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        }
    }

    /// Sign a token of the given type for `subject`.
    pub fn mint(
        &self,
        subject: &str,
        role: UserRole,
        token_type: TokenType,
    ) -> Result<MintedToken, JwtError> {
        let now = self.clock.now();
        let exp = now
            .checked_add(self.ttl(token_type))
            .ok_or(JwtError::TimeError)?;

        let claims = Claims {
            sub: subject.to_string(),
            role,
            token_type,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(MintedToken {
            token,
            issued_at: now,
            expires_at: exp,
        })
    }

    /// Sign an access token and a refresh token for the same identity.
    pub fn mint_pair(&self, subject: &str, role: UserRole) -> Result<TokenPair, JwtError> {
        let access = self.mint(subject, role, TokenType::Access)?;
        let refresh = self.mint(subject, role, TokenType::Refresh)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    /// Check signature, shape and expiry. The token type is NOT checked here.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is evaluated below against our own clock.
        validation.validate_exp = false;

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(JwtError::Decoding)?;

        if self.clock.now() >= token_data.claims.exp {
            return Err(JwtError::Expired);
        }

        Ok(token_data.claims)
    }

    /// Verify a token and require it to be of the expected type.
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = self.verify(token)?;
        if claims.token_type != expected {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// True iff the token verifies and is of the expected type.
    pub fn is_valid_for_use(&self, token: &str, expected: TokenType) -> bool {
        self.validate(token, expected).is_ok()
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Bad signature or malformed payload
    Decoding(jsonwebtoken::errors::Error),
    /// `now >= exp`
    Expired,
    /// Expiry would overflow
    TimeError,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}
