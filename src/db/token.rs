//! Refresh token whitelist.
//!
//! A refresh token is honoured only while a row for it exists here. Access
//! tokens are stateless and never stored. Every mutation is a single SQL
//! statement whose affected-row count tells the caller whether it won, so
//! two requests racing on the same token value cannot both succeed.

use sqlx::sqlite::SqlitePool;

/// Longest token string the store accepts.
pub const MAX_TOKEN_LENGTH: usize = 512;

/// A whitelisted refresh token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshRecord {
    pub id: i64,
    pub username: String,
    pub token: String,
    /// Unix seconds
    pub created_at: i64,
}

/// Errors from the refresh store.
#[derive(Debug)]
pub enum StoreError {
    /// Token exceeds [`MAX_TOKEN_LENGTH`]
    TokenTooLong(usize),
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::TokenTooLong(len) => write!(
                f,
                "Refresh token is {} characters, limit is {}",
                len, MAX_TOKEN_LENGTH
            ),
            StoreError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Store for managing whitelisted refresh tokens.
#[derive(Clone)]
pub struct RefreshStore {
    pool: SqlitePool,
}

impl RefreshStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a refresh token. Returns the record id.
    pub async fn create(
        &self,
        username: &str,
        token: &str,
        created_at: u64,
    ) -> Result<i64, StoreError> {
        check_length(token)?;

        let result =
            sqlx::query("INSERT INTO refresh_tokens (username, token, created_at) VALUES (?, ?, ?)")
                .bind(username)
                .bind(token)
                .bind(to_db_time(created_at))
                .execute(&self.pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Whether the token is currently whitelisted.
    pub async fn exists(&self, token: &str) -> Result<bool, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM refresh_tokens WHERE token = ?)")
                .bind(token)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0 != 0)
    }

    /// Replace `old_token` with `new_token` in one statement.
    ///
    /// Returns `false` and changes nothing if `old_token` is not whitelisted,
    /// which is also what the loser of two concurrent rotations observes.
    pub async fn rotate(
        &self,
        old_token: &str,
        username: &str,
        new_token: &str,
        created_at: u64,
    ) -> Result<bool, StoreError> {
        check_length(new_token)?;

        let result = sqlx::query(
            "UPDATE refresh_tokens SET token = ?, username = ?, created_at = ? WHERE token = ?",
        )
        .bind(new_token)
        .bind(username)
        .bind(to_db_time(created_at))
        .bind(old_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a token (revoke). Returns whether a row was removed.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all tokens for a user.
    pub async fn delete_by_username(&self, username: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every record created at or before `cutoff` (Unix seconds).
    pub async fn delete_created_at_or_before(&self, cutoff: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE created_at <= ?")
            .bind(to_db_time(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List a user's whitelisted tokens, newest first.
    pub async fn list_by_username(&self, username: &str) -> Result<Vec<RefreshRecord>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, token, created_at FROM refresh_tokens WHERE username = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
    }

    /// Total number of whitelisted tokens.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

fn check_length(token: &str) -> Result<(), StoreError> {
    if token.len() > MAX_TOKEN_LENGTH {
        return Err(StoreError::TokenTooLong(token.len()));
    }
    Ok(())
}

/// SQLite integers are signed.
fn to_db_time(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}
