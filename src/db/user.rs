use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }

    /// Role hierarchy: admin implies user.
    pub fn implies(&self, required: UserRole) -> bool {
        match (self, required) {
            (UserRole::Admin, _) => true,
            (UserRole::User, UserRole::User) => true,
            (UserRole::User, UserRole::Admin) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub locked: bool,
    pub social: bool,
    pub provider: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    role: String,
    locked: i32,
    social: i32,
    provider: Option<String>,
    nickname: Option<String>,
    email: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            role: UserRole::from_str(&row.role),
            locked: row.locked != 0,
            social: row.social != 0,
            provider: row.provider,
            nickname: row.nickname,
            email: row.email,
        }
    }
}

/// What the login exchange needs to know about a local account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub password_hash: String,
    pub role: UserRole,
    pub locked: bool,
}

/// Role and lock state of a social account after an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocialAccount {
    pub role: UserRole,
    pub locked: bool,
}

/// A normalized social profile to create or refresh.
#[derive(Debug, Clone)]
pub struct SocialUpsert<'a> {
    pub username: &'a str,
    pub provider: &'a str,
    pub nickname: &'a str,
    pub email: &'a str,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a local (password) account. Returns the user ID.
    pub async fn create_local(
        &self,
        username: &str,
        password_hash: &str,
        role: UserRole,
        nickname: Option<&str>,
        email: Option<&str>,
        now: u64,
    ) -> Result<i64, sqlx::Error> {
        let now = to_db_time(now);
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, role, nickname, email, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(nickname)
        .bind(email)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Check if a username is taken (local or social).
    pub async fn exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 != 0)
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, role, locked, social, provider, nickname, email FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Credential record for a local account. Social accounts have no
    /// password and are never returned.
    pub async fn lookup_credentials(
        &self,
        username: &str,
    ) -> Result<Option<Credentials>, sqlx::Error> {
        let row: Option<(String, String, i32)> = sqlx::query_as(
            "SELECT password_hash, role, locked FROM users WHERE username = ? AND social = 0",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(password_hash, role, locked)| Credentials {
            password_hash,
            role: UserRole::from_str(&role),
            locked: locked != 0,
        }))
    }

    /// Update nickname and email of a local account.
    pub async fn update_profile(
        &self,
        username: &str,
        nickname: Option<&str>,
        email: Option<&str>,
        now: u64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET nickname = ?, email = ?, updated_at = ? WHERE username = ? AND social = 0",
        )
        .bind(nickname)
        .bind(email)
        .bind(to_db_time(now))
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lock or unlock an account.
    pub async fn set_locked(&self, username: &str, locked: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET locked = ? WHERE username = ?")
            .bind(locked as i32)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user by username.
    pub async fn delete_by_username(&self, username: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Create a social account or refresh the profile of an existing one.
    ///
    /// Returns the account's role and lock state, or `None` if the username
    /// belongs to a local account (which is left untouched).
    pub async fn upsert_social(
        &self,
        profile: &SocialUpsert<'_>,
        now: u64,
    ) -> Result<Option<SocialAccount>, sqlx::Error> {
        let now = to_db_time(now);
        sqlx::query(
            "INSERT INTO users (username, password_hash, role, social, provider, nickname, email, created_at, updated_at)
             VALUES (?, '', 'user', 1, ?, ?, ?, ?, ?)
             ON CONFLICT(username) DO UPDATE SET
                nickname = excluded.nickname,
                email = excluded.email,
                updated_at = excluded.updated_at
             WHERE users.social = 1",
        )
        .bind(profile.username)
        .bind(profile.provider)
        .bind(profile.nickname)
        .bind(profile.email)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row: Option<(String, i32, i32)> =
            sqlx::query_as("SELECT role, locked, social FROM users WHERE username = ?")
                .bind(profile.username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match row {
            Some((role, locked, social)) if social != 0 => Some(SocialAccount {
                role: UserRole::from_str(&role),
                locked: locked != 0,
            }),
            _ => None,
        })
    }
}

fn to_db_time(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}
