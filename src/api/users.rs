use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ResultExt, parse_json, validate_password, validate_username};
use crate::auth::{Auth, TokenService};
use crate::db::{Database, User, UserRole};
use crate::password;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub service: TokenService,
}

impl UsersState {
    fn now(&self) -> u64 {
        self.service.jwt().clock().now()
    }
}

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/exist", post(user_exists))
        .route("/join", post(join))
        .route("/me", get(get_me).put(update_me))
        .route("/", delete(delete_user))
        .with_state(state)
}

/// Public profile of an account.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub username: String,
    pub role: UserRole,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub social: bool,
    pub provider: Option<String>,
    pub locked: bool,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            role: user.role,
            nickname: user.nickname,
            email: user.email,
            social: user.social,
            provider: user.provider,
            locked: user.locked,
        }
    }
}

#[derive(Deserialize)]
struct UsernameRequest {
    username: String,
}

#[derive(Deserialize)]
struct JoinRequest {
    username: String,
    password: String,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinResponse {
    user_entity_id: i64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UpdateProfileRequest {
    nickname: Option<String>,
    email: Option<String>,
}

async fn user_exists(
    State(state): State<UsersState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: UsernameRequest = parse_json(&body)?;
    let exists = state
        .db
        .users()
        .exists(request.username.trim())
        .await
        .db_err("Failed to check username")?;
    Ok(Json(exists))
}

async fn join(
    State(state): State<UsersState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: JoinRequest = parse_json(&body)?;
    let username = request.username.trim();

    validate_username(username)?;
    validate_password(&request.password)?;

    let users = state.db.users();
    if users
        .exists(username)
        .await
        .db_err("Failed to check username")?
    {
        return Err(ApiError::conflict("Username is already taken"));
    }

    let hash = password::hash_password(&request.password)
        .await
        .map_err(|e| ApiError::internal("Failed to hash password", e))?;

    let id = users
        .create_local(
            username,
            &hash,
            UserRole::User,
            non_empty(&request.nickname),
            non_empty(&request.email),
            state.now(),
        )
        .await
        .map_err(|e| {
            // Lost a race with a concurrent join for the same name.
            if e.as_database_error()
                .is_some_and(|d| d.is_unique_violation())
            {
                ApiError::conflict("Username is already taken")
            } else {
                ApiError::db_error("Failed to create user", e)
            }
        })?;

    info!(username = %username, "User joined");

    Ok((
        StatusCode::CREATED,
        Json(JoinResponse { user_entity_id: id }),
    ))
}

/// The caller's account, unless it has been locked since the access token
/// was issued.
async fn active_user(state: &UsersState, username: &str) -> Result<User, ApiError> {
    state
        .db
        .users()
        .get_by_username(username)
        .await
        .db_err("Failed to get user")?
        .filter(|user| !user.locked)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

async fn get_me(
    State(state): State<UsersState>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError> {
    let user = active_user(&state, auth.username()).await?;
    Ok(Json(ProfileResponse::from(user)))
}

async fn update_me(
    State(state): State<UsersState>,
    auth: Auth,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: UpdateProfileRequest = parse_json(&body)?;
    let user = active_user(&state, auth.username()).await?;

    if user.social {
        return Err(ApiError::forbidden(
            "Profiles of social accounts are managed by the provider",
        ));
    }

    let updated = state
        .db
        .users()
        .update_profile(
            &user.username,
            non_empty(&request.nickname),
            non_empty(&request.email),
            state.now(),
        )
        .await
        .db_err("Failed to update profile")?;

    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    let user = state
        .db
        .users()
        .get_by_username(&user.username)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse::from(user)))
}

/// Delete an account and every refresh token issued to it.
/// Only the account owner or an admin may do this.
async fn delete_user(
    State(state): State<UsersState>,
    auth: Auth,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: UsernameRequest = parse_json(&body)?;
    let username = request.username.trim();

    let is_self = auth.username() == username;
    if !is_self && !auth.principal.is_admin() {
        return Err(ApiError::forbidden("You can only delete your own account"));
    }

    let deleted = state
        .db
        .users()
        .delete_by_username(username)
        .await
        .db_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    state.service.revoke_all(username).await?;

    info!(username = %username, by = %auth.username(), "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
