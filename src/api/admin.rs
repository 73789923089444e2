//! Admin API endpoints.
//!
//! All endpoints require admin role.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::info;

use super::error::{ApiError, ResultExt, parse_json};
use super::users::ProfileResponse;
use crate::auth::{AdminOnly, Auth, TokenService};
use crate::db::Database;

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
    pub service: TokenService,
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/users/{username}", get(get_user))
        .route("/users/{username}/lock", post(set_locked))
        .with_state(state)
}

async fn get_user(
    State(state): State<AdminState>,
    _auth: Auth<AdminOnly>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_username(&username)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse::from(user)))
}

#[derive(Deserialize)]
struct LockRequest {
    locked: bool,
}

/// Lock or unlock an account. Locking also revokes its refresh tokens, so
/// the user is out once their current access token expires.
async fn set_locked(
    State(state): State<AdminState>,
    auth: Auth<AdminOnly>,
    Path(username): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: LockRequest = parse_json(&body)?;

    let updated = state
        .db
        .users()
        .set_locked(&username, request.locked)
        .await
        .db_err("Failed to update user")?;

    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    if request.locked {
        state.service.revoke_all(&username).await?;
    }

    info!(username = %username, locked = request.locked, by = %auth.username(), "Account lock changed");

    let user = state
        .db
        .users()
        .get_by_username(&username)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse::from(user)))
}
