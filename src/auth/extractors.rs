//! Axum extractors for authentication.
//!
//! The gate middleware has already verified the bearer token and stored a
//! [`Principal`] in the request extensions; these extractors only read it
//! back and apply role checks.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::AuthError;
use super::types::Principal;
use crate::db::UserRole;

/// Compile-time role requirement for [`Auth`].
pub trait RoleConstraint: Send + Sync + 'static {
    fn allows(role: UserRole) -> bool;
}

/// Any authenticated caller.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    fn allows(_role: UserRole) -> bool {
        true
    }
}

/// Admins only.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    fn allows(role: UserRole) -> bool {
        role.implies(UserRole::Admin)
    }
}

/// Extractor for endpoints that require an authenticated caller.
/// Rejects with 401 when there is no principal and 403 when the role
/// does not satisfy `R`.
pub struct Auth<R: RoleConstraint = AnyRole> {
    pub principal: Principal,
    _role: PhantomData<R>,
}

impl<R: RoleConstraint> Auth<R> {
    pub fn username(&self) -> &str {
        &self.principal.username
    }
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: Send + Sync,
    R: RoleConstraint,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::NotAuthenticated)?;

        if !R::allows(principal.role) {
            return Err(AuthError::AccessDenied);
        }

        Ok(Auth {
            principal,
            _role: PhantomData,
        })
    }
}
