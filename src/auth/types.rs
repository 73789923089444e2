//! Authentication user types.

use crate::db::UserRole;
use crate::jwt::Claims;

/// The caller's identity for one request, derived from a verified access
/// token. Lives in the request extensions and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub role: UserRole,
}

impl Principal {
    pub fn has_role(&self, required: UserRole) -> bool {
        self.role.implies(required)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
        }
    }
}
