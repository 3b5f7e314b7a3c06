//! Authentication user types.

use serde::Serialize;

use crate::db::{User, UserRole};
use crate::jwt::SessionClaims;

/// Authenticated user extracted from the session cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Claims from the session token
    pub claims: SessionClaims,
    /// Current database record for the subject
    pub user: User,
}

/// User shape returned to clients. Never includes the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub uuid: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_verified: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            uuid: user.uuid.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            is_verified: user.is_verified,
        }
    }
}
