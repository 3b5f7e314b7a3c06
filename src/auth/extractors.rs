//! Axum extractors for authentication.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookie::get_cookie;
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::db::UserRole;

/// Role requirement checked after authentication.
pub trait RoleConstraint {
    fn allows(role: UserRole) -> bool;
}

/// Any authenticated user.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    fn allows(_role: UserRole) -> bool {
        true
    }
}

/// Administrators only.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    fn allows(role: UserRole) -> bool {
        role == UserRole::Admin
    }
}

/// Core authentication logic shared by the extractors.
///
/// The role is read from the database rather than the token so that a role
/// change applies to sessions issued before it.
async fn authenticate_request<S>(
    parts: &Parts,
    state: &S,
) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    let cookie_name = state.issuer().cookies().name();
    let token = get_cookie(&parts.headers, cookie_name)
        .filter(|t| !t.is_empty())
        .ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state.issuer().validate(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AuthErrorKind::InvalidToken
    })?;

    let user = state
        .db()
        .users()
        .get_by_uuid(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user: {}", e);
            AuthErrorKind::DatabaseError
        })?
        .ok_or(AuthErrorKind::UserNotFound)?;

    Ok(AuthenticatedUser { claims, user })
}

/// Extractor for endpoints that require authentication, optionally with a role.
///
/// `Auth` accepts any role, `Auth<AdminOnly>` answers 403 for everyone else.
pub struct Auth<R: RoleConstraint = AnyRole>(pub AuthenticatedUser, PhantomData<R>);

impl<R: RoleConstraint> Auth<R> {
    pub fn user(&self) -> &AuthenticatedUser {
        &self.0
    }

    pub fn into_inner(self) -> AuthenticatedUser {
        self.0
    }
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: HasAuthBackend + Send + Sync,
    R: RoleConstraint,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate_request(parts, state).await?;

        if !R::allows(user.user.role) {
            return Err(AuthErrorKind::InsufficientRole.into());
        }

        Ok(Auth(user, PhantomData))
    }
}

/// Optional authentication extractor - never fails, returns Option<AuthenticatedUser>.
/// Useful for endpoints that work both authenticated and unauthenticated.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(authenticate_request(parts, state).await.ok()))
    }
}
