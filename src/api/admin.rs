//! Admin API endpoints.
//!
//! All endpoints require admin role.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminOnly, Auth, TokenIssuer};
use crate::db::Database;
use crate::impl_has_auth_backend;

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
    pub issuer: TokenIssuer,
}

impl_has_auth_backend!(AdminState);

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .with_state(state)
}

/// List all users.
async fn list_users(
    State(state): State<AdminState>,
    _auth: Auth<AdminOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .db
        .users()
        .list()
        .await
        .db_err("Failed to list users")?;

    Ok(Json(users))
}
