mod admin;
mod auth;
mod config;
mod error;

use axum::Router;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;

pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    issuer: TokenIssuer,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        db: db.clone(),
        issuer: issuer.clone(),
        rate_limit_config,
    };

    let admin_state = admin::AdminState {
        db: db.clone(),
        issuer: issuer.clone(),
    };

    let config_state = config::ConfigState { db, issuer };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/admin", admin::router(admin_state))
        .nest("/config", config::router(config_state))
}
