//! Public configuration endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::auth::{OptionalAuth, TokenIssuer};
use crate::db::Database;
use crate::impl_has_auth_backend;

/// Version embedded at compile time from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct ConfigState {
    pub db: Database,
    pub issuer: TokenIssuer,
}

impl_has_auth_backend!(ConfigState);

#[derive(Serialize)]
struct ConfigResponse {
    version: &'static str,
    environment: &'static str,
    authenticated: bool,
}

pub fn router(state: ConfigState) -> Router {
    Router::new().route("/", get(get_config)).with_state(state)
}

async fn get_config(
    State(state): State<ConfigState>,
    OptionalAuth(user): OptionalAuth,
) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        version: VERSION,
        environment: state.issuer.cookies().environment().as_str(),
        authenticated: user.is_some(),
    })
}
