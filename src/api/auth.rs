//! Account and session endpoints.
//!
//! - POST `/register` - create an account and start a session
//! - POST `/login` - check credentials and start a session
//! - POST `/logout` - clear the session cookie
//! - GET `/me` - current identity from the session cookie
//! - GET `/verify-email/{token}` - consume an email verification token
//! - POST `/resend-verification` - log a fresh verification link for the session user

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ApiError, ResultExt};
use crate::auth::{
    Auth, CookieOptions, PublicUser, TokenIssuer, hash_password, verify_account_password,
};
use crate::db::{Database, NewUser, User, UserRole};
use crate::impl_has_auth_backend;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};
use crate::validators::{normalize_email, validate_email, validate_name, validate_password};

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub issuer: TokenIssuer,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(AuthState);

pub fn router(state: AuthState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    let register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_register,
        ));

    let session_router = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/verify-email/{token}", get(verify_email))
        .route("/resend-verification", post(resend_verification))
        .with_state(state);

    Router::new()
        .merge(login_router)
        .merge(register_router)
        .merge(session_router)
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct UserResponse {
    success: bool,
    user: PublicUser,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

/// Build a JSON user response carrying a fresh session cookie.
fn session_response(
    state: &AuthState,
    status: StatusCode,
    user: &User,
) -> Result<Response, ApiError> {
    let issued = state
        .issuer
        .issue(&user.uuid, user.role)
        .internal_err("Failed to issue session token")?;

    let mut response = (
        status,
        Json(UserResponse {
            success: true,
            user: PublicUser::from(user),
        }),
    )
        .into_response();
    state
        .issuer
        .attach(&mut response, &issued.token, &CookieOptions::default());
    Ok(response)
}

async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    let name = payload.name.trim();
    let email = normalize_email(&payload.email);

    validate_name(name).map_err(ApiError::bad_request)?;
    validate_email(&email).map_err(ApiError::bad_request)?;
    validate_password(&payload.password).map_err(ApiError::bad_request)?;

    let exists = state
        .db
        .users()
        .email_exists(&email)
        .await
        .db_err("Failed to check email")?;
    if exists {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let password = payload.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .internal_err("Password hashing task failed")?
        .internal_err("Failed to hash password")?;

    let uuid = uuid::Uuid::new_v4().to_string();
    let user_id = state
        .db
        .users()
        .create(&NewUser {
            uuid: &uuid,
            name,
            email: &email,
            password_hash: &password_hash,
            role: UserRole::User,
        })
        .await
        .map_err(create_user_error)?;

    let token = state
        .db
        .verifications()
        .create(user_id)
        .await
        .db_err("Failed to create verification token")?;
    log_verification_link(&uuid, &token);

    let user = state
        .db
        .users()
        .get_by_id(user_id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal_error("Failed to load user", "missing after insert"))?;

    info!(user = %user.uuid, "User registered");
    session_response(&state, StatusCode::CREATED, &user)
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let user = state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to get user")?;

    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let password = payload.password;
    let valid = tokio::task::spawn_blocking(move || {
        verify_account_password(stored_hash.as_deref(), &password)
    })
    .await
    .internal_err("Password verification task failed")?;

    let Some(user) = user.filter(|_| valid) else {
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    info!(user = %user.uuid, "User logged in");
    session_response(&state, StatusCode::OK, &user)
}

async fn logout(State(state): State<AuthState>) -> Response {
    let mut response = Json(MessageResponse {
        success: true,
        message: "Logged out",
    })
    .into_response();
    state.issuer.clear(&mut response);
    response
}

async fn me(auth: Auth) -> Json<UserResponse> {
    Json(UserResponse {
        success: true,
        user: PublicUser::from(&auth.user().user),
    })
}

/// Unique email violations lost to a concurrent registration answer 409.
fn create_user_error(e: sqlx::Error) -> ApiError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict("Email is already registered")
        }
        e => ApiError::db_error("Failed to create user", e),
    }
}

/// No mailer is wired in; the link goes to the debug log.
fn log_verification_link(user: &str, token: &str) {
    info!(user, "Email verification link created");
    debug!(user, link = %format!("/verify-email/{}", token), "Email verification link");
}

async fn verify_email(
    State(state): State<AuthState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = state
        .db
        .verifications()
        .consume(&token)
        .await
        .db_err("Failed to check verification token")?
        .ok_or_else(|| ApiError::bad_request("Invalid or expired verification link"))?;

    state
        .db
        .users()
        .mark_verified(user_id)
        .await
        .db_err("Failed to verify user")?;

    if let Err(e) = state.db.verifications().delete_for_user(user_id).await {
        tracing::warn!(error = %e, "Failed to remove remaining verification tokens");
    }

    info!(user_id, "Email verified");
    Ok(Json(MessageResponse {
        success: true,
        message: "Email verified",
    }))
}

async fn resend_verification(
    State(state): State<AuthState>,
    auth: Auth,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = auth.into_inner().user;
    if user.is_verified {
        return Err(ApiError::bad_request("Email is already verified"));
    }

    let verifications = state.db.verifications();
    let existing = verifications
        .latest_for_user(user.id)
        .await
        .db_err("Failed to check verification token")?;
    let token = match existing {
        Some(token) => token,
        None => verifications
            .create(user.id)
            .await
            .db_err("Failed to create verification token")?,
    };
    log_verification_link(&user.uuid, &token);

    Ok(Json(MessageResponse {
        success: true,
        message: "Verification link sent",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::Mutex;
    use tracing::Level;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(level: Level, f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_verification_token_not_logged_at_info() {
        let logs = capture_logs(Level::INFO, || log_verification_link("uuid-1", "secret-token"));
        assert!(logs.contains("Email verification link created"));
        assert!(!logs.contains("secret-token"));
    }

    #[test]
    fn test_verification_link_logged_at_debug() {
        let logs = capture_logs(Level::DEBUG, || log_verification_link("uuid-1", "secret-token"));
        assert!(logs.contains("/verify-email/secret-token"));
    }

    #[tokio::test]
    async fn test_duplicate_insert_maps_to_conflict() {
        let db = Database::open(":memory:").await.unwrap();
        let user = NewUser {
            uuid: "uuid-a",
            name: "A",
            email: "a@example.com",
            password_hash: "hash",
            role: UserRole::User,
        };
        db.users().create(&user).await.unwrap();

        let err = db
            .users()
            .create(&NewUser {
                uuid: "uuid-b",
                ..user
            })
            .await
            .unwrap_err();
        assert!(matches!(create_user_error(err), ApiError::Conflict(_)));
    }

    #[test]
    fn test_other_create_errors_are_internal() {
        assert!(matches!(create_user_error(sqlx::Error::RowNotFound), ApiError::Internal(_)));
    }
}
