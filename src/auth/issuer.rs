//! Token issuance: sign a session token and attach or clear its cookie.

use std::sync::Arc;

use axum::http::{HeaderValue, header::SET_COOKIE};
use axum::response::Response;

use super::cookie::{CookieOptions, CookiePolicy};
use crate::db::UserRole;
use crate::jwt::{IssuedToken, JwtConfig, JwtError, SessionClaims};
use crate::server_config::{AuthSettings, ConfigError};

/// Signs session tokens and manages the session cookie on responses.
///
/// Construction fails without a secret, so a running server always has one.
#[derive(Clone)]
pub struct TokenIssuer {
    jwt: Arc<JwtConfig>,
    cookies: CookiePolicy,
}

impl TokenIssuer {
    pub fn new(settings: &AuthSettings) -> Result<Self, ConfigError> {
        let jwt = JwtConfig::new(&settings.jwt_secret, settings.jwt_expire.as_millis())
            .map_err(|_| ConfigError::MissingSecret)?;
        let cookies = CookiePolicy::new(settings.environment, settings.cookie_expire.as_millis());

        Ok(Self {
            jwt: Arc::new(jwt),
            cookies,
        })
    }

    pub fn cookies(&self) -> &CookiePolicy {
        &self.cookies
    }

    /// Sign a token for the given subject.
    pub fn issue(&self, user_uuid: &str, role: UserRole) -> Result<IssuedToken, JwtError> {
        self.jwt.issue(user_uuid, role)
    }

    /// Verify signature and expiry.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, JwtError> {
        self.jwt.validate(token)
    }

    /// Append the session cookie to a response.
    pub fn attach(&self, response: &mut Response, token: &str, overrides: &CookieOptions) {
        let cookie = self.cookies.session_cookie(token, overrides);
        append_set_cookie(response, &cookie);
    }

    /// Append a cookie that removes the session immediately.
    pub fn clear(&self, response: &mut Response) {
        let cookie = self.cookies.clear_cookie();
        append_set_cookie(response, &cookie);
    }
}

fn append_set_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Refusing to set malformed cookie"),
    }
}
