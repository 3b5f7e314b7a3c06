//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(10).unwrap();
const REGISTER_PER_MIN: NonZeroU32 = NonZeroU32::new(5).unwrap();

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login (burst of 10, one more per second)
    pub login: Arc<IpLimiter>,
    /// Per-IP limiter for registration (5 per minute)
    pub register: Arc<IpLimiter>,
    /// Header carrying the client IP when running behind a proxy
    pub ip_header: Option<String>,
}

impl RateLimitConfig {
    /// Create rate limiters with default configuration.
    pub fn new(ip_header: Option<String>) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST),
            )),
            register: Arc::new(RateLimiter::keyed(Quota::per_minute(REGISTER_PER_MIN))),
            ip_header,
        }
    }

    fn client_ip(&self, request: &Request) -> Option<String> {
        extract_client_ip(request, self.ip_header.as_deref()).ok()
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = config.client_ip(&request) else {
        return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
    };

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, "Login rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many login attempts. Please wait before trying again.",
            )
                .into_response()
        }
    }
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = config.client_ip(&request) else {
        return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
    };

    match config.register.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, "Registration rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many signup attempts. Please wait before trying again.",
            )
                .into_response()
        }
    }
}
