//! Session cookie policy and cookie parsing.

use axum::http::header;

use crate::server_config::Environment;

/// Cookie name for the session token.
pub const SESSION_COOKIE_NAME: &str = "jwt";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Fully resolved cookie attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    /// Lifetime in milliseconds; rendered as whole seconds.
    pub max_age_ms: u64,
    pub path: String,
}

/// Per-call overrides. Every field that is set replaces the default.
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    pub http_only: Option<bool>,
    pub secure: Option<bool>,
    pub same_site: Option<SameSite>,
    pub max_age_ms: Option<u64>,
    pub path: Option<String>,
}

impl CookieAttributes {
    fn merge(self, overrides: &CookieOptions) -> Self {
        Self {
            http_only: overrides.http_only.unwrap_or(self.http_only),
            secure: overrides.secure.unwrap_or(self.secure),
            same_site: overrides.same_site.unwrap_or(self.same_site),
            max_age_ms: overrides.max_age_ms.unwrap_or(self.max_age_ms),
            path: overrides.path.clone().unwrap_or(self.path),
        }
    }

    /// Render as a `Set-Cookie` header value.
    pub fn render(&self, name: &str, value: &str) -> String {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path={}",
            name,
            value,
            self.max_age_ms / 1000,
            self.path
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site.as_str());
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Environment-dependent policy for the session cookie.
///
/// Production assumes cross-site embedding over HTTPS (`Secure`,
/// `SameSite=None`); anything else allows plain HTTP (`SameSite=Lax`).
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    name: String,
    environment: Environment,
    max_age_ms: u64,
}

impl CookiePolicy {
    pub fn new(environment: Environment, max_age_ms: u64) -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            environment,
            max_age_ms,
        }
    }

    /// Use a different cookie name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Default attributes for this environment.
    pub fn defaults(&self) -> CookieAttributes {
        let production = self.environment.is_production();
        CookieAttributes {
            http_only: true,
            secure: production,
            same_site: if production {
                SameSite::None
            } else {
                SameSite::Lax
            },
            max_age_ms: self.max_age_ms,
            path: "/".to_string(),
        }
    }

    /// Attributes for issuing the session cookie, with caller overrides applied.
    pub fn session_attributes(&self, overrides: &CookieOptions) -> CookieAttributes {
        self.defaults().merge(overrides)
    }

    /// `Set-Cookie` value carrying the token.
    pub fn session_cookie(&self, token: &str, overrides: &CookieOptions) -> String {
        self.session_attributes(overrides).render(&self.name, token)
    }

    /// Attributes for clearing: same policy, zero lifetime.
    pub fn clear_attributes(&self) -> CookieAttributes {
        CookieAttributes {
            max_age_ms: 0,
            ..self.defaults()
        }
    }

    /// `Set-Cookie` value that makes the browser drop the session cookie.
    pub fn clear_cookie(&self) -> String {
        self.clear_attributes().render(&self.name, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::DEFAULT_DURATION_MS;
    use axum::http::HeaderValue;

    fn policy(environment: Environment) -> CookiePolicy {
        CookiePolicy::new(environment, DEFAULT_DURATION_MS)
    }

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("jwt=abc123"));

        assert_eq!(get_cookie(&headers, "jwt"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; jwt=abc123; theme=dark"),
        );

        assert_eq!(get_cookie(&headers, "jwt"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "theme"), Some("dark"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, "jwt"), None);
    }

    #[test]
    fn test_get_cookie_no_header() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(get_cookie(&headers, "jwt"), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  jwt = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, "jwt"), Some("abc123"));
    }

    #[test]
    fn test_http_only_in_every_environment() {
        for env in [Environment::Production, Environment::Development] {
            let attrs = policy(env).session_attributes(&CookieOptions::default());
            assert!(attrs.http_only);
            assert_eq!(attrs.path, "/");
            assert_eq!(attrs.max_age_ms, DEFAULT_DURATION_MS);
        }
    }

    #[test]
    fn test_production_policy() {
        let cookie =
            policy(Environment::Production).session_cookie("tok", &CookieOptions::default());
        assert_eq!(
            cookie,
            "jwt=tok; Max-Age=604800; Path=/; HttpOnly; SameSite=None; Secure"
        );
    }

    #[test]
    fn test_development_policy() {
        let cookie =
            policy(Environment::Development).session_cookie("tok", &CookieOptions::default());
        assert_eq!(cookie, "jwt=tok; Max-Age=604800; Path=/; HttpOnly; SameSite=Lax");
    }

    #[test]
    fn test_overrides_win_per_field() {
        let overrides = CookieOptions {
            max_age_ms: Some(60_000),
            same_site: Some(SameSite::Strict),
            ..Default::default()
        };
        let attrs = policy(Environment::Production).session_attributes(&overrides);

        assert_eq!(attrs.max_age_ms, 60_000);
        assert_eq!(attrs.same_site, SameSite::Strict);
        // Untouched keys keep the environment defaults.
        assert!(attrs.secure);
        assert!(attrs.http_only);
        assert_eq!(attrs.path, "/");
    }

    #[test]
    fn test_clear_matches_issue_policy() {
        for env in [Environment::Production, Environment::Development] {
            let policy = policy(env);
            let issued = policy.session_attributes(&CookieOptions::default());
            let cleared = policy.clear_attributes();

            assert_eq!(cleared.max_age_ms, 0);
            assert_eq!(cleared.http_only, issued.http_only);
            assert_eq!(cleared.secure, issued.secure);
            assert_eq!(cleared.same_site, issued.same_site);
            assert_eq!(cleared.path, issued.path);
        }
        assert_eq!(
            policy(Environment::Development).clear_cookie(),
            "jwt=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_custom_cookie_name() {
        let policy = policy(Environment::Development).with_name("session");
        assert!(policy.session_cookie("x", &CookieOptions::default()).starts_with("session=x;"));
        assert!(policy.clear_cookie().starts_with("session=;"));
    }
}
