//! Server configuration resolved once at startup.
//!
//! Values are passed explicitly into the router state; nothing here is global.

use crate::duration::DurationSetting;

/// Deployment environment, taken from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    /// Only the exact value `production` selects the production policy.
    pub fn from_node_env(value: &str) -> Self {
        match value {
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }
}

/// Everything the token issuer needs.
#[derive(Clone)]
pub struct AuthSettings {
    /// HMAC secret for signing session tokens
    pub jwt_secret: Vec<u8>,
    /// Token validity (`JWT_EXPIRE`)
    pub jwt_expire: DurationSetting,
    /// Cookie max-age (`JWT_COOKIE_EXPIRE`)
    pub cookie_expire: DurationSetting,
    pub environment: Environment,
}

impl AuthSettings {
    /// Settings with default lifetimes for the given secret and environment.
    pub fn new(jwt_secret: impl Into<Vec<u8>>, environment: Environment) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_expire: DurationSetting::default(),
            cookie_expire: DurationSetting::default(),
            environment,
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expire", &self.jwt_expire)
            .field("cookie_expire", &self.cookie_expire)
            .field("environment", &self.environment)
            .finish()
    }
}

/// Fatal configuration problems, reported before the server binds.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// No signing secret was configured
    MissingSecret,
    /// The signing secret is too short to be safe
    WeakSecret { min_len: usize },
    /// The secret file could not be read
    UnreadableSecretFile { path: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingSecret => write!(f, "JWT secret is not configured"),
            ConfigError::WeakSecret { min_len } => {
                write!(f, "JWT secret is shorter than {} characters", min_len)
            }
            ConfigError::UnreadableSecretFile { path, reason } => {
                write!(f, "Failed to read JWT secret file {}: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_env_mapping() {
        assert_eq!(Environment::from_node_env("production"), Environment::Production);
        assert_eq!(Environment::from_node_env("development"), Environment::Development);
        assert_eq!(Environment::from_node_env("test"), Environment::Development);
        assert_eq!(Environment::from_node_env("Production"), Environment::Development);
        assert_eq!(Environment::from_node_env(""), Environment::Development);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let settings = AuthSettings::new("super-secret-value", Environment::Production);
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("<redacted>"));
    }
}
