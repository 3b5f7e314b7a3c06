//! JWT token generation and validation.
//!
//! Sessions are stateless: the signed token in the cookie is the whole
//! session. There is no refresh or revocation; a token stays valid until
//! its `exp`.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// JWT claims for a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user UUID)
    pub sub: String,
    /// User role at the time of issuance
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    duration_secs: u64,
}

/// Result of issuing a session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration.
    ///
    /// `duration_ms` is rounded up to whole seconds. An empty secret is
    /// rejected so that a misconfigured server never signs anything.
    pub fn new(secret: &[u8], duration_ms: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::MissingSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            duration_secs: duration_ms.div_ceil(1000),
        })
    }

    /// Token validity in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Sign a session token for a user.
    pub fn issue(&self, user_uuid: &str, role: UserRole) -> Result<IssuedToken, JwtError> {
        let now = unix_now()?;
        let exp = now.saturating_add(self.duration_secs);

        let claims = SessionClaims {
            sub: user_uuid.to_string(),
            role,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: exp,
        })
    }

    /// Validate and decode a session token.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
                .map_err(JwtError::Decoding)?;

        // jsonwebtoken accepts exp == now; a credential is only valid strictly before exp.
        if token_data.claims.exp <= unix_now()? {
            return Err(JwtError::Expired);
        }

        Ok(token_data.claims)
    }
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// No signing secret configured
    MissingSecret,
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token
    Decoding(jsonwebtoken::errors::Error),
    /// Token reached its expiry
    Expired,
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::MissingSecret => write!(f, "No JWT secret configured"),
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
