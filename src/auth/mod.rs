//! JWT cookie authentication with role-based access control.
//!
//! A single stateless session token lives in an `HttpOnly` cookie. There is
//! no server-side session store: logging out clears the cookie, and a copied
//! token stays valid until it expires.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod issuer;
mod password;
mod state;
mod types;

pub use cookie::{
    CookieAttributes, CookieOptions, CookiePolicy, SESSION_COOKIE_NAME, SameSite, get_cookie,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AdminOnly, AnyRole, Auth, OptionalAuth, RoleConstraint};
pub use ip::{HasHeadersAndExtensions, extract_client_ip};
pub use issuer::TokenIssuer;
pub use password::{hash_password, verify_account_password, verify_password};
pub use state::HasAuthBackend;
pub use types::{AuthenticatedUser, PublicUser};
