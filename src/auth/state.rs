//! Authentication state trait and macro.

use super::issuer::TokenIssuer;
use crate::db::Database;

/// Trait for state types that provide the database and token issuer for authentication.
pub trait HasAuthBackend {
    fn issuer(&self) -> &TokenIssuer;
    fn db(&self) -> &Database;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `issuer: TokenIssuer`
/// - `db: Database`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub issuer: TokenIssuer,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn issuer(&self) -> &$crate::auth::TokenIssuer {
                &self.issuer
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
        }
    };
}
