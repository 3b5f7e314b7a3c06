//! Password hashing (Argon2id, PHC string format).
//!
//! Argon2 is CPU bound. Async callers run these functions on the blocking
//! pool with `tokio::task::spawn_blocking`.

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::Rng;
use std::sync::LazyLock;

/// Stand-in hash checked when no account matches, so unknown emails cost a
/// full Argon2 verification like known ones.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("zentro-unknown-account").unwrap_or_default());

#[cfg(test)]
thread_local! {
    pub(crate) static VERIFICATIONS: std::cell::Cell<u32> = const { std::cell::Cell::new(0) };
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let phc = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(phc.to_string())
}

/// Check a password against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(hash: &str, password: &str) -> bool {
    #[cfg(test)]
    VERIFICATIONS.with(|count| count.set(count.get() + 1));

    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Check a password against an account's hash, or against a dummy hash when
/// there is no account. The result is false for a missing account.
pub fn verify_account_password(hash: Option<&str>, password: &str) -> bool {
    match hash {
        Some(hash) => verify_password(hash, password),
        None => {
            verify_password(&DUMMY_HASH, password);
            false
        }
    }
}
