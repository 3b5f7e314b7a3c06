//! Input validation for account endpoints.

use validator::ValidateEmail;

pub const MAX_NAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
const MAX_EMAIL_LEN: usize = 254;

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Email syntax check (HTML5 rules via `validator`), plus a dotted domain.
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("Email is required");
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err("Email is too long");
    }
    if !email.to_owned().validate_email() {
        return Err("Please provide a valid email");
    }
    match email.rsplit_once('@') {
        Some((_, domain)) if domain.contains('.') => Ok(()),
        _ => Err("Please provide a valid email"),
    }
}

pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Name is required");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err("Name cannot be longer than 50 characters");
    }
    if name.chars().any(char::is_control) {
        return Err("Name contains invalid characters");
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 8 characters");
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err("Password cannot be longer than 128 bytes");
    }
    Ok(())
}
