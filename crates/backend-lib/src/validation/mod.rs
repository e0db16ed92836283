// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Registration input validation.
//!
//! Password strength lives in [`crate::auth::policy`]; this module covers
//! the other registration fields.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_USERNAME_LENGTH: usize = 64;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

// Letters (including the Norwegian/Danish ones), digits and underscore
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZæøåÆØÅ_0-9]+$").expect("static regex"));
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex")
});

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} field is required")]
    MissingField(&'static str),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Reject empty required fields
pub fn require<'a>(field: &'static str, value: &'a str) -> ValidationResult<&'a str> {
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value)
}

/// Validate a username
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    require("Username", username)?;

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "Username cannot exceed {MAX_USERNAME_LENGTH} characters"
        )));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "Only letters, numbers and underscore are allowed in usernames".to_string(),
        ));
    }

    Ok(username)
}

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    require("Email", email)?;

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Invalid email address format".to_string(),
        ));
    }

    Ok(email)
}
