// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication primitives: credential hashing, password policy, signed
//! session tokens, confirmation codes and the login cookie.

pub mod confirmation;
pub mod cookie;
pub mod password;
pub mod policy;
pub mod session;
pub mod token_generator;

pub use confirmation::{
    ConfirmationCodeGenerator, ExhaustedAttempts, DEFAULT_MIN_CODE_LENGTH, MAX_CODE_LENGTH,
};
pub use cookie::{
    cookie_value, expired_cookie, session_cookie, DEFAULT_COOKIE_TTL_SECS, SESSION_COOKIE,
};
pub use password::{is_sha256, CredentialHasher, HashingFailure};
pub use policy::{validate_password, PasswordPolicy, PolicyError, MIN_PASSWORD_LENGTH};
pub use session::{SessionToken, TokenError, FRESHNESS_WINDOW_SECS};
pub use token_generator::{generate_readable, generate_secret};
