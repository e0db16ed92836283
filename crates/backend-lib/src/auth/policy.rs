// ============================
// crates/backend-lib/src/auth/policy.rs
// ============================
//! Password strength policy.
//!
//! Applied before every hash-and-store (registration, password change),
//! never on login. Checks run in a fixed order and the first failure wins.
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 9;

/// At least one special character from this set is required
pub const SPECIAL_CHARACTERS: &str = "!#$%&*+-?@^_~";

static ALPHANUMERIC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]").expect("static regex"));

/// Reasons a password is rejected by the policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Username and password must differ")]
    SameAsUsername,

    #[error("Password is too similar to the username")]
    TooSimilar,

    #[error("Password must be at least {0} characters long")]
    TooShort(usize),

    #[error("Password must contain letters or numbers")]
    NoAlphanumeric,

    #[error("Password must contain one of {SPECIAL_CHARACTERS}")]
    MissingSpecialCharacter,
}

impl PolicyError {
    /// Stable identifier for rendering field-specific messages
    pub fn code(&self) -> &'static str {
        match self {
            PolicyError::SameAsUsername => "PWD_SAME_AS_USERNAME",
            PolicyError::TooSimilar => "PWD_TOO_SIMILAR",
            PolicyError::TooShort(_) => "PWD_TOO_SHORT",
            PolicyError::NoAlphanumeric => "PWD_NO_ALPHANUMERIC",
            PolicyError::MissingSpecialCharacter => "PWD_NO_SPECIAL",
        }
    }
}

/// Password complexity requirements
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
        }
    }
}

impl PasswordPolicy {
    /// Check a candidate password for the given username
    pub fn validate(&self, username: &str, password: &str) -> Result<(), PolicyError> {
        let user = username.to_lowercase();
        let pass = password.to_lowercase();

        if user == pass {
            return Err(PolicyError::SameAsUsername);
        }

        // fuzzy anti-reuse: catches near-variants of the username
        let len = password.chars().count();
        if levenshtein(&user, &pass) < len - len / 4 {
            return Err(PolicyError::TooSimilar);
        }

        if len < self.min_length {
            return Err(PolicyError::TooShort(self.min_length));
        }

        if !ALPHANUMERIC_REGEX.is_match(password) {
            return Err(PolicyError::NoAlphanumeric);
        }

        if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
            return Err(PolicyError::MissingSpecialCharacter);
        }

        Ok(())
    }
}

/// Validate with the default policy
pub fn validate_password(username: &str, password: &str) -> Result<(), PolicyError> {
    PasswordPolicy::default().validate(username, password)
}

/// Edit distance over Unicode scalar values
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
