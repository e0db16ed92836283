// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Three algorithms are recognised, see [`PasswordAlgorithm`]. `bcrypt+`
//! writes bcrypt but still accepts legacy sha256 digests, which lets a
//! deployment move off sha256 without invalidating stored credentials.
use permgate_common::PasswordAlgorithm;
use sha2::{Digest, Sha256};
use std::hint::black_box;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use zeroize::Zeroizing;

/// Length of a hex-encoded sha256 digest
const SHA256_HEX_LENGTH: usize = 64;

/// Hashed once per hasher and verified against when there is no stored hash
const DUMMY_PASSWORD: &str = "permgate-dummy-password";

/// The underlying hash primitive rejected the input
#[derive(Error, Debug)]
#[error("password hashing failed: {0}")]
pub struct HashingFailure(String);

impl From<bcrypt::BcryptError> for HashingFailure {
    fn from(err: bcrypt::BcryptError) -> Self {
        HashingFailure(err.to_string())
    }
}

/// Hashes and verifies passwords for one configured algorithm
#[derive(Clone)]
pub struct CredentialHasher {
    algorithm: PasswordAlgorithm,
    secret: Zeroizing<String>,
    cost: u32,
    dummy: Arc<OnceLock<String>>,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("algorithm", &self.algorithm)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

impl CredentialHasher {
    /// Create a hasher. `secret` is mixed into sha256 digests as a per-deployment salt.
    pub fn new(algorithm: PasswordAlgorithm, secret: impl Into<String>) -> Self {
        Self {
            algorithm,
            secret: Zeroizing::new(secret.into()),
            cost: bcrypt::DEFAULT_COST,
            dummy: Arc::default(),
        }
    }

    /// Override the bcrypt cost factor
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self.dummy = Arc::default();
        self
    }

    pub fn algorithm(&self) -> PasswordAlgorithm {
        self.algorithm
    }

    /// Hash a password. `username` is only used by the sha256 algorithm.
    pub fn hash(&self, username: &str, password: &str) -> Result<String, HashingFailure> {
        match self.algorithm {
            PasswordAlgorithm::Sha256 => Ok(hash_sha256(&self.secret, username, password)),
            PasswordAlgorithm::Bcrypt | PasswordAlgorithm::BcryptPlus => {
                hash_bcrypt(password, self.cost)
            },
        }
    }

    /// Check a password against a stored hash. Empty or malformed hashes never verify.
    ///
    /// A missing hash costs as much as a real check, so timing does not
    /// reveal whether the user exists.
    pub fn verify(&self, stored: &str, username: &str, password: &str) -> bool {
        if stored.is_empty() {
            self.verify_absent(username, password);
            return false;
        }

        match self.algorithm {
            PasswordAlgorithm::Sha256 => verify_sha256(stored, &self.secret, username, password),
            PasswordAlgorithm::Bcrypt => verify_bcrypt(stored, password),
            PasswordAlgorithm::BcryptPlus => {
                if is_sha256(stored) {
                    return verify_sha256(stored, &self.secret, username, password);
                }
                verify_bcrypt(stored, password)
            },
        }
    }

    fn verify_absent(&self, username: &str, password: &str) {
        match self.algorithm {
            PasswordAlgorithm::Sha256 => {
                let _ = black_box(hash_sha256(&self.secret, username, password));
            },
            PasswordAlgorithm::Bcrypt | PasswordAlgorithm::BcryptPlus => {
                let dummy = self
                    .dummy
                    .get_or_init(|| hash_bcrypt(DUMMY_PASSWORD, self.cost).unwrap_or_default());
                let _ = black_box(verify_bcrypt(dummy, password));
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn dummy_hash(&self) -> Option<&str> {
        self.dummy.get().map(String::as_str)
    }
}

/// Hash a password using bcrypt. Passwords longer than bcrypt accepts are rejected, not truncated.
pub fn hash_bcrypt(password: &str, cost: u32) -> Result<String, HashingFailure> {
    Ok(bcrypt::non_truncating_hash(password, cost)?)
}

/// Verify a password against a bcrypt hash
pub fn verify_bcrypt(hash: &str, password: &str) -> bool {
    bcrypt::non_truncating_verify(password, hash).unwrap_or(false)
}

/// Hex sha256 over password, secret and username
pub fn hash_sha256(secret: &str, username: &str, password: &str) -> String {
    let digest = Sha256::new()
        .chain_update(password.as_bytes())
        .chain_update(secret.as_bytes())
        .chain_update(username.as_bytes())
        .finalize();
    hex::encode(digest)
}

/// Verify a password against a sha256 digest produced by [`hash_sha256`]
pub fn verify_sha256(hash: &str, secret: &str, username: &str, password: &str) -> bool {
    let candidate = hash_sha256(secret, username, password);
    constant_time_eq(hash.as_bytes(), candidate.as_bytes())
}

/// Whether a stored value is shaped like a hex sha256 digest
pub fn is_sha256(hash: &str) -> bool {
    hash.len() == SHA256_HEX_LENGTH && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Constant-time byte comparison. Length is not secret.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
