// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! [`Settings`] is the deserialised file/environment configuration. The
//! runtime view used by the auth core is [`AuthConfig`], an immutable value
//! built once from the settings and replaced wholesale, never mutated.
use crate::auth::{
    token_generator::generate_secret, ConfirmationCodeGenerator, CredentialHasher,
    PasswordPolicy, DEFAULT_COOKIE_TTL_SECS, DEFAULT_MIN_CODE_LENGTH, MAX_CODE_LENGTH,
};
use crate::error::AppError;
use crate::permissions::PermissionTable;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use permgate_common::PasswordAlgorithm;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "permgate.toml";

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "PERMGATE_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Which user store backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Memory,
    File,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level
    pub log_level: String,
    /// Data directory path
    pub data_dir: PathBuf,
    /// User store backend
    pub store: StoreKind,
    /// `bcrypt`, `sha256` or `bcrypt+`
    pub password_algorithm: PasswordAlgorithm,
    /// Login cookie lifetime in seconds, 0 for effectively permanent
    pub cookie_ttl_secs: u64,
    /// Cookie/hash secret. Generated at startup when absent.
    pub cookie_secret: Option<String>,
    /// Starting length of confirmation codes
    pub min_confirmation_code_length: usize,
    /// Admin/user/public path prefixes
    pub permissions: PermissionTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            data_dir: PathBuf::from("data"),
            store: StoreKind::Memory,
            password_algorithm: PasswordAlgorithm::BcryptPlus,
            cookie_ttl_secs: DEFAULT_COOKIE_TTL_SECS,
            cookie_secret: None,
            min_confirmation_code_length: DEFAULT_MIN_CODE_LENGTH,
            permissions: PermissionTable::default(),
        }
    }
}

impl Settings {
    /// Defaults, then the given TOML file (if present), then `PERMGATE_*` variables
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load settings from `permgate.toml` and the environment
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from an explicit file and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let settings: Settings = Self::figment(path)
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the auth core cannot work with
    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(AppError::Config(format!(
                "unknown log level {}",
                self.log_level
            )));
        }

        if !(1..=MAX_CODE_LENGTH).contains(&self.min_confirmation_code_length) {
            return Err(AppError::Config(format!(
                "min_confirmation_code_length must be between 1 and {MAX_CODE_LENGTH}"
            )));
        }

        if self.cookie_secret.as_deref() == Some("") {
            return Err(AppError::Config("cookie_secret must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Immutable runtime configuration of the auth core
#[derive(Clone)]
pub struct AuthConfig {
    secret: Zeroizing<String>,
    pub hasher: CredentialHasher,
    pub policy: PasswordPolicy,
    pub codes: ConfirmationCodeGenerator,
    pub permissions: PermissionTable,
    pub cookie_ttl_secs: u64,
}

impl AuthConfig {
    /// Defaults for everything except the algorithm and secret
    pub fn new(algorithm: PasswordAlgorithm, secret: impl Into<String>) -> Self {
        let secret = Zeroizing::new(secret.into());
        Self {
            hasher: CredentialHasher::new(algorithm, secret.as_str()),
            secret,
            policy: PasswordPolicy::default(),
            codes: ConfirmationCodeGenerator::default(),
            permissions: PermissionTable::default(),
            cookie_ttl_secs: DEFAULT_COOKIE_TTL_SECS,
        }
    }

    /// Build from settings, generating a secret if none is configured
    pub fn from_settings(settings: &Settings) -> Self {
        let secret = settings.cookie_secret.clone().unwrap_or_else(generate_secret);
        Self {
            codes: ConfirmationCodeGenerator::new(settings.min_confirmation_code_length),
            permissions: settings.permissions.clone(),
            cookie_ttl_secs: settings.cookie_ttl_secs,
            ..Self::new(settings.password_algorithm, secret)
        }
    }

    /// Use a different bcrypt cost factor
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.hasher = self.hasher.with_cost(cost);
        self
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn algorithm(&self) -> PasswordAlgorithm {
        self.hasher.algorithm()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("hasher", &self.hasher)
            .field("policy", &self.policy)
            .field("codes", &self.codes)
            .field("permissions", &self.permissions)
            .field("cookie_ttl_secs", &self.cookie_ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod config_tests;
