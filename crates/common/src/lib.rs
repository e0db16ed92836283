// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the `permgate` library, its store adapters and the demo server.
//! This module defines the user record and the typed projection/filter selectors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version counter used for optimistic concurrency on stored records
pub type Version = u64;

/// A registered user as persisted by a user store
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    /// Contact address
    pub email: String,
    /// Login name (the store key)
    pub username: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Password hash, never plaintext once stored
    pub password: String,
    /// Profile photo URL
    #[serde(default)]
    pub photo_url: String,
    /// Code mailed out for account confirmation
    #[serde(default)]
    pub confirmation_code: String,
    /// Whether the account has been confirmed
    #[serde(default)]
    pub confirmed: bool,
    /// Whether the user holds administrator rights
    #[serde(default)]
    pub admin: bool,
    /// Whether the user is currently logged in
    #[serde(default)]
    pub loggedin: bool,
    /// Whether the account is active
    #[serde(default)]
    pub active: bool,
    /// Store-managed record version. 0 means "not yet stored".
    #[serde(default)]
    pub version: Version,
}

impl User {
    /// Project a string field out of the record
    pub fn field(&self, field: UserField) -> &str {
        match field {
            UserField::Email => &self.email,
            UserField::Username => &self.username,
            UserField::Name => &self.name,
            UserField::Password => &self.password,
            UserField::PhotoUrl => &self.photo_url,
            UserField::ConfirmationCode => &self.confirmation_code,
        }
    }

    /// Check whether the record satisfies a filter
    pub fn matches(&self, filter: UserFilter) -> bool {
        match filter {
            UserFilter::Confirmed(v) => self.confirmed == v,
            UserFilter::Admin(v) => self.admin == v,
            UserFilter::LoggedIn(v) => self.loggedin == v,
            UserFilter::Active(v) => self.active == v,
        }
    }
}

/// String-valued fields that can be projected by a store query
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserField {
    Email,
    Username,
    Name,
    Password,
    PhotoUrl,
    ConfirmationCode,
}

/// Boolean predicates a projection query can be filtered by
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserFilter {
    Confirmed(bool),
    Admin(bool),
    LoggedIn(bool),
    Active(bool),
}

/// Password hashing algorithm selection
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PasswordAlgorithm {
    /// Store and check with bcrypt
    #[serde(rename = "bcrypt")]
    Bcrypt,
    /// Store and check with a salted sha256 digest
    #[serde(rename = "sha256")]
    Sha256,
    /// Store with bcrypt, check with both bcrypt and legacy sha256
    #[default]
    #[serde(rename = "bcrypt+")]
    BcryptPlus,
}

impl PasswordAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            PasswordAlgorithm::Bcrypt => "bcrypt",
            PasswordAlgorithm::Sha256 => "sha256",
            PasswordAlgorithm::BcryptPlus => "bcrypt+",
        }
    }
}

impl fmt::Display for PasswordAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown algorithm name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0} is an unsupported password hashing algorithm")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for PasswordAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bcrypt" => Ok(PasswordAlgorithm::Bcrypt),
            "sha256" => Ok(PasswordAlgorithm::Sha256),
            "bcrypt+" => Ok(PasswordAlgorithm::BcryptPlus),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}
