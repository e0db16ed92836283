// ============================
// crates/backend-lib/src/users.rs
// ============================
//! User state: registration, status flags, password checks, confirmation
//! codes and login sessions on top of a [`UserStore`].
//!
//! Every status setter is a get, a single-field mutation and a conditional
//! put. Two writers racing on the same user surface as
//! [`AppError::Conflict`] for the loser; nothing is retried here.
use crate::auth::{
    cookie_value, expired_cookie, session_cookie, CredentialHasher, SessionToken, SESSION_COOKIE,
};
use crate::config::AuthConfig;
use crate::error::AppError;
use crate::metrics::{LOGIN_FAILURE, LOGIN_SUCCESS, TOKEN_REJECTED, USER_CONFIRMED, USER_REGISTERED};
use crate::permissions::PermissionTable;
use crate::storage::{ProjectionQuerier, StoreError, UserStore};
use crate::validation::{require, validate_email, validate_username, ValidationError};
use axum::http::HeaderMap;
use metrics::counter;
use parking_lot::RwLock;
use permgate_common::{User, UserField, UserFilter};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cookie path for the login cookie
pub const COOKIE_PATH: &str = "/";

/// Registration request
#[derive(Clone, Default, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A readable user property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserProperty {
    Admin,
    Confirmed,
    ConfirmationCode,
    LoggedIn,
    Password,
    Active,
    Email,
    Username,
    Name,
}

/// Value of a [`UserProperty`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusValue {
    Flag(bool),
    Text(String),
}

impl StatusValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            StatusValue::Flag(b) => Some(*b),
            StatusValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StatusValue::Text(s) => Some(s),
            StatusValue::Flag(_) => None,
        }
    }
}

/// A single-field update
#[derive(Clone, PartialEq, Eq)]
pub enum Status {
    Confirmed(bool),
    Admin(bool),
    LoggedIn(bool),
    /// Re-activating a user also logs them out
    Active(bool),
    Email(String),
    /// Plaintext; checked against the password policy and hashed
    Password(String),
}

impl std::fmt::Debug for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Confirmed(b) => f.debug_tuple("Confirmed").field(b).finish(),
            Status::Admin(b) => f.debug_tuple("Admin").field(b).finish(),
            Status::LoggedIn(b) => f.debug_tuple("LoggedIn").field(b).finish(),
            Status::Active(b) => f.debug_tuple("Active").field(b).finish(),
            Status::Email(e) => f.debug_tuple("Email").field(e).finish(),
            Status::Password(_) => f.write_str("Password(..)"),
        }
    }
}

/// User state shared by the handlers and the permission middleware
pub struct UserState {
    store: Arc<dyn UserStore>,
    config: RwLock<Arc<AuthConfig>>,
}

impl UserState {
    pub fn new(store: Arc<dyn UserStore>, config: AuthConfig) -> Self {
        Self {
            store,
            config: RwLock::new(Arc::new(config)),
        }
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Arc<AuthConfig> {
        self.config.read().clone()
    }

    /// Replace the whole configuration. In-flight operations keep their snapshot.
    pub fn swap_config(&self, config: AuthConfig) {
        *self.config.write() = Arc::new(config);
        info!("auth configuration replaced");
    }

    /// Copy-on-write edit of the permission table
    pub fn update_permissions<F>(&self, edit: F)
    where
        F: FnOnce(&mut PermissionTable),
    {
        let mut guard = self.config.write();
        let mut config = AuthConfig::clone(&guard);
        edit(&mut config.permissions);
        *guard = Arc::new(config);
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    fn projection(&self) -> Result<&dyn ProjectionQuerier, AppError> {
        self.store
            .as_projection()
            .ok_or_else(|| StoreError::Unsupported("projection queries").into())
    }

    /// Register a new user, stored under its username
    pub async fn add_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let email = require("email", &new_user.email)?;
        let username = require("username", &new_user.username)?;
        let password = require("password", &new_user.password)?;
        validate_username(username)?;
        validate_email(email)?;

        let config = self.config();
        config.policy.validate(username, password)?;
        if self.has_user(username).await? {
            return Err(AppError::AlreadyExists(username.to_string()));
        }

        let hashed = hash_blocking(config.hasher.clone(), username, password).await?;
        let confirmation_code = self.generate_unique_confirmation_code().await?;

        let mut user = User {
            email: email.to_string(),
            username: username.to_string(),
            name: new_user.name,
            password: hashed,
            confirmation_code,
            confirmed: false,
            admin: false,
            loggedin: false,
            active: true,
            ..User::default()
        };
        // another registration can still land between the check and the put
        user.version = match self.store.put(username, user.clone()).await {
            Ok(version) => version,
            Err(StoreError::Conflict { expected: 0, .. }) => {
                return Err(AppError::AlreadyExists(username.to_string()))
            },
            Err(e) => return Err(e.into()),
        };

        counter!(USER_REGISTERED).increment(1);
        info!(username, "user registered");
        Ok(user)
    }

    pub async fn has_user(&self, username: &str) -> Result<bool, AppError> {
        match self.store.get(username).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user(&self, username: &str) -> Result<User, AppError> {
        Ok(self.store.get(username).await?)
    }

    pub async fn remove_user(&self, username: &str) -> Result<(), AppError> {
        self.store.del(username).await?;
        info!(username, "user removed");
        Ok(())
    }

    pub async fn status(&self, username: &str, property: UserProperty) -> Result<StatusValue, AppError> {
        let user = self.store.get(username).await?;
        Ok(match property {
            UserProperty::Admin => StatusValue::Flag(user.admin),
            UserProperty::Confirmed => StatusValue::Flag(user.confirmed),
            UserProperty::LoggedIn => StatusValue::Flag(user.loggedin),
            UserProperty::Active => StatusValue::Flag(user.active),
            UserProperty::ConfirmationCode => StatusValue::Text(user.confirmation_code),
            UserProperty::Password => StatusValue::Text(user.password),
            UserProperty::Email => StatusValue::Text(user.email),
            UserProperty::Username => StatusValue::Text(user.username),
            UserProperty::Name => StatusValue::Text(user.name),
        })
    }

    pub async fn set_status(&self, username: &str, status: Status) -> Result<(), AppError> {
        debug!(username, ?status, "set user status");
        let hashed = match &status {
            Status::Password(password) => {
                let config = self.config();
                config.policy.validate(username, password)?;
                Some(hash_blocking(config.hasher.clone(), username, password).await?)
            },
            _ => None,
        };

        self.update(username, move |user| match status {
            Status::Confirmed(b) => user.confirmed = b,
            Status::Admin(b) => user.admin = b,
            Status::LoggedIn(b) => user.loggedin = b,
            Status::Active(b) => {
                user.active = b;
                if b {
                    user.loggedin = false;
                }
            },
            Status::Email(email) => user.email = email,
            Status::Password(_) => {
                if let Some(hashed) = hashed {
                    user.password = hashed;
                }
            },
        })
        .await
    }

    async fn update<F>(&self, username: &str, mutate: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut User),
    {
        let mut user = self.store.get(username).await?;
        mutate(&mut user);
        match self.store.put(username, user).await {
            Ok(_) => Ok(()),
            Err(e @ StoreError::Conflict { .. }) => {
                warn!(username, error = %e, "concurrent user update rejected");
                Err(e.into())
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn flag(&self, username: &str, property: UserProperty) -> bool {
        match self.status(username, property).await {
            Ok(value) => value.as_flag().unwrap_or(false),
            Err(AppError::NotFound(_)) => false,
            Err(e) => {
                warn!(username, error = %e, "user lookup failed");
                false
            },
        }
    }

    pub async fn is_logged_in(&self, username: &str) -> bool {
        self.flag(username, UserProperty::LoggedIn).await
    }

    pub async fn is_admin(&self, username: &str) -> bool {
        self.flag(username, UserProperty::Admin).await
    }

    pub async fn is_confirmed(&self, username: &str) -> bool {
        self.flag(username, UserProperty::Confirmed).await
    }

    pub async fn all_usernames(&self) -> Result<Vec<String>, AppError> {
        Ok(self.projection()?.get_all(UserField::Username).await?)
    }

    pub async fn all_unconfirmed_usernames(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .projection()?
            .get_all_filtered(UserField::Username, UserFilter::Confirmed(false))
            .await?)
    }

    /// Hash a password with the configured algorithm
    pub async fn hash_password(&self, username: &str, password: &str) -> Result<String, AppError> {
        hash_blocking(self.config().hasher.clone(), username, password).await
    }

    /// Check a password. Unknown users and users without a hash both yield `false`
    /// after the same amount of hashing work as a real check.
    pub async fn correct_password(&self, username: &str, password: &str) -> bool {
        let stored = match self.store.get(username).await {
            Ok(user) => user.password,
            Err(_) => String::new(),
        };

        let hasher = self.config().hasher.clone();
        let (user, pass) = (username.to_string(), password.to_string());
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&stored, &user, &pass))
            .await
            .unwrap_or(false);

        if !ok {
            counter!(LOGIN_FAILURE).increment(1);
            debug!(username, "password check failed");
        }
        ok
    }

    /// Whether an unconfirmed user currently holds this code
    pub async fn confirmation_code_in_use(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.pending_codes().await?.contains(code))
    }

    async fn pending_codes(&self) -> Result<HashSet<String>, AppError> {
        let codes = self
            .projection()?
            .get_all_filtered(UserField::ConfirmationCode, UserFilter::Confirmed(false))
            .await?;
        Ok(codes.into_iter().collect())
    }

    pub async fn generate_unique_confirmation_code(&self) -> Result<String, AppError> {
        let in_use = self.pending_codes().await?;
        let code = self.config().codes.generate(|code| in_use.contains(code))?;
        Ok(code)
    }

    /// Username of the unconfirmed user holding `code`
    pub async fn find_user_by_confirmation_code(&self, code: &str) -> Result<String, AppError> {
        if code.is_empty() {
            return Err(ValidationError::MissingField("confirmation code").into());
        }
        for username in self.all_unconfirmed_usernames().await? {
            match self.store.get(&username).await {
                Ok(user) if user.confirmation_code == code => return Ok(username),
                Ok(_) | Err(StoreError::NotFound(_)) => {},
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::NotFound("confirmation code".to_string()))
    }

    pub async fn confirm(&self, username: &str) -> Result<(), AppError> {
        self.set_status(username, Status::Confirmed(true)).await?;
        counter!(USER_CONFIRMED).increment(1);
        info!(username, "user confirmed");
        Ok(())
    }

    /// Confirm the user holding `code`; the code cannot be used again
    pub async fn confirm_user_by_confirmation_code(&self, code: &str) -> Result<String, AppError> {
        let username = self.find_user_by_confirmation_code(code).await?;
        self.update(&username, |user| {
            user.confirmed = true;
            user.confirmation_code.clear();
        })
        .await?;
        counter!(USER_CONFIRMED).increment(1);
        info!(username = %username, "user confirmed by code");
        Ok(username)
    }

    /// Mark the user as logged in and return the `Set-Cookie` value
    pub async fn login(&self, username: &str) -> Result<String, AppError> {
        require("username", username)?;
        self.set_status(username, Status::LoggedIn(true)).await?;

        let config = self.config();
        let token = SessionToken::issue(username, config.secret())
            .map_err(|e| AppError::Config(e.to_string()))?;

        counter!(LOGIN_SUCCESS).increment(1);
        info!(username, "user logged in");
        Ok(session_cookie(
            SESSION_COOKIE,
            &token.encode(),
            COOKIE_PATH,
            config.cookie_ttl_secs,
        ))
    }

    pub async fn logout(&self, username: &str) -> Result<(), AppError> {
        self.set_status(username, Status::LoggedIn(false)).await?;
        info!(username, "user logged out");
        Ok(())
    }

    /// `Set-Cookie` value that removes the login cookie
    pub fn clear_cookie(&self) -> String {
        expired_cookie(SESSION_COOKIE, COOKIE_PATH)
    }

    /// Username carried by a valid login cookie
    pub fn username_from_headers(&self, headers: &HeaderMap) -> Result<String, AppError> {
        let token = cookie_value(headers, SESSION_COOKIE).ok_or(AppError::Unauthenticated)?;
        match SessionToken::decode(&token, self.config().secret()) {
            Ok(session) => Ok(session.payload),
            Err(e) => {
                counter!(TOKEN_REJECTED).increment(1);
                warn!(error = %e, "session token rejected");
                Err(e.into())
            },
        }
    }

    /// Valid cookie and the user is logged in
    pub async fn user_rights(&self, headers: &HeaderMap) -> bool {
        match self.username_from_headers(headers) {
            Ok(username) => self.is_logged_in(&username).await,
            Err(_) => false,
        }
    }

    /// Valid cookie, logged in and an administrator
    pub async fn admin_rights(&self, headers: &HeaderMap) -> bool {
        match self.username_from_headers(headers) {
            Ok(username) => self.is_logged_in(&username).await && self.is_admin(&username).await,
            Err(_) => false,
        }
    }
}

async fn hash_blocking(
    hasher: CredentialHasher,
    username: &str,
    password: &str,
) -> Result<String, AppError> {
    let (username, password) = (username.to_string(), password.to_string());
    let hashed = tokio::task::spawn_blocking(move || hasher.hash(&username, &password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(hashed)
}
