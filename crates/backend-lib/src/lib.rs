// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Session and authorization core: credential hashing, password policy,
//! signed session cookies, confirmation codes and path-prefix permissions,
//! with a user store abstraction and an axum permission middleware.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod permissions;
pub mod router;
pub mod storage;
pub mod users;
pub mod validation;

use crate::config::{AuthConfig, Settings, StoreKind};
use crate::error::AppError;
use crate::middleware::{default_deny, DenyHandler};
use crate::storage::{FlatFileStore, MemoryStore, UserStore};
use crate::users::UserState;
use axum::{extract::Request, response::Response};
use std::sync::Arc;
use tracing::info;

pub use crate::permissions::{Decision, PermissionTable, Tier};
pub use crate::router::create_router;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// User state service
    pub users: Arc<UserState>,
    /// Response for requests the permission table denies
    pub deny: DenyHandler,
}

impl AppState {
    pub fn new(users: Arc<UserState>) -> Self {
        Self {
            users,
            deny: Arc::new(default_deny),
        }
    }

    /// Replace the response sent for denied requests
    pub fn with_deny_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.deny = Arc::new(handler);
        self
    }

    /// Open the configured store and build the auth configuration
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let store: Arc<dyn UserStore> = match settings.store {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::File => Arc::new(FlatFileStore::new(&settings.data_dir)?),
        };
        if settings.cookie_secret.is_none() {
            info!("no cookie_secret configured, generated one; cookies will not survive a restart");
        }

        let users = UserState::new(store, AuthConfig::from_settings(settings));
        Ok(Self::new(Arc::new(users)))
    }
}
