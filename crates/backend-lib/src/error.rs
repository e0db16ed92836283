// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use crate::auth::{ExhaustedAttempts, HashingFailure, PolicyError, TokenError};
use crate::storage::StoreError;
use crate::validation::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Password rejected: {0}")]
    Validation(#[from] PolicyError),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error(transparent)]
    Hashing(#[from] HashingFailure),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Permission denied.")]
    PermissionDenied,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Concurrent update: {0}")]
    Conflict(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    ExhaustedAttempts(#[from] ExhaustedAttempts),

    #[error("Storage error: {0}")]
    Storage(StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => AppError::NotFound(key),
            conflict @ StoreError::Conflict { .. } => AppError::Conflict(conflict.to_string()),
            other => AppError::Storage(other),
        }
    }
}

/// Every token failure is reported as a plain "not authenticated"
impl From<TokenError> for AppError {
    fn from(_: TokenError) -> Self {
        AppError::Unauthenticated
    }
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(e) => e.code(),
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Hashing(_) => "HASH_001",
            AppError::Unauthenticated => "AUTH_001",
            AppError::PermissionDenied => "AUTH_002",
            AppError::NotFound(_) => "NF_001",
            AppError::Conflict(_) => "STORE_002",
            AppError::AlreadyExists(_) => "USER_001",
            AppError::ExhaustedAttempts(_) => "CODE_001",
            AppError::Storage(_) => "STORE_001",
            AppError::Config(_) => "CFG_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            // policy and input messages are meant for the user
            AppError::Validation(e) => e.to_string(),
            AppError::InvalidInput(e) => e.to_string(),
            AppError::Unauthenticated => "Authentication failed".to_string(),
            AppError::PermissionDenied => "Permission denied.".to_string(),
            AppError::NotFound(_) => "No such user".to_string(),
            AppError::Conflict(_) => "The record was modified concurrently, try again".to_string(),
            AppError::AlreadyExists(_) => "Username is already taken".to_string(),
            _ => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
