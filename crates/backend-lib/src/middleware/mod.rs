// crates/backend-lib/src/middleware/mod.rs

//! Permission middleware.
//!
//! Every request is classified against the current [`PermissionTable`]
//! (admin, user and public path prefixes, root and default-closed rules).
//! Logged-in and admin state come from the `user` cookie and the store.
//! Denied requests are answered by the [`DenyHandler`] held in [`AppState`].
//!
//! [`PermissionTable`]: crate::permissions::PermissionTable
use crate::error::AppError;
use crate::metrics::PERMISSION_DENIED;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use std::sync::Arc;
use tracing::debug;

/// Builds the response for a denied request
pub type DenyHandler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// 403 with the standard `Permission denied.` error body
pub fn default_deny(_request: &Request) -> Response {
    AppError::PermissionDenied.into_response()
}

/// Reject requests the permission table does not allow
pub async fn require_permission(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let users = &state.users;
    let (logged_in, admin) = match users.username_from_headers(request.headers()) {
        Ok(username) => {
            let logged_in = users.is_logged_in(&username).await;
            (logged_in, logged_in && users.is_admin(&username).await)
        },
        Err(_) => (false, false),
    };

    let path = request.uri().path();
    let decision = users.config().permissions.decide(path, logged_in, admin);
    if decision.is_allowed() {
        return next.run(request).await;
    }

    counter!(PERMISSION_DENIED).increment(1);
    debug!(path, logged_in, admin, "permission denied");
    (state.deny)(&request)
}
