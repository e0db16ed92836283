// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILURE: &str = "auth.login.failure";
pub const TOKEN_REJECTED: &str = "auth.token.rejected";
pub const PERMISSION_DENIED: &str = "auth.permission.denied";
pub const USER_REGISTERED: &str = "auth.user.registered";
pub const USER_CONFIRMED: &str = "auth.user.confirmed";
