// ============================
// crates/backend-lib/src/router.rs
// ============================
//! Demo router: a single user `bob` walked through registration,
//! confirmation, login and administrator rights, behind the permission
//! middleware.
use crate::error::AppError;
use crate::middleware::require_permission;
use crate::permissions::{PermissionTable, Tier};
use crate::users::{NewUser, Status, UserProperty};
use crate::AppState;
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

pub const DEMO_USER: &str = "bob";
const DEMO_EMAIL: &str = "bob@zombo.com";
const DEMO_PASSWORD: &str = "Hunter2-hunter2";

/// Demo actions reachable without logging in, on top of the default public paths
pub const DEMO_PUBLIC_PATHS: [&str; 5] = ["/confirm", "/remove", "/logout", "/makeadmin", "/clear"];

/// Open the demo actions in a permission table
pub fn open_demo_paths(table: &mut PermissionTable) {
    for path in DEMO_PUBLIC_PATHS {
        if !table.paths(Tier::Public).iter().any(|p| p == path) {
            table.add_path(Tier::Public, path);
        }
    }
}

/// Build the demo application
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/register", get(register))
        .route("/confirm", get(confirm))
        .route("/remove", get(remove))
        .route("/login", get(login))
        .route("/logout", get(logout))
        .route("/makeadmin", get(make_admin))
        .route("/clear", get(clear))
        .route("/data", get(data))
        .route("/admin", get(admin))
        // not route_layer: unmatched paths must be classified too
        .layer(from_fn_with_state(state.clone(), require_permission))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn flag(state: &AppState, property: UserProperty) -> Result<bool, AppError> {
    let value = state.users.status(DEMO_USER, property).await?;
    Ok(value.as_flag().unwrap_or(false))
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> String {
    let mut out = match state.users.get_user(DEMO_USER).await {
        Ok(user) => format!(
            "Has user bob: true\nUser is active: {}\nLogged in on server: {}\nIs confirmed: {}\n",
            user.active, user.loggedin, user.confirmed
        ),
        Err(_) => "User is not registered\n".to_string(),
    };
    out.push_str(&format!(
        "Current user is logged in, has a valid cookie and *admin rights*: {}\n",
        state.users.admin_rights(&headers).await
    ));
    out.push_str("\nTry: /register, /confirm, /remove, /login, /logout, /makeadmin, /clear, /data and /admin");
    out
}

async fn register(State(state): State<AppState>) -> Result<String, AppError> {
    let user = state
        .users
        .add_user(NewUser {
            username: DEMO_USER.to_string(),
            password: DEMO_PASSWORD.to_string(),
            email: DEMO_EMAIL.to_string(),
            name: "Bob".to_string(),
        })
        .await?;
    Ok(format!("User {} was created\n", user.username))
}

async fn confirm(State(state): State<AppState>) -> Result<String, AppError> {
    state.users.confirm(DEMO_USER).await?;
    Ok(format!(
        "User bob was confirmed: {}\n",
        flag(&state, UserProperty::Confirmed).await?
    ))
}

async fn remove(State(state): State<AppState>) -> Result<String, AppError> {
    state.users.set_status(DEMO_USER, Status::Active(false)).await?;
    Ok(format!(
        "User bob is active: {}\n",
        flag(&state, UserProperty::Active).await?
    ))
}

async fn login(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cookie = state.users.login(DEMO_USER).await?;
    let body = format!(
        "bob is now logged in: {}\n",
        flag(&state, UserProperty::LoggedIn).await?
    );
    Ok(([(SET_COOKIE, cookie)], body))
}

async fn logout(State(state): State<AppState>) -> Result<String, AppError> {
    state.users.logout(DEMO_USER).await?;
    Ok(format!(
        "bob is now logged out: {}\n",
        !flag(&state, UserProperty::LoggedIn).await?
    ))
}

async fn make_admin(State(state): State<AppState>) -> Result<String, AppError> {
    state.users.set_status(DEMO_USER, Status::Admin(true)).await?;
    Ok(format!(
        "bob is now administrator: {}\n",
        flag(&state, UserProperty::Admin).await?
    ))
}

async fn clear(State(state): State<AppState>) -> impl IntoResponse {
    ([(SET_COOKIE, state.users.clear_cookie())], "Cleared cookie")
}

async fn data() -> &'static str {
    "user page that only logged in users must see!"
}

async fn admin(State(state): State<AppState>) -> Result<String, AppError> {
    let usernames = state.users.all_usernames().await?;
    Ok(format!(
        "super secret information that only logged in administrators must see!\n\nlist of all users: {}",
        usernames.join(", ")
    ))
}
