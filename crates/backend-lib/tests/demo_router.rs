//! Drives the demo router end to end: register, confirm, log in, gain admin
//! rights and log out again, checking the permission gate at each step.
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{COOKIE, SET_COOKIE},
        Request, StatusCode,
    },
    Router,
};
use permgate::{
    config::AuthConfig,
    create_router,
    router::open_demo_paths,
    storage::{FlatFileStore, MemoryStore, UserStore},
    users::UserState,
    AppState,
};
use permgate_common::PasswordAlgorithm;
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(store: Arc<dyn UserStore>) -> Router {
    let config = AuthConfig::new(PasswordAlgorithm::BcryptPlus, "integration").with_bcrypt_cost(4);
    let users = Arc::new(UserState::new(store, config));
    users.update_permissions(open_demo_paths);
    create_router(AppState::new(users))
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: String,
}

async fn get(app: &Router, path: &str, cookie: Option<&str>) -> Reply {
    let mut request = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    Reply {
        status,
        set_cookie,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

async fn walkthrough(app: Router) {
    let index = get(&app, "/", None).await;
    assert_eq!(index.status, StatusCode::OK);
    assert!(index.body.contains("User is not registered"));

    let register = get(&app, "/register", None).await;
    assert_eq!(register.status, StatusCode::OK);
    assert!(register.body.contains("User bob was created"));

    // a second registration finds the name taken
    let again = get(&app, "/register", None).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert!(again.body.contains("USER_001"));

    let confirm = get(&app, "/confirm", None).await;
    assert!(confirm.body.contains("confirmed: true"));

    assert_eq!(get(&app, "/data", None).await.status, StatusCode::FORBIDDEN);

    let login = get(&app, "/login", None).await;
    assert_eq!(login.status, StatusCode::OK);
    let set_cookie = login.set_cookie.expect("login sets a cookie");
    assert!(set_cookie.starts_with("user="));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let data = get(&app, "/data", Some(&cookie)).await;
    assert_eq!(data.status, StatusCode::OK);
    assert!(data.body.contains("only logged in users"));

    let denied = get(&app, "/admin", Some(&cookie)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert!(denied.body.contains("Permission denied."));
    assert!(denied.body.contains("AUTH_002"));

    get(&app, "/makeadmin", Some(&cookie)).await;
    let admin = get(&app, "/admin", Some(&cookie)).await;
    assert_eq!(admin.status, StatusCode::OK);
    assert!(admin.body.contains("list of all users: bob"));

    let index = get(&app, "/", Some(&cookie)).await;
    assert!(index.body.contains("*admin rights*: true"));

    let clear = get(&app, "/clear", Some(&cookie)).await;
    assert!(clear.set_cookie.unwrap().contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));

    let logout = get(&app, "/logout", Some(&cookie)).await;
    assert!(logout.body.contains("logged out: true"));
    assert_eq!(get(&app, "/data", Some(&cookie)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(get(&app, "/admin", Some(&cookie)).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_walkthrough_memory_store() {
    walkthrough(app_with(Arc::new(MemoryStore::new()))).await;
}

#[tokio::test]
async fn test_walkthrough_flat_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = FlatFileStore::new(dir.path()).unwrap();
    walkthrough(app_with(Arc::new(store))).await;
}

#[tokio::test]
async fn test_unlisted_path_is_denied() {
    let app = app_with(Arc::new(MemoryStore::new()));

    assert_eq!(get(&app, "/unlisted", None).await.status, StatusCode::FORBIDDEN);
    // prefix matching is plain string-prefix
    assert_eq!(get(&app, "/administrator", None).await.status, StatusCode::FORBIDDEN);
    assert_eq!(get(&app, "/robots.txt", None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_forged_cookie_is_denied() {
    let app = app_with(Arc::new(MemoryStore::new()));
    get(&app, "/register", None).await;
    get(&app, "/login", None).await;

    let forged = "user=Ym9i|4102444800|00";
    assert_eq!(get(&app, "/data", Some(forged)).await.status, StatusCode::FORBIDDEN);
}
