// ============================
// crates/backend-lib/src/auth/cookie.rs
// ============================
//! Transport cookie for session tokens.
use axum::http::{header::COOKIE, HeaderMap};
use chrono::DateTime;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "user";

/// Login cookies last 24 hours by default
pub const DEFAULT_COOKIE_TTL_SECS: u64 = 60 * 60 * 24;

/// Expiry used for a TTL of 0 (2^31 - 1 seconds after the epoch)
const FAR_FUTURE_SECS: i64 = 2_147_483_647;

/// Placeholder value sent when clearing a cookie
const CLEARED_VALUE: &str = "deleted";

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Build a `Set-Cookie` value. `ttl_secs == 0` means effectively permanent.
pub fn session_cookie(name: &str, value: &str, path: &str, ttl_secs: u64) -> String {
    let expires_at = if ttl_secs == 0 {
        FAR_FUTURE_SECS
    } else {
        let ttl = i64::try_from(ttl_secs).unwrap_or(FAR_FUTURE_SECS);
        chrono::Utc::now().timestamp().saturating_add(ttl).min(FAR_FUTURE_SECS)
    };
    format!(
        "{name}={value}; Path={path}; Expires={}",
        http_date(expires_at)
    )
}

/// Build a `Set-Cookie` value that makes the browser drop the cookie.
/// Browsers may be configured to keep it anyway.
pub fn expired_cookie(name: &str, path: &str) -> String {
    format!(
        "{name}={CLEARED_VALUE}; Path={path}; Expires={}",
        http_date(0)
    )
}

/// Find a cookie value in the request `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn http_date(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .format(HTTP_DATE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_expired_cookie() {
        assert_eq!(
            expired_cookie("user", "/"),
            "user=deleted; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
        );
    }

    #[test]
    fn test_zero_ttl_is_far_future() {
        let cookie = session_cookie("user", "abc", "/", 0);
        assert_eq!(cookie, "user=abc; Path=/; Expires=Tue, 19 Jan 2038 03:14:07 GMT");
    }

    #[test]
    fn test_ttl_sets_future_expiry() {
        let cookie = session_cookie("user", "abc", "/test", DEFAULT_COOKIE_TTL_SECS);
        assert!(cookie.starts_with("user=abc; Path=/test; Expires="));
        assert!(cookie.ends_with(" GMT"));
    }

    #[test]
    fn test_cookie_value_lookup() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; user=d2luZDg1|1|ab"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));

        assert_eq!(cookie_value(&headers, "user").as_deref(), Some("d2luZDg1|1|ab"));
        assert_eq!(cookie_value(&headers, "other").as_deref(), Some("1"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_value_keeps_base64_padding() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("user=Ym9i|1|ff; x=y"));
        assert_eq!(cookie_value(&headers, "user").as_deref(), Some("Ym9i|1|ff"));

        headers.insert(COOKIE, HeaderValue::from_static("user=YQ==|1|ff"));
        assert_eq!(cookie_value(&headers, "user").as_deref(), Some("YQ==|1|ff"));
    }
}
