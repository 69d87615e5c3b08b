//! The `token` session cookie.

use axum::http::{header, HeaderMap};
use time::Duration;

pub const SESSION_COOKIE: &str = "token";

fn attributes(secure: bool) -> &'static str {
    if secure {
        "HttpOnly; SameSite=None; Path=/; Secure"
    } else {
        "HttpOnly; SameSite=None; Path=/"
    }
}

/// `Set-Cookie` value carrying a freshly issued session token.
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    format!(
        "{SESSION_COOKIE}={token}; {}; Max-Age={}",
        attributes(secure),
        ttl.whole_seconds().max(0)
    )
}

/// `Set-Cookie` value that empties the session cookie and expires it now.
pub fn cleared_cookie(secure: bool) -> String {
    format!(
        "{SESSION_COOKIE}=; {}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        attributes(secure)
    )
}

/// Reads the session token from the `Cookie` request header(s).
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
