//! Session cookie encoding

use axum::http::{header, HeaderMap};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "light90.sid";

/// Session id carried by the request's `Cookie` headers, if any
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value establishing a session
pub fn session_cookie(id: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, id, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}
