//! Browser Sessions
//!
//! Server-side sessions keyed by an opaque cookie. A session starts
//! anonymous, carries the OAuth `state` during login, and is bound to a
//! WHOOP user id once the callback succeeds.

mod cookie;
mod store;

pub use cookie::{clear_cookie, session_cookie, session_id, SESSION_COOKIE};
pub use store::{Session, SessionStore, DEFAULT_LOGIN_TTL_MINUTES};
