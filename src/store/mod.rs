//! User Store
//!
//! SQLite-backed persistence for Light90 users: WHOOP tokens plus the raw
//! profile blob. The only write path is an upsert keyed by WHOOP user id.

mod error;
mod users;

pub use error::{StoreError, StoreResult};
pub use users::{User, UserStore};
