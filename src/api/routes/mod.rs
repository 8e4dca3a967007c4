//! API Routes
//!
//! Route handlers organized by functionality.

pub mod auth;
pub mod health;
pub mod profile;
pub mod schedule;
pub mod sleep;
