//! Reminder Scheduling
//!
//! Turns sleep records and a location into the two daily reminders:
//!
//! - **Sunlight**: 30 minutes before sunrise
//! - **Coffee**: 90 minutes after average wake time
//!
//! ## Modules
//!
//! - [`solar`]: sunrise/sunset for a date and location
//! - [`alerts`]: pure reminder arithmetic
//! - [`scheduler`]: per-user state and the background ticker

pub mod alerts;
pub mod scheduler;
pub mod solar;

pub use alerts::{compute, AlertOffsets, Location, NextAlerts};
pub use scheduler::{FiredReminder, ReminderKind, ReminderScheduler, ScheduleStatus};

use thiserror::Error;

/// Errors from reminder scheduling
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),
}
