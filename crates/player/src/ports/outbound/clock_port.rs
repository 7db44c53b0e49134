//! Clock port - Interface for time operations
//!
//! Abstracts wall-clock access so request bookkeeping can be tested with a
//! fixed time.

use chrono::{DateTime, Utc};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ClockPort: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}
