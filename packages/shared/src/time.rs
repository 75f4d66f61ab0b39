//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, SecondsFormat, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get the current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given instant
    pub fn new(fixed_time: DateTime<Utc>) -> Self {
        Self { fixed_time }
    }

    /// Create a new fixed clock from Unix milliseconds
    ///
    /// Out-of-range values fall back to the Unix epoch.
    pub fn from_millis(fixed_time_millis: i64) -> Self {
        Self::new(DateTime::from_timestamp_millis(fixed_time_millis).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.fixed_time
    }
}

/// Whether a timestamp carries no information (Unix epoch or earlier).
///
/// Clients that omit `issuedAt` or send a zero value end up here.
pub fn is_unset(timestamp: &DateTime<Utc>) -> bool {
    timestamp.timestamp_millis() <= 0
}

/// Format a timestamp as RFC 3339 with millisecond precision
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
