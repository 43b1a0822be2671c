//! Time management for the control loop
//!
//! Two kinds of time flow through the controller:
//! - Wall clock ([`Timestamp`], whole seconds since the Unix epoch) for
//!   alarms, accounting windows and the daily rollover
//! - Monotonic uptime ([`Millis`]) for measuring how long a tick took
//!
//! Calendar decisions (which day is it, is it past the summary hour) are
//! made in local time, using the offset reported by the [`Clock`].

use chrono::{DateTime, FixedOffset, NaiveDateTime};

use crate::constants::MS_PER_SECOND;

/// Wall-clock timestamp in seconds since the Unix epoch
pub type Timestamp = u64;

/// Monotonic time in milliseconds (since boot)
pub type Millis = u64;

/// Source of time for the controller
///
/// Implemented by the platform layer (RTC + SNTP on the device) and by
/// [`FixedClock`] in tests.
pub trait Clock {
    /// Current wall-clock time in seconds since the epoch
    fn now(&self) -> Timestamp;

    /// Current monotonic time in milliseconds
    fn uptime_ms(&self) -> Millis;

    /// Offset of local time from UTC in seconds (east positive)
    fn utc_offset_seconds(&self) -> i32 {
        0
    }

    /// Local calendar date and time for `now()`
    fn local_now(&self) -> Option<NaiveDateTime> {
        local_datetime(self.now(), self.utc_offset_seconds())
    }
}

/// Convert an epoch timestamp to local date and time
///
/// Returns `None` when the timestamp or offset is out of chrono's range.
pub fn local_datetime(timestamp: Timestamp, utc_offset_seconds: i32) -> Option<NaiveDateTime> {
    let secs = i64::try_from(timestamp).ok()?;
    let utc = DateTime::from_timestamp(secs, 0)?;
    let offset = FixedOffset::east_opt(utc_offset_seconds)?;
    Some(utc.with_timezone(&offset).naive_local())
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemClock {
    boot: std::time::Instant,
    utc_offset_seconds: i32,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Create a clock whose uptime starts now
    pub fn new(utc_offset_seconds: i32) -> Self {
        Self {
            boot: std::time::Instant::now(),
            utc_offset_seconds,
        }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn uptime_ms(&self) -> Millis {
        self.boot.elapsed().as_millis() as Millis
    }

    fn utc_offset_seconds(&self) -> i32 {
        self.utc_offset_seconds
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    now: Timestamp,
    uptime_ms: Millis,
    utc_offset_seconds: i32,
}

impl FixedClock {
    pub fn new(now: Timestamp, uptime_ms: Millis) -> Self {
        Self {
            now,
            uptime_ms,
            utc_offset_seconds: 0,
        }
    }

    pub fn with_utc_offset(mut self, seconds: i32) -> Self {
        self.utc_offset_seconds = seconds;
        self
    }

    pub fn set(&mut self, now: Timestamp, uptime_ms: Millis) {
        self.now = now;
        self.uptime_ms = uptime_ms;
    }

    /// Move only the monotonic clock, e.g. to simulate work inside a tick
    pub fn advance_uptime_ms(&mut self, ms: u64) {
        self.uptime_ms += ms;
    }

    /// Move both clocks forward by whole seconds
    pub fn advance_secs(&mut self, secs: u64) {
        self.now += secs;
        self.uptime_ms += secs * MS_PER_SECOND;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn uptime_ms(&self) -> Millis {
        self.uptime_ms
    }

    fn utc_offset_seconds(&self) -> i32 {
        self.utc_offset_seconds
    }
}
