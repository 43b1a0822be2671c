//! Duty-cycle accounting for the adaptive controller
//!
//! The window is deliberately shorter than a day (an hour by default) so the
//! adaptive hysteresis reacts to the current load, not yesterday's.

use crate::time::Timestamp;

/// Percentage of time the relay was on; 0 when nothing was accounted
pub fn duty_percent(on_seconds: f32, off_seconds: f32) -> f32 {
    let total = on_seconds + off_seconds;
    if total > 0.0 {
        on_seconds / total * 100.0
    } else {
        0.0
    }
}

/// Whether the accounting window starting at `last_reset` has elapsed
pub fn should_reset(now: Timestamp, last_reset: Timestamp, interval_seconds: u32) -> bool {
    now.saturating_sub(last_reset) >= u64::from(interval_seconds)
}

/// Relay on/off time over the current accounting window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DutyWindow {
    pub on_seconds: f32,
    pub off_seconds: f32,
    /// Start of the window; 0 until the first tick
    pub last_reset: Timestamp,
}

impl DutyWindow {
    /// Add `dt` seconds of on- or off-time
    pub fn accumulate(&mut self, dt_seconds: f32, relay_on: bool) {
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return;
        }
        if relay_on {
            self.on_seconds += dt_seconds;
        } else {
            self.off_seconds += dt_seconds;
        }
    }

    pub fn percent(&self) -> f32 {
        duty_percent(self.on_seconds, self.off_seconds)
    }

    pub fn is_started(&self) -> bool {
        self.last_reset != 0
    }

    pub fn is_due(&self, now: Timestamp, interval_seconds: u32) -> bool {
        self.is_started() && should_reset(now, self.last_reset, interval_seconds)
    }

    /// Open the first window at `now`, keeping anything already accumulated
    pub fn start(&mut self, now: Timestamp) {
        self.last_reset = now;
    }

    /// Zero the accumulators and start a new window at `now`
    pub fn reset(&mut self, now: Timestamp) {
        *self = Self {
            on_seconds: 0.0,
            off_seconds: 0.0,
            last_reset: now,
        };
    }
}
