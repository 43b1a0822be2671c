//! Control Event
//!
//! One [`ControlEvent`] is produced per tick by the scheduling harness and
//! carries everything the features need to know about that tick:
//!
//! ```text
//! ControlEvent
//! ├── timestamp                wall clock, epoch seconds
//! ├── filtered_air             smoothed air temperature (alarms)
//! ├── raw_air, raw_evap        unsmoothed readings (daily statistics)
//! ├── relay_on                 relay state during the elapsed period
//! ├── dt_seconds               time since the previous tick
//! ├── tick_start_ms            monotonic start of this tick
//! ├── freeze_protection_started
//! └── relay                    commanded vs. reported state, if known
//! ```
//!
//! Temperatures are `Option<f32>`: `None` means the sensor is absent or the
//! read failed. They are never coerced to zero. Non-finite values that slip
//! through are treated the same as `None` by every consumer.

use crate::{
    relay::RelayObservation,
    time::{Millis, Timestamp},
};

/// Inputs of one control tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlEvent {
    pub timestamp: Timestamp,
    pub filtered_air: Option<f32>,
    pub raw_air: Option<f32>,
    pub raw_evap: Option<f32>,
    pub relay_on: bool,
    pub dt_seconds: f32,
    pub tick_start_ms: Millis,
    /// Freeze protection engaged during this tick
    pub freeze_protection_started: bool,
    pub relay: Option<RelayObservation>,
}

impl ControlEvent {
    /// Event with no readings and no elapsed time
    pub fn new(timestamp: Timestamp, tick_start_ms: Millis) -> Self {
        Self {
            timestamp,
            filtered_air: None,
            raw_air: None,
            raw_evap: None,
            relay_on: false,
            dt_seconds: 0.0,
            tick_start_ms,
            freeze_protection_started: false,
            relay: None,
        }
    }

    /// Set the air temperature, filtered and raw
    pub fn with_air(mut self, filtered: Option<f32>, raw: Option<f32>) -> Self {
        self.filtered_air = filtered;
        self.raw_air = raw;
        self
    }

    pub fn with_evap(mut self, raw: Option<f32>) -> Self {
        self.raw_evap = raw;
        self
    }

    pub fn with_relay(mut self, relay_on: bool, dt_seconds: f32) -> Self {
        self.relay_on = relay_on;
        self.dt_seconds = dt_seconds;
        self
    }

    pub fn with_freeze_protection(mut self, started: bool) -> Self {
        self.freeze_protection_started = started;
        self
    }

    pub fn with_relay_observation(mut self, observation: RelayObservation) -> Self {
        self.relay = Some(observation);
        self
    }
}

/// Drop non-finite readings
pub(crate) fn finite(reading: Option<f32>) -> Option<f32> {
    reading.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let event = ControlEvent::new(100, 5000)
            .with_air(Some(4.2), Some(4.5))
            .with_evap(Some(-18.0))
            .with_relay(true, 5.0)
            .with_freeze_protection(true);

        assert_eq!(event.filtered_air, Some(4.2));
        assert_eq!(event.raw_air, Some(4.5));
        assert_eq!(event.raw_evap, Some(-18.0));
        assert!(event.relay_on);
        assert_eq!(event.dt_seconds, 5.0);
        assert!(event.freeze_protection_started);
        assert!(event.relay.is_none());
    }

    #[test]
    fn non_finite_is_absent() {
        assert_eq!(finite(Some(f32::NAN)), None);
        assert_eq!(finite(Some(f32::NEG_INFINITY)), None);
        assert_eq!(finite(Some(1.5)), Some(1.5));
    }
}
