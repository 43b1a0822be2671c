//! Controller Configuration
//!
//! One record holds every threshold and period the control features use.
//! Loading it (flash, file, provisioning service) is the platform's job;
//! this module only defines the shape, the factory defaults and the rules a
//! loaded record must satisfy before the control loop may start.
//!
//! ```text
//! ControllerConfig
//! ├── setpoint_c, hysteresis_c
//! ├── smoothing    window_seconds, loop_period_ms
//! ├── adaptive     high/low duty %, shift range, step
//! ├── alarms       instant { threshold, delay }, sustained { threshold, delay }
//! ├── daily        summary_hour
//! ├── duty         interval_seconds
//! ├── performance  slow_threshold_ms, summary_interval_seconds
//! └── relay        timeout_seconds
//! ```
//!
//! With the `serde` feature every section deserializes with missing fields
//! filled from the defaults, so a stored record only needs the overrides.
//!
//! ```rust
//! use coolguard_core::config::ControllerConfig;
//!
//! let config = ControllerConfig::default()
//!     .with_setpoint(3.0)
//!     .with_loop_period_ms(1000.0);
//! assert!(config.validate().is_ok());
//! ```

use crate::{
    constants::{control::*, time::HOURS_PER_DAY, MAX_SMOOTHING_SAMPLES},
    errors::{ControlError, ControlResult},
    smoothing::window_len,
};

/// Moving-average window
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SmoothingConfig {
    pub window_seconds: f32,
    pub loop_period_ms: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_SMOOTHING_WINDOW_S,
            loop_period_ms: DEFAULT_LOOP_PERIOD_MS,
        }
    }
}

/// Duty-driven adaptation of the dead band
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdaptiveConfig {
    /// Duty percent above which the shift grows
    pub high_duty_pct: f32,
    /// Duty percent below which the shift shrinks
    pub low_duty_pct: f32,
    pub min_shift: f32,
    pub max_shift: f32,
    /// Shift change per step (°C)
    pub step: f32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            high_duty_pct: DEFAULT_HIGH_DUTY_PCT,
            low_duty_pct: DEFAULT_LOW_DUTY_PCT,
            min_shift: DEFAULT_MIN_SHIFT_C,
            max_shift: DEFAULT_MAX_SHIFT_C,
            step: DEFAULT_SHIFT_STEP_C,
        }
    }
}

/// One debounced threshold alarm
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlarmConfig {
    pub threshold_c: f32,
    /// Continuous breach needed before firing
    pub delay_seconds: u32,
}

/// The instant and sustained alarms
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlarmsConfig {
    pub instant: AlarmConfig,
    pub sustained: AlarmConfig,
}

impl Default for AlarmsConfig {
    fn default() -> Self {
        Self {
            instant: AlarmConfig {
                threshold_c: DEFAULT_INSTANT_ALARM_C,
                delay_seconds: DEFAULT_INSTANT_ALARM_DELAY_S,
            },
            sustained: AlarmConfig {
                threshold_c: DEFAULT_SUSTAINED_ALARM_C,
                delay_seconds: DEFAULT_SUSTAINED_ALARM_DELAY_S,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DailyConfig {
    /// Earliest local hour for the daily summary (0-23)
    pub summary_hour: u32,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            summary_hour: DEFAULT_SUMMARY_HOUR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DutyConfig {
    /// Length of the duty accounting window
    pub interval_seconds: u32,
}

impl Default for DutyConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_DUTY_INTERVAL_S,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PerformanceConfig {
    pub slow_threshold_ms: u32,
    pub summary_interval_seconds: u32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: DEFAULT_SLOW_LOOP_MS,
            summary_interval_seconds: DEFAULT_PERF_SUMMARY_INTERVAL_S,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RelayConfig {
    /// Grace period for the relay to confirm a command
    pub timeout_seconds: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_RELAY_TIMEOUT_S,
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Target temperature (°C)
    pub setpoint_c: f32,
    /// Half-width of the unshifted dead band (°C)
    pub hysteresis_c: f32,
    pub smoothing: SmoothingConfig,
    pub adaptive: AdaptiveConfig,
    pub alarms: AlarmsConfig,
    pub daily: DailyConfig,
    pub duty: DutyConfig,
    pub performance: PerformanceConfig,
    pub relay: RelayConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            setpoint_c: DEFAULT_SETPOINT_C,
            hysteresis_c: DEFAULT_HYSTERESIS_C,
            smoothing: SmoothingConfig::default(),
            adaptive: AdaptiveConfig::default(),
            alarms: AlarmsConfig::default(),
            daily: DailyConfig::default(),
            duty: DutyConfig::default(),
            performance: PerformanceConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ControlError {
    ControlError::InvalidConfig { field, reason }
}

fn ensure_finite(field: &'static str, value: f32) -> ControlResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite number"))
    }
}

impl ControllerConfig {
    pub fn with_setpoint(mut self, setpoint_c: f32) -> Self {
        self.setpoint_c = setpoint_c;
        self
    }

    pub fn with_hysteresis(mut self, hysteresis_c: f32) -> Self {
        self.hysteresis_c = hysteresis_c;
        self
    }

    pub fn with_loop_period_ms(mut self, loop_period_ms: f32) -> Self {
        self.smoothing.loop_period_ms = loop_period_ms;
        self
    }

    pub fn with_smoothing_window(mut self, window_seconds: f32) -> Self {
        self.smoothing.window_seconds = window_seconds;
        self
    }

    pub fn with_adaptive(mut self, adaptive: AdaptiveConfig) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn with_summary_hour(mut self, hour: u32) -> Self {
        self.daily.summary_hour = hour;
        self
    }

    /// Check every rule a usable configuration must satisfy
    ///
    /// The first violation is returned, naming the offending field by its
    /// dotted path.
    pub fn validate(&self) -> ControlResult<()> {
        ensure_finite("setpoint_c", self.setpoint_c)?;
        ensure_finite("hysteresis_c", self.hysteresis_c)?;
        if self.hysteresis_c < 0.0 {
            return Err(invalid("hysteresis_c", "must not be negative"));
        }

        let samples = window_len(self.smoothing.window_seconds, self.smoothing.loop_period_ms)?;
        if samples > MAX_SMOOTHING_SAMPLES {
            return Err(invalid(
                "smoothing.window_seconds",
                "window exceeds sample buffer capacity",
            ));
        }

        let adaptive = &self.adaptive;
        ensure_finite("adaptive.high_duty_pct", adaptive.high_duty_pct)?;
        ensure_finite("adaptive.low_duty_pct", adaptive.low_duty_pct)?;
        if adaptive.high_duty_pct <= adaptive.low_duty_pct {
            return Err(invalid(
                "adaptive.high_duty_pct",
                "must be greater than adaptive.low_duty_pct",
            ));
        }
        ensure_finite("adaptive.min_shift", adaptive.min_shift)?;
        ensure_finite("adaptive.max_shift", adaptive.max_shift)?;
        if adaptive.min_shift < 0.0 {
            return Err(invalid("adaptive.min_shift", "must not be negative"));
        }
        if adaptive.max_shift < adaptive.min_shift {
            return Err(invalid(
                "adaptive.max_shift",
                "must not be less than adaptive.min_shift",
            ));
        }
        if !adaptive.step.is_finite() || adaptive.step <= 0.0 {
            return Err(invalid("adaptive.step", "must be a positive number"));
        }

        ensure_finite("alarms.instant.threshold_c", self.alarms.instant.threshold_c)?;
        ensure_finite("alarms.sustained.threshold_c", self.alarms.sustained.threshold_c)?;

        if self.daily.summary_hour >= HOURS_PER_DAY {
            return Err(invalid("daily.summary_hour", "must be an hour of the day (0-23)"));
        }
        if self.duty.interval_seconds == 0 {
            return Err(invalid("duty.interval_seconds", "must be positive"));
        }
        if self.performance.summary_interval_seconds == 0 {
            return Err(invalid("performance.summary_interval_seconds", "must be positive"));
        }

        Ok(())
    }
}
