//! Adaptive hysteresis controller
//!
//! Widens the compressor dead band when the duty cycle runs high (fewer,
//! longer cycles) and tightens it again when the duty cycle is low. Each
//! call moves the shift by at most one `step`, clamped to
//! `[min_shift, max_shift]`:
//!
//! ```text
//!   duty > high_pct  →  shift += step   (until max_shift)
//!   duty < low_pct   →  shift -= step   (until min_shift)
//!   otherwise        →  unchanged
//! ```
//!
//! Non-finite inputs are a no-op rather than an error: a transient bad
//! reading must never move the thresholds of a running compressor.

use crate::config::AdaptiveConfig;

/// Result of one adaptation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisStep {
    /// Whether the shift moved
    pub changed: bool,
    /// Shift after this step, rounded to 0.1
    pub new_shift: f32,
}

/// Run one adaptation step
pub fn step(duty_percent: f32, current_shift: f32, config: &AdaptiveConfig) -> HysteresisStep {
    if !duty_percent.is_finite() || !current_shift.is_finite() {
        return HysteresisStep {
            changed: false,
            new_shift: current_shift,
        };
    }

    let next = if duty_percent > config.high_duty_pct && current_shift < config.max_shift {
        Some((current_shift + config.step).min(config.max_shift))
    } else if duty_percent < config.low_duty_pct && current_shift > config.min_shift {
        Some((current_shift - config.step).max(config.min_shift))
    } else {
        None
    };

    // Bounds off the 0.1 grid win over the rounding
    match next
        .map(|shift| round_tenth(shift).max(config.min_shift).min(config.max_shift))
        .filter(|shift| *shift != current_shift)
    {
        Some(shift) => HysteresisStep {
            changed: true,
            new_shift: shift,
        },
        None => HysteresisStep {
            changed: false,
            new_shift: current_shift,
        },
    }
}

/// Switching thresholds for a given shift: `(on_above, off_below)`
pub fn thresholds(setpoint: f32, hysteresis: f32, shift: f32) -> (f32, f32) {
    (setpoint + hysteresis + shift, setpoint - hysteresis - shift)
}

// Keeps thousands of +0.1/-0.1 steps from drifting off the 0.1 grid
fn round_tenth(value: f32) -> f32 {
    libm::roundf(value * 10.0) / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdaptiveConfig {
        AdaptiveConfig {
            high_duty_pct: 70.0,
            low_duty_pct: 30.0,
            min_shift: 0.0,
            max_shift: 1.0,
            step: 0.1,
        }
    }

    #[test]
    fn high_duty_widens() {
        let out = step(75.0, 0.3, &config());
        assert!(out.changed);
        assert_eq!(out.new_shift, 0.4);
    }

    #[test]
    fn low_duty_tightens() {
        let out = step(10.0, 0.3, &config());
        assert!(out.changed);
        assert_eq!(out.new_shift, 0.2);
    }

    #[test]
    fn in_band_is_unchanged() {
        let out = step(50.0, 0.3, &config());
        assert!(!out.changed);
        assert_eq!(out.new_shift, 0.3);

        // Boundaries themselves do not trigger
        assert!(!step(70.0, 0.3, &config()).changed);
        assert!(!step(30.0, 0.3, &config()).changed);
    }

    #[test]
    fn clamps_at_limits() {
        let cfg = AdaptiveConfig { step: 0.3, ..config() };
        let out = step(90.0, 0.9, &cfg);
        assert!(out.changed);
        assert_eq!(out.new_shift, 1.0);
        assert!(!step(90.0, 1.0, &cfg).changed);

        let out = step(5.0, 0.1, &cfg);
        assert_eq!(out.new_shift, 0.0);
        assert!(!step(5.0, 0.0, &cfg).changed);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        for (duty, shift) in [(f32::NAN, 0.5), (f32::INFINITY, 0.5), (80.0, f32::NAN)] {
            let out = step(duty, shift, &config());
            assert!(!out.changed);
        }
        assert_eq!(step(f32::NAN, 0.5, &config()).new_shift, 0.5);
    }

    #[test]
    fn converges_to_max_without_drift() {
        let cfg = config();
        let mut shift = 0.0;
        let mut steps = 0;
        while step(100.0, shift, &cfg).changed {
            shift = step(100.0, shift, &cfg).new_shift;
            steps += 1;
        }
        assert_eq!(shift, 1.0);
        assert_eq!(steps, 10);
    }

    #[test]
    fn off_grid_bounds_hold() {
        let cfg = AdaptiveConfig { max_shift: 0.95, ..config() };
        let out = step(90.0, 0.9, &cfg);
        assert!(out.changed);
        assert_eq!(out.new_shift, 0.95);
        assert!(!step(90.0, 0.95, &cfg).changed);

        // Rounding back onto the current value is not a change
        let cfg = AdaptiveConfig { min_shift: 0.05, ..config() };
        let out = step(10.0, 0.1, &cfg);
        assert!(!out.changed);
        assert_eq!(out.new_shift, 0.1);
    }

    #[test]
    fn thresholds_follow_shift() {
        let (on, off) = thresholds(4.0, 1.0, 0.5);
        assert_eq!(on, 5.5);
        assert_eq!(off, 2.5);
    }
}
