//! Debounced high-temperature alarms
//!
//! # State Machine
//!
//! ```text
//!            temp >= threshold                now - start >= delay
//!  Normal ─────────────────────► Normal ──────────────────────► Fired
//!  (idle)                      (breach_start)                     │
//!    ▲                               │ temp < threshold           │
//!    └───────────────────────────────┘                            │
//!    ▲                       temp < threshold                     │
//!    └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Firing is debounced; recovery is not: the first reading below the
//! threshold clears the breach and returns the alarm to Normal. While the
//! breach continues the alarm stays Fired without firing again, so the
//! caller sees exactly one [`AlarmTransition::Fired`] per breach.
//!
//! The controller runs two independent instances: an *instant* alarm with a
//! high threshold and short delay, and a *sustained* one with a lower
//! threshold and long delay.

use crate::{config::AlarmConfig, time::Timestamp};

/// Persistent alarm memory, kept in the features state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlarmState {
    /// When the current breach began, if one is in progress
    pub breach_start: Option<Timestamp>,
    /// Whether the alarm has fired for the current breach
    pub fired: bool,
}

impl AlarmState {
    pub fn is_fired(&self) -> bool {
        self.fired
    }
}

/// Edge reported by [`HighTempAlarm::evaluate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmTransition {
    /// No edge this tick
    None,
    /// Normal → Fired
    Fired,
    /// Fired → Normal
    Recovered,
}

/// Which of the two alarm instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    Instant,
    Sustained,
}

impl AlarmKind {
    pub const fn name(&self) -> &'static str {
        match self {
            AlarmKind::Instant => "instant",
            AlarmKind::Sustained => "sustained",
        }
    }
}

/// One debounced threshold alarm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighTempAlarm {
    kind: AlarmKind,
    threshold: f32,
    delay_seconds: u32,
}

impl HighTempAlarm {
    pub fn new(kind: AlarmKind, config: &AlarmConfig) -> Self {
        Self {
            kind,
            threshold: config.threshold_c,
            delay_seconds: config.delay_seconds,
        }
    }

    pub fn kind(&self) -> AlarmKind {
        self.kind
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Advance the state machine by one reading
    ///
    /// An absent (or non-finite) reading carries no information about the
    /// breach, so the state is returned unchanged.
    pub fn evaluate(
        &self,
        state: AlarmState,
        temperature: Option<f32>,
        now: Timestamp,
    ) -> (AlarmState, AlarmTransition) {
        let Some(temp) = temperature.filter(|t| t.is_finite()) else {
            return (state, AlarmTransition::None);
        };

        if temp >= self.threshold {
            let start = state.breach_start.unwrap_or(now);
            let due = now.saturating_sub(start) >= u64::from(self.delay_seconds);
            let next = AlarmState {
                breach_start: Some(start),
                fired: state.fired || due,
            };
            let transition = if next.fired && !state.fired {
                AlarmTransition::Fired
            } else {
                AlarmTransition::None
            };
            (next, transition)
        } else {
            let transition = if state.fired {
                AlarmTransition::Recovered
            } else {
                AlarmTransition::None
            };
            (AlarmState::default(), transition)
        }
    }
}
