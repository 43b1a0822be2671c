//! Relay state validation
//!
//! The relay confirms commands asynchronously: the reported state may lag
//! the commanded one for a moment. A mismatch only counts as a fault once
//! it outlives the response grace period.
//!
//! ```text
//!   no command yet                  → valid
//!   elapsed ≤ timeout               → valid, waiting for response
//!   elapsed > timeout, states match → valid
//!   elapsed > timeout, mismatch     → invalid, stuck
//! ```
//!
//! The same reconciliation works for any actuator whose confirmation
//! arrives after the command; nothing here is relay-specific beyond naming.

use crate::time::Timestamp;

/// Diagnostic record produced by [`validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayValidation {
    pub valid: bool,
    /// Still inside the grace period after the last command
    pub waiting_for_response: bool,
    /// Mismatch persisted past the grace period
    pub stuck: bool,
    /// Commanded state (only when stuck)
    pub intended: Option<bool>,
    /// Reported state (only when stuck)
    pub reported: Option<bool>,
    /// Seconds since the last command (only when stuck)
    pub elapsed: Option<u64>,
}

impl RelayValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }
}

/// Commanded vs. reported relay state, as observed by the hardware layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayObservation {
    pub intended_on: bool,
    pub reported_on: bool,
    /// When the last switching command was issued; `None` before the first
    pub last_command: Option<Timestamp>,
}

/// Compare the commanded state with the reported one
///
/// `last_command` of `None` (or the legacy sentinel `Some(0)`) means no
/// command has been issued yet.
pub fn validate(
    intended_on: bool,
    reported_on: bool,
    now: Timestamp,
    last_command: Option<Timestamp>,
    timeout_seconds: u32,
) -> RelayValidation {
    let Some(last_command) = last_command.filter(|t| *t != 0) else {
        return RelayValidation::ok();
    };

    let elapsed = now.saturating_sub(last_command);
    if elapsed <= u64::from(timeout_seconds) {
        return RelayValidation {
            waiting_for_response: true,
            ..RelayValidation::ok()
        };
    }

    if intended_on != reported_on {
        RelayValidation {
            valid: false,
            waiting_for_response: false,
            stuck: true,
            intended: Some(intended_on),
            reported: Some(reported_on),
            elapsed: Some(elapsed),
        }
    } else {
        RelayValidation::ok()
    }
}

impl RelayObservation {
    pub fn validate(&self, now: Timestamp, timeout_seconds: u32) -> RelayValidation {
        validate(self.intended_on, self.reported_on, now, self.last_command, timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_command_is_valid() {
        let r = validate(true, false, 5000, None, 2);
        assert_eq!(r, RelayValidation { valid: true, ..Default::default() });
        assert_eq!(validate(true, false, 5000, Some(0), 2), r);
    }

    #[test]
    fn grace_period_hides_mismatch() {
        let r = validate(true, false, 1002, Some(1000), 2);
        assert!(r.valid);
        assert!(r.waiting_for_response);
        assert!(!r.stuck);
    }

    #[test]
    fn stuck_after_timeout() {
        let r = validate(true, false, 1003, Some(1000), 2);
        assert_eq!(
            r,
            RelayValidation {
                valid: false,
                waiting_for_response: false,
                stuck: true,
                intended: Some(true),
                reported: Some(false),
                elapsed: Some(3),
            }
        );
    }

    #[test]
    fn matching_after_timeout_is_plain_valid() {
        let r = validate(false, false, 1003, Some(1000), 2);
        assert_eq!(r, RelayValidation { valid: true, ..Default::default() });
    }

    #[test]
    fn observation_delegates() {
        let obs = RelayObservation { intended_on: false, reported_on: true, last_command: Some(10) };
        assert!(obs.validate(100, 5).stuck);
    }
}
