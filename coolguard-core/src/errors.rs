//! Error Types for the Control Features
//!
//! ## Design Philosophy
//!
//! The controller runs on a relay device with no heap, so errors follow the
//! same rules as the rest of the core:
//!
//! 1. **Closed set**: one enum, callers match on the variant (the kind) and
//!    read the context payload.
//! 2. **No Heap Allocation**: context is `&'static str` or plain numbers.
//! 3. **Copy Semantics**: errors are cheap to return and to store in a
//!    tick's error list.
//!
//! ## Error Categories
//!
//! ### Setup
//! - `InvalidConfig`: a configuration value makes the controller meaningless
//!   (zero loop period, inverted duty thresholds). Fatal; fix the config.
//!
//! ### Per call
//! - `InvalidValue`: a non-finite number was handed to a strict operation
//!   such as the smoothing filter. Only that call fails.
//!
//! ### Per tick
//! - `CommandOverflow`: a tick produced more commands than its output
//!   buffer holds. The command is lost, the tick continues.
//!
//! Hardware faults (stuck relay, absent sensor) are *not* errors. They are
//! data: see [`RelayValidation`](crate::relay::RelayValidation) and the
//! `Option<f32>` readings of [`ControlEvent`](crate::events::ControlEvent).
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use coolguard_core::{ControlError, config::ControllerConfig};
//!
//! let mut config = ControllerConfig::default();
//! config.adaptive.high_duty_pct = 10.0;
//!
//! match config.validate() {
//!     Ok(()) => {}
//!     Err(ControlError::InvalidConfig { field, reason }) => {
//!         // Refuse to start the control loop
//!         assert_eq!(field, "adaptive.high_duty_pct");
//!         let _ = reason;
//!     }
//!     Err(_) => unreachable!(),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for control operations
pub type ControlResult<T> = Result<T, ControlError>;

/// Control errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ControlError {
    /// A configuration value is out of its valid domain
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field
        field: &'static str,
        /// What the value must satisfy
        reason: &'static str,
    },

    /// A non-finite number was passed where a finite one is required
    #[error("Invalid value for {field}: not a finite number")]
    InvalidValue {
        /// Name of the offending input
        field: &'static str,
    },

    /// The per-tick command buffer is full
    #[error("Command buffer full ({capacity} commands)")]
    CommandOverflow {
        /// Capacity of the command buffer
        capacity: usize,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for ControlError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InvalidConfig { field, reason } =>
                defmt::write!(fmt, "Invalid config {}: {}", field, reason),
            Self::InvalidValue { field } =>
                defmt::write!(fmt, "Invalid value for {}", field),
            Self::CommandOverflow { capacity } =>
                defmt::write!(fmt, "Command buffer full ({})", capacity),
        }
    }
}
