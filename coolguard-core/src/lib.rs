//! Control features for CoolGuard
//!
//! Closed-loop features for a single compressor-driven cooling appliance:
//! moving-average smoothing, duty-cycle driven adaptive hysteresis,
//! debounced high-temperature alarms, relay validation, daily statistics
//! and loop-time tracking, tied together by the per-tick
//! [`processor`].
//!
//! Key constraints:
//! - Runs on a relay device with a few tens of KB of RAM
//! - No heap allocation; every container has a fixed capacity
//! - One synchronous tick per loop period, no I/O inside the tick
//!
//! ```rust
//! use coolguard_core::{
//!     process, Command, ControlEvent, ControllerConfig, FeaturesState, FixedClock,
//! };
//!
//! let config = ControllerConfig::default();
//! config.validate().expect("valid config");
//!
//! let clock = FixedClock::new(1_710_072_000, 20);
//! let state = FeaturesState::new(&config);
//! let event = ControlEvent::new(1_710_072_000, 0)
//!     .with_air(Some(4.1), Some(4.3))
//!     .with_relay(true, 5.0);
//!
//! let out = process(&event, &state, &config, &clock);
//! for command in &out.commands {
//!     if let Command::AdjustHysteresis { on_above, off_below } = command {
//!         // hand the new band to the relay driver
//!         let _ = (on_above, off_below);
//!     }
//! }
//! let _next_state = out.state;
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod macros;

pub mod alarm;
pub mod buffer;
pub mod commands;
pub mod config;
pub mod constants;
pub mod daily;
pub mod duty;
pub mod errors;
pub mod events;
pub mod hysteresis;
pub mod performance;
pub mod processor;
pub mod relay;
pub mod smoothing;
pub mod time;

// Public API
pub use commands::{Command, Commands, LogLevel, Message};
pub use config::ControllerConfig;
pub use daily::DailySummary;
pub use errors::{ControlError, ControlResult};
pub use events::ControlEvent;
pub use processor::{process, FeaturesState, StepError, TickOutput};
pub use relay::{RelayObservation, RelayValidation};
pub use smoothing::{Smoothed, SmoothingFilter};
pub use time::{Clock, FixedClock, Millis, Timestamp};

#[cfg(feature = "std")]
pub use time::SystemClock;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
