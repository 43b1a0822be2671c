//! Constants for CoolGuard Core
//!
//! Centralized defaults and limits used throughout the controller. Every
//! numeric value that shows up in more than one place lives here, with its
//! unit in the name.
//!
//! ## Organization
//!
//! - **Control**: factory defaults for the control loop and its features
//! - **Time**: unit conversions
//! - **Buffers**: fixed capacities of the allocation-free containers
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Use descriptive names that include units
//! 3. Defaults are starting points; a deployed unit is configured through
//!    [`ControllerConfig`](crate::config::ControllerConfig)

/// Factory defaults for the control features.
pub mod control;

/// Time-related conversion factors.
pub mod time;

/// Capacities of fixed-size buffers.
pub mod buffers;

pub use buffers::{
    MAX_COMMANDS_PER_TICK, MAX_SMOOTHING_SAMPLES, MESSAGE_CAPACITY,
};

pub use time::{HOURS_PER_DAY, MS_PER_SECOND, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};
