//! Control Loop Defaults
//!
//! Factory settings for a household-size refrigerator compartment. Each
//! value can be overridden through the controller configuration.

// ===== THERMOSTAT =====

/// Target compartment temperature (°C).
pub const DEFAULT_SETPOINT_C: f32 = 4.0;

/// Half-width of the on/off dead band around the setpoint (°C).
pub const DEFAULT_HYSTERESIS_C: f32 = 1.0;

// ===== LOOP & SMOOTHING =====

/// Period between two ticks of the control loop (milliseconds).
pub const DEFAULT_LOOP_PERIOD_MS: f32 = 5000.0;

/// Length of the moving-average window (seconds).
///
/// 30 s at a 5 s loop averages 6 samples; enough to hide door-opening
/// spikes without delaying compressor starts noticeably.
pub const DEFAULT_SMOOTHING_WINDOW_S: f32 = 30.0;

// ===== ADAPTIVE HYSTERESIS =====

/// Duty cycle above which the dead band widens (%).
pub const DEFAULT_HIGH_DUTY_PCT: f32 = 70.0;

/// Duty cycle below which the dead band tightens (%).
pub const DEFAULT_LOW_DUTY_PCT: f32 = 30.0;

/// Smallest adaptive shift (°C).
pub const DEFAULT_MIN_SHIFT_C: f32 = 0.0;

/// Largest adaptive shift (°C).
pub const DEFAULT_MAX_SHIFT_C: f32 = 1.0;

/// Shift change per adaptation step (°C).
pub const DEFAULT_SHIFT_STEP_C: f32 = 0.1;

// ===== ALARMS =====

/// Instant alarm threshold (°C): something is clearly wrong.
pub const DEFAULT_INSTANT_ALARM_C: f32 = 12.0;

/// Instant alarm debounce (seconds).
pub const DEFAULT_INSTANT_ALARM_DELAY_S: u32 = 60;

/// Sustained alarm threshold (°C): food safety limit.
pub const DEFAULT_SUSTAINED_ALARM_C: f32 = 8.0;

/// Sustained alarm debounce (seconds). 30 minutes.
pub const DEFAULT_SUSTAINED_ALARM_DELAY_S: u32 = 30 * 60;

// ===== ACCOUNTING WINDOWS =====

/// Local hour at which the daily summary may be emitted (0-23).
pub const DEFAULT_SUMMARY_HOUR: u32 = 7;

/// Length of the duty-cycle accounting window (seconds).
pub const DEFAULT_DUTY_INTERVAL_S: u32 = 3600;

// ===== PERFORMANCE =====

/// Loop duration regarded as slow (milliseconds).
pub const DEFAULT_SLOW_LOOP_MS: u32 = 250;

/// Interval between performance summaries (seconds).
pub const DEFAULT_PERF_SUMMARY_INTERVAL_S: u32 = 3600;

// ===== RELAY =====

/// Grace period for the relay to confirm a command (seconds).
pub const DEFAULT_RELAY_TIMEOUT_S: u32 = 5;

// ===== SINK =====

/// First retry delay after a failed delivery (milliseconds).
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Upper bound for the retry backoff (milliseconds).
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Delivery attempts per buffered message before it is dropped.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
