//! Buffer Sizes and Memory Constraints
//!
//! CoolGuard core never allocates. Every container has a capacity fixed at
//! compile time, chosen for a relay device with a few tens of KB of RAM.

// ===== SMOOTHING =====

/// Maximum number of samples the moving-average ring buffer can hold.
///
/// The effective window is `ceil(window_seconds * 1000 / loop_period_ms)`
/// and must not exceed this value:
/// - 60 s window at a 1 s loop = 60 samples
/// - 30 s window at a 250 ms loop = 120 samples
///
/// Memory: 120 × 4 bytes = 480 bytes per filter.
pub const MAX_SMOOTHING_SAMPLES: usize = 120;

// ===== COMMANDS =====

/// Upper bound on commands emitted by one tick.
///
/// Worst case today is 9 (two alarm edges, hysteresis adjust + log,
/// slow-loop warning, performance summary, daily summary, duty rollover,
/// relay fault), leaving headroom for new features.
pub const MAX_COMMANDS_PER_TICK: usize = 16;

/// Inline capacity of a single command message, in bytes.
///
/// Long enough for the daily summary line; longer text is truncated.
pub const MESSAGE_CAPACITY: usize = 256;

// ===== SINK =====

/// Default number of undelivered notifications kept for retry.
pub const DEFAULT_SINK_BUFFER_SIZE: usize = 10;
