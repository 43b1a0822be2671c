//! Loop timing statistics
//!
//! Purely observational: nothing in here feeds back into control.

use crate::time::Millis;

/// Running loop-duration statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerfStats {
    pub loop_count: u32,
    pub total_ms: u64,
    pub max_ms: u32,
    pub slow_count: u32,
}

impl PerfStats {
    /// Mean loop duration in milliseconds
    pub fn average_ms(&self) -> Option<f32> {
        if self.loop_count == 0 {
            None
        } else {
            Some(self.total_ms as f32 / self.loop_count as f32)
        }
    }
}

/// Outcome of tracking one loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedLoop {
    pub stats: PerfStats,
    pub was_slow: bool,
    pub loop_time_ms: u32,
}

/// Record one loop that ran from `loop_start` to `loop_end`
///
/// A loop end before its start (monotonic counter wrapped or was reset)
/// counts as zero duration.
pub fn track(state: PerfStats, loop_start: Millis, loop_end: Millis, slow_threshold_ms: u32) -> TrackedLoop {
    let loop_time_ms = u32::try_from(loop_end.saturating_sub(loop_start)).unwrap_or(u32::MAX);
    let was_slow = loop_time_ms > slow_threshold_ms;

    let stats = PerfStats {
        loop_count: state.loop_count.saturating_add(1),
        total_ms: state.total_ms.saturating_add(u64::from(loop_time_ms)),
        max_ms: state.max_ms.max(loop_time_ms),
        slow_count: state.slow_count.saturating_add(u32::from(was_slow)),
    };

    TrackedLoop {
        stats,
        was_slow,
        loop_time_ms,
    }
}
