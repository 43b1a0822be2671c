//! Moving-average smoothing of raw temperature samples
//!
//! The window is specified in seconds and converted to a sample count using
//! the loop period:
//!
//! ```text
//! N = ceil(window_seconds * 1000 / loop_period_ms)
//! ```
//!
//! With `N = 1` the filter passes samples through unchanged.
//!
//! Configuration mistakes (non-positive window or period, a window larger
//! than the ring capacity) are reported as [`ControlError::InvalidConfig`].
//! A non-finite sample fails only the call that delivered it and leaves the
//! buffer untouched.

use crate::{
    buffer::SampleBuffer,
    constants::MAX_SMOOTHING_SAMPLES,
    errors::{ControlError, ControlResult},
};

/// Output of one smoothing update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothed {
    /// Mean of the samples currently in the window
    pub value: f32,
    /// Number of samples the mean was computed from
    pub sample_count: usize,
    /// True once the window holds `N` samples
    pub buffer_full: bool,
}

/// Number of samples in a window of `window_seconds` at `loop_period_ms`
pub fn window_len(window_seconds: f32, loop_period_ms: f32) -> ControlResult<usize> {
    if !window_seconds.is_finite() || window_seconds <= 0.0 {
        return Err(ControlError::InvalidConfig {
            field: "smoothing.window_seconds",
            reason: "must be a positive number",
        });
    }
    if !loop_period_ms.is_finite() || loop_period_ms <= 0.0 {
        return Err(ControlError::InvalidConfig {
            field: "smoothing.loop_period_ms",
            reason: "must be a positive number",
        });
    }

    // Stay in f32 and forgive one ulp, so 0.3 s at 100 ms is 3 samples, not 4
    let exact = window_seconds * 1000.0 / loop_period_ms;
    let samples = libm::ceilf(exact - exact * f32::EPSILON);
    if !samples.is_finite() || samples > usize::MAX as f32 {
        return Err(ControlError::InvalidConfig {
            field: "smoothing.window_seconds",
            reason: "window too long for loop period",
        });
    }
    Ok((samples as usize).max(1))
}

/// Push `new_value` into `buffer` and return the moving average
///
/// The oldest samples are evicted until at most `N` remain, so a window that
/// shrank since the previous call takes effect immediately.
pub fn smooth<const CAP: usize>(
    buffer: &mut SampleBuffer<CAP>,
    new_value: f32,
    window_seconds: f32,
    loop_period_ms: f32,
) -> ControlResult<Smoothed> {
    let n = window_len(window_seconds, loop_period_ms)?;
    if n > CAP {
        return Err(ControlError::InvalidConfig {
            field: "smoothing.window_seconds",
            reason: "window exceeds sample buffer capacity",
        });
    }
    if !new_value.is_finite() {
        return Err(ControlError::InvalidValue { field: "temperature" });
    }

    // Make room first so a full ring never overwrites silently
    buffer.retain_newest(n - 1);
    buffer.push(new_value);

    let sample_count = buffer.len();
    Ok(Smoothed {
        value: buffer.mean().unwrap_or(new_value),
        sample_count,
        buffer_full: sample_count >= n,
    })
}

/// Moving-average filter with a validated window
///
/// Convenience wrapper for the common case of one filter per sensor whose
/// window never changes after boot.
#[derive(Debug, Clone)]
pub struct SmoothingFilter<const CAP: usize = MAX_SMOOTHING_SAMPLES> {
    buffer: SampleBuffer<CAP>,
    window_seconds: f32,
    loop_period_ms: f32,
    window: usize,
}

impl<const CAP: usize> SmoothingFilter<CAP> {
    /// Create a filter, rejecting windows that cannot be represented
    pub fn new(window_seconds: f32, loop_period_ms: f32) -> ControlResult<Self> {
        let window = window_len(window_seconds, loop_period_ms)?;
        if window > CAP {
            return Err(ControlError::InvalidConfig {
                field: "smoothing.window_seconds",
                reason: "window exceeds sample buffer capacity",
            });
        }
        Ok(Self {
            buffer: SampleBuffer::new(),
            window_seconds,
            loop_period_ms,
            window,
        })
    }

    /// Feed one sample
    pub fn update(&mut self, value: f32) -> ControlResult<Smoothed> {
        smooth(&mut self.buffer, value, self.window_seconds, self.loop_period_ms)
    }

    /// Samples per window
    pub fn window(&self) -> usize {
        self.window
    }

    /// Current mean, if any sample has been accepted
    pub fn value(&self) -> Option<f32> {
        self.buffer.mean()
    }

    /// Read-only view of the samples, oldest first
    pub fn samples(&self) -> &SampleBuffer<CAP> {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_second_window_at_one_hertz() {
        let mut buffer = SampleBuffer::<16>::new();
        let mut last = None;
        for v in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0] {
            last = Some(smooth(&mut buffer, v, 5.0, 1000.0).unwrap());
        }

        let out = last.unwrap();
        let contents: Vec<f32> = buffer.iter().collect();
        assert_eq!(contents, vec![20.0, 30.0, 40.0, 50.0, 60.0]);
        assert_eq!(out.value, 40.0);
        assert_eq!(out.sample_count, 5);
        assert!(out.buffer_full);
    }

    #[test]
    fn window_rounds_up() {
        assert_eq!(window_len(5.0, 1000.0).unwrap(), 5);
        assert_eq!(window_len(5.0, 3000.0).unwrap(), 2);
        assert_eq!(window_len(0.5, 1000.0).unwrap(), 1);
    }

    #[test]
    fn fractional_windows_are_exact() {
        assert_eq!(window_len(0.3, 100.0).unwrap(), 3);
        assert_eq!(window_len(1.1, 100.0).unwrap(), 11);
        assert_eq!(window_len(0.7, 100.0).unwrap(), 7);
        assert_eq!(window_len(2.5, 1000.0).unwrap(), 3);
        assert_eq!(window_len(0.35, 100.0).unwrap(), 4);

        let mut buffer = SampleBuffer::<16>::new();
        let mut last = None;
        for v in [1.0, 2.0, 3.0, 4.0] {
            last = Some(smooth(&mut buffer, v, 0.3, 100.0).unwrap());
        }
        let out = last.unwrap();
        assert_eq!(out.sample_count, 3);
        assert!(out.buffer_full);
        assert_eq!(out.value, 3.0);
    }

    #[test]
    fn single_sample_window_passes_through() {
        let mut buffer = SampleBuffer::<4>::new();
        for v in [3.0, 9.0, -2.5] {
            let out = smooth(&mut buffer, v, 1.0, 1000.0).unwrap();
            assert_eq!(out.value, v);
            assert_eq!(out.sample_count, 1);
            assert!(out.buffer_full);
        }
    }

    #[test]
    fn not_full_until_window_filled() {
        let mut buffer = SampleBuffer::<8>::new();
        let out = smooth(&mut buffer, 1.0, 3.0, 1000.0).unwrap();
        assert!(!out.buffer_full);
        assert_eq!(out.sample_count, 1);
    }

    #[test]
    fn rejects_bad_configuration() {
        let mut buffer = SampleBuffer::<8>::new();
        for (window, period) in [(0.0, 1000.0), (-1.0, 1000.0), (5.0, 0.0), (f32::NAN, 1000.0), (5.0, f32::INFINITY)] {
            assert!(matches!(
                smooth(&mut buffer, 1.0, window, period),
                Err(ControlError::InvalidConfig { .. })
            ));
        }
        // 10 samples do not fit in 8 slots
        assert!(matches!(
            smooth(&mut buffer, 1.0, 10.0, 1000.0),
            Err(ControlError::InvalidConfig { .. })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn non_finite_sample_leaves_buffer_alone() {
        let mut buffer = SampleBuffer::<8>::new();
        smooth(&mut buffer, 5.0, 5.0, 1000.0).unwrap();

        let err = smooth(&mut buffer, f32::NAN, 5.0, 1000.0).unwrap_err();
        assert_eq!(err, ControlError::InvalidValue { field: "temperature" });
        assert_eq!(buffer.len(), 1);

        let out = smooth(&mut buffer, 7.0, 5.0, 1000.0).unwrap();
        assert_eq!(out.value, 6.0);
    }

    #[test]
    fn shrinking_window_evicts_down() {
        let mut buffer = SampleBuffer::<8>::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            smooth(&mut buffer, v, 5.0, 1000.0).unwrap();
        }
        let out = smooth(&mut buffer, 6.0, 2.0, 1000.0).unwrap();
        assert_eq!(out.sample_count, 2);
        assert_eq!(out.value, 5.5);
    }

    #[test]
    fn filter_wrapper() {
        let mut filter = SmoothingFilter::<8>::new(3.0, 1000.0).unwrap();
        assert_eq!(filter.window(), 3);
        filter.update(3.0).unwrap();
        filter.update(6.0).unwrap();
        let out = filter.update(9.0).unwrap();
        assert_eq!(out.value, 6.0);
        assert_eq!(filter.samples().len(), 3);

        assert!(SmoothingFilter::<4>::new(30.0, 1000.0).is_err());
    }
}
