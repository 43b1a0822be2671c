//! Fixed-Size Ring Buffer for Temperature Samples
//!
//! ## Overview
//!
//! The moving-average filter needs the last `N` samples, where `N` depends
//! on the configured window and loop period. The relay device cannot afford
//! a growing `Vec`, so the samples live in a ring buffer whose capacity is
//! fixed at compile time through const generics. The *logical* window (how
//! many samples are kept) is chosen at runtime and can be any value up to
//! that capacity.
//!
//! ## Memory Layout
//!
//! ```text
//! SampleBuffer<5> after pushing 1..=7 with a window of 5:
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │  6  │  7  │  3  │  4  │  5  │  ← physical slots
//! └─────┴─────┴─────┴─────┴─────┘
//!                ↑
//!                head = 2 (oldest)
//!
//! Logical view (oldest → newest): [3, 4, 5, 6, 7]
//! ```
//!
//! Eviction only moves `head`; no element is ever shifted. The contents are
//! exposed outward through [`SampleBuffer::iter`], an immutable view in
//! chronological order.
//!
//! ## Usage Example
//!
//! ```rust
//! use coolguard_core::buffer::SampleBuffer;
//!
//! let mut samples: SampleBuffer<8> = SampleBuffer::new();
//! samples.push(4.0);
//! samples.push(6.0);
//! assert_eq!(samples.mean(), Some(5.0));
//! ```

/// Fixed-capacity FIFO of `f32` samples
///
/// ## Internal Invariants
///
/// - `head < CAP` when `CAP > 0`
/// - `len <= CAP`
/// - slot `(head + i) % CAP` holds the i-th oldest sample for `i < len`
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer<const CAP: usize> {
    data: [f32; CAP],
    head: usize,
    len: usize,
}

impl<const CAP: usize> SampleBuffer<CAP> {
    /// Creates a new empty buffer
    ///
    /// This is a const function, allowing creation in static contexts.
    pub const fn new() -> Self {
        Self {
            data: [0.0; CAP],
            head: 0,
            len: 0,
        }
    }

    /// Compile-time capacity
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if every slot is in use
    pub fn is_full(&self) -> bool {
        self.len == CAP
    }

    /// Appends a sample, overwriting the oldest one when at capacity
    pub fn push(&mut self, value: f32) {
        if CAP == 0 {
            return;
        }
        if self.len == CAP {
            self.data[self.head] = value;
            self.head = (self.head + 1) % CAP;
        } else {
            let tail = (self.head + self.len) % CAP;
            self.data[tail] = value;
            self.len += 1;
        }
    }

    /// Removes and returns the oldest sample
    pub fn pop_oldest(&mut self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let value = self.data[self.head];
        self.head = (self.head + 1) % CAP;
        self.len -= 1;
        Some(value)
    }

    /// Drops the oldest samples until at most `keep` remain
    pub fn retain_newest(&mut self, keep: usize) {
        while self.len > keep {
            self.pop_oldest();
        }
    }

    /// The most recent sample
    pub fn newest(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        Some(self.data[(self.head + self.len - 1) % CAP])
    }

    /// Arithmetic mean of the current contents
    ///
    /// Always recomputed from the stored samples, so the result depends only
    /// on what is in the buffer and not on how it got there.
    pub fn mean(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let sum: f64 = self.iter().map(f64::from).sum();
        Some((sum / self.len as f64) as f32)
    }

    /// Iterate over samples from oldest to newest
    pub fn iter(&self) -> SampleBufferIter<'_, CAP> {
        SampleBufferIter {
            buffer: self,
            index: 0,
        }
    }

    /// Clear all samples
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    fn get(&self, index: usize) -> Option<f32> {
        if index >= self.len {
            return None;
        }
        Some(self.data[(self.head + index) % CAP])
    }
}

/// Iterator over buffer contents, oldest first
pub struct SampleBufferIter<'a, const CAP: usize> {
    buffer: &'a SampleBuffer<CAP>,
    index: usize,
}

impl<'a, const CAP: usize> Iterator for SampleBufferIter<'a, CAP> {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl<'a, const CAP: usize> ExactSizeIterator for SampleBufferIter<'a, CAP> {}

impl<const CAP: usize> Default for SampleBuffer<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer() {
        let buffer: SampleBuffer<5> = SampleBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert!(buffer.newest().is_none());
        assert!(buffer.mean().is_none());
    }

    #[test]
    fn overwrite_at_capacity() {
        let mut buffer = SampleBuffer::<3>::new();
        for i in 0..5 {
            buffer.push(i as f32);
        }

        assert_eq!(buffer.len(), 3);
        assert!(buffer.is_full());

        let values: Vec<f32> = buffer.iter().collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(buffer.newest(), Some(4.0));
    }

    #[test]
    fn retain_newest_drops_oldest() {
        let mut buffer = SampleBuffer::<8>::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            buffer.push(v);
        }

        buffer.retain_newest(2);
        let values: Vec<f32> = buffer.iter().collect();
        assert_eq!(values, vec![4.0, 5.0]);

        // Wrapped storage keeps chronological order
        for v in [6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0] {
            buffer.push(v);
        }
        let values: Vec<f32> = buffer.iter().collect();
        assert_eq!(values, vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn mean_of_contents() {
        let mut buffer = SampleBuffer::<4>::new();
        buffer.push(10.0);
        buffer.push(20.0);
        assert_eq!(buffer.mean(), Some(15.0));
        assert_eq!(buffer.pop_oldest(), Some(10.0));
        assert_eq!(buffer.mean(), Some(20.0));
    }
}
