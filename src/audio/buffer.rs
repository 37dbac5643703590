//! Sample Buffer
//!
//! Bounded buffer for captured audio samples. When full, the oldest
//! samples are discarded so a stuck recording never grows unbounded.

use std::collections::VecDeque;

/// Bounded FIFO buffer for audio samples
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleBuffer {
    /// Create a buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1 << 20)),
            capacity,
        }
    }

    /// Append samples, discarding the oldest if over capacity
    pub fn push(&mut self, samples: &[f32]) {
        for &sample in samples {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    /// Copy out all buffered samples, oldest first
    pub fn snapshot(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }

    /// Take all buffered samples, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<f32> {
        self.samples.drain(..).collect()
    }

    /// Discard all buffered samples
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of buffered samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples the buffer will hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_snapshot() {
        let mut buffer = SampleBuffer::new(10);

        buffer.push(&[1.0, 2.0, 3.0]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.snapshot(), vec![1.0, 2.0, 3.0]);
        // Snapshot is non-destructive
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_overflow_discards_oldest() {
        let mut buffer = SampleBuffer::new(5);

        buffer.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.snapshot(), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_drain_empties_buffer() {
        let mut buffer = SampleBuffer::new(10);

        buffer.push(&[1.0, 2.0, 3.0]);
        let samples = buffer.drain();

        assert_eq!(samples, vec![1.0, 2.0, 3.0]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut buffer = SampleBuffer::new(4);
        buffer.push(&[0.5; 4]);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 4);
    }
}
