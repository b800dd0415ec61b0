//! Bounded history of emitted bytes.

use std::collections::VecDeque;

/// Ring buffer of recently emitted bytes.
///
/// Once full, every new byte evicts the oldest one.
#[derive(Debug, Clone)]
pub struct EntropyHistory {
    bytes: VecDeque<u8>,
    capacity: usize,
}

impl EntropyHistory {
    /// Creates an empty history holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bytes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends bytes, evicting the oldest on overflow.
    pub fn extend(&mut self, data: &[u8]) {
        // Only the newest `capacity` bytes of `data` can survive.
        let data = &data[data.len().saturating_sub(self.capacity)..];
        let overflow = (self.bytes.len() + data.len()).saturating_sub(self.capacity);
        self.bytes.drain(..overflow);
        self.bytes.extend(data);
    }

    /// Contiguous copy of the history, oldest first.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.iter().copied().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_up_to_capacity() {
        let mut history = EntropyHistory::new(10);
        history.extend(&[1, 2, 3]);
        assert_eq!(history.len(), 3);

        history.extend(&[4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(history.len(), 10);
        assert_eq!(history.to_vec(), (1..=10).collect::<Vec<u8>>());
        assert_eq!(history.capacity(), 10);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut history = EntropyHistory::new(4);
        history.extend(&[1, 2, 3, 4]);
        history.extend(&[5, 6]);
        assert_eq!(history.to_vec(), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_oversized_extend_keeps_newest() {
        let mut history = EntropyHistory::new(3);
        history.extend(&[9]);
        history.extend(&[1, 2, 3, 4, 5]);
        assert_eq!(history.to_vec(), vec![3, 4, 5]);
    }
}
