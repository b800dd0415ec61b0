//! Bounded, lossy sample queue.
//!
//! The producer never blocks: when the queue is full the new sample is
//! dropped. The consumer drains whatever is queued without waiting.

use crate::extraction::EntropySample;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Outcome of offering a sample to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// The sample was queued.
    Queued,
    /// The queue was full; the sample was discarded.
    Dropped,
    /// The consumer is gone.
    Closed,
}

/// Creates a queue holding at most `capacity` samples.
pub fn sample_queue(capacity: usize) -> (SampleSink, SampleQueue) {
    let capacity = capacity.max(1);
    let (tx, rx) = bounded(capacity);
    (SampleSink { tx }, SampleQueue { rx, capacity })
}

/// Producer end, owned by the collector worker.
#[derive(Debug, Clone)]
pub struct SampleSink {
    tx: Sender<EntropySample>,
}

impl SampleSink {
    /// Queues a sample without blocking.
    pub fn offer(&self, sample: EntropySample) -> Offer {
        match self.tx.try_send(sample) {
            Ok(()) => Offer::Queued,
            Err(TrySendError::Full(sample)) => {
                tracing::trace!(bytes = sample.len(), "Sample queue full, dropping sample");
                Offer::Dropped
            }
            Err(TrySendError::Disconnected(_)) => Offer::Closed,
        }
    }
}

/// Consumer end, held by the generator.
#[derive(Debug)]
pub struct SampleQueue {
    rx: Receiver<EntropySample>,
    capacity: usize,
}

impl SampleQueue {
    /// Removes and returns every queued sample, oldest first.
    pub fn drain(&self) -> Vec<EntropySample> {
        self.rx.try_iter().collect()
    }

    /// Samples currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(byte: u8) -> EntropySample {
        EntropySample::fallback(vec![byte; 4])
    }

    #[test]
    fn test_overfilling_never_exceeds_capacity() {
        let (sink, queue) = sample_queue(10);

        let outcomes: Vec<Offer> = (0..25).map(|i| sink.offer(sample(i))).collect();

        assert_eq!(queue.len(), 10);
        assert_eq!(outcomes.iter().filter(|&&o| o == Offer::Queued).count(), 10);
        assert_eq!(outcomes.iter().filter(|&&o| o == Offer::Dropped).count(), 15);
    }

    #[test]
    fn test_drain_is_fifo_and_empties() {
        let (sink, queue) = sample_queue(4);
        for i in 0..3 {
            sink.offer(sample(i));
        }

        let drained: Vec<u8> = queue.drain().iter().map(|s| s.data()[0]).collect();
        assert_eq!(drained, vec![0, 1, 2]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_drained_queue_accepts_again() {
        let (sink, queue) = sample_queue(1);
        assert_eq!(sink.offer(sample(1)), Offer::Queued);
        assert_eq!(sink.offer(sample(2)), Offer::Dropped);
        queue.drain();
        assert_eq!(sink.offer(sample(3)), Offer::Queued);
    }

    #[test]
    fn test_offer_after_consumer_dropped() {
        let (sink, queue) = sample_queue(2);
        drop(queue);
        assert_eq!(sink.offer(sample(1)), Offer::Closed);
    }

    #[test]
    fn test_default_capacity_bound() {
        let (sink, queue) = sample_queue(1000);
        for i in 0..1500u32 {
            sink.offer(sample(i as u8));
        }
        assert_eq!(queue.len(), queue.capacity());
    }
}
