//! Background entropy collection thread.
//!
//! The worker owns its sink, extractor handle and pacing; the generator
//! keeps only the queue's receiving end, a stop flag and a completion
//! signal. Stopping takes effect at the next iteration boundary, never
//! in the middle of a device read.

use super::queue::{sample_queue, Offer, SampleQueue, SampleSink};
use crate::analysis::HarvestCounters;
use crate::config::CollectorConfig;
use crate::extraction::FeatureExtractor;
use crate::source::SharedSource;
use crate::sync::lock;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The worker exited and was joined.
    Joined,
    /// The worker did not finish in time and was detached.
    TimedOut,
    /// There was nothing to stop.
    NotRunning,
}

/// Everything the worker thread owns.
struct Worker {
    source: SharedSource,
    extractor: Arc<dyn FeatureExtractor>,
    sink: SampleSink,
    running: Arc<AtomicBool>,
    counters: Arc<HarvestCounters>,
    n_samples: usize,
    interval: Duration,
    backoff: Duration,
    /// Dropped when the thread exits, which disconnects the owner's
    /// completion receiver.
    _done: Sender<()>,
}

impl Worker {
    fn run(self) {
        tracing::info!(samples_per_read = self.n_samples, "Entropy collector started");

        while self.running.load(Ordering::Acquire) {
            let read = {
                let mut source = lock(&self.source);
                if !source.status().is_active() {
                    tracing::info!(status = %source.status(), "Noise source inactive, collector exiting");
                    break;
                }
                source.read(self.n_samples)
            };

            match read {
                Ok(block) => {
                    let sample = self.extractor.extract(&block);
                    self.counters.record_collected();
                    match self.sink.offer(sample) {
                        Offer::Queued => {}
                        Offer::Dropped => self.counters.record_dropped(),
                        Offer::Closed => break,
                    }
                    thread::sleep(self.interval);
                }
                Err(e) => {
                    self.counters.record_collector_error();
                    tracing::warn!(error = %e, "Entropy collection failed, backing off");
                    thread::sleep(self.backoff);
                }
            }
        }

        tracing::info!("Entropy collector stopped");
    }
}

/// Handle to a running collector thread.
pub struct EntropyCollector {
    queue: SampleQueue,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    done: Receiver<()>,
    join_timeout: Duration,
}

impl EntropyCollector {
    /// Starts a collector reading `n_samples` per iteration from `source`.
    pub fn spawn(
        source: SharedSource,
        extractor: Arc<dyn FeatureExtractor>,
        config: &CollectorConfig,
        n_samples: usize,
        counters: Arc<HarvestCounters>,
    ) -> std::io::Result<Self> {
        let (sink, queue) = sample_queue(config.queue_capacity);
        let (done_tx, done_rx) = bounded(1);
        let running = Arc::new(AtomicBool::new(true));

        let worker = Worker {
            source,
            extractor,
            sink,
            running: Arc::clone(&running),
            counters,
            n_samples,
            interval: config.interval(),
            backoff: config.backoff(),
            _done: done_tx,
        };

        let handle = thread::Builder::new()
            .name("entropy-collector".into())
            .spawn(move || worker.run())?;

        Ok(Self {
            queue,
            running,
            handle: Some(handle),
            done: done_rx,
            join_timeout: config.join_timeout(),
        })
    }

    /// The receiving end of the sample queue.
    pub fn queue(&self) -> &SampleQueue {
        &self.queue
    }

    /// Returns true while the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signals the worker and waits up to the join timeout.
    ///
    /// Never blocks longer than the timeout: a worker stuck in a device
    /// read is detached and finishes on its own.
    pub fn stop(&mut self) -> StopOutcome {
        self.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return StopOutcome::NotRunning;
        };

        match self.done.recv_timeout(self.join_timeout) {
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_ms = self.join_timeout.as_millis() as u64,
                    "Entropy collector did not stop in time, detaching"
                );
                StopOutcome::TimedOut
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    tracing::warn!("Entropy collector panicked");
                }
                StopOutcome::Joined
            }
        }
    }
}

impl Drop for EntropyCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for EntropyCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyCollector")
            .field("running", &self.is_running())
            .field("queued", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::extraction::NoiseExtractor;
    use crate::source::{NoiseSource, SimulatedNoise, SourceStatus, SystemNoise};
    use std::sync::Mutex;
    use std::time::Instant;

    fn open_shared(mut source: Box<dyn NoiseSource>) -> SharedSource {
        source.open(&SourceConfig::default()).unwrap();
        Arc::new(Mutex::new(source))
    }

    fn fast_config(capacity: usize) -> CollectorConfig {
        CollectorConfig {
            queue_capacity: capacity,
            interval_ms: 1,
            backoff_ms: 1,
            join_timeout_ms: 2000,
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_collector_fills_queue_and_stops() {
        let counters = Arc::new(HarvestCounters::new());
        let mut collector = EntropyCollector::spawn(
            open_shared(Box::new(SystemNoise::new())),
            Arc::new(NoiseExtractor::default()),
            &fast_config(1000),
            128,
            Arc::clone(&counters),
        )
        .unwrap();

        assert!(wait_until(|| collector.queue().len() >= 3));
        assert!(collector.is_running());

        assert_eq!(collector.stop(), StopOutcome::Joined);
        assert!(!collector.is_running());
        assert!(counters.snapshot().samples_collected >= 3);
        assert_eq!(collector.stop(), StopOutcome::NotRunning);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let counters = Arc::new(HarvestCounters::new());
        let mut collector = EntropyCollector::spawn(
            open_shared(Box::new(SystemNoise::new())),
            Arc::new(NoiseExtractor::default()),
            &fast_config(2),
            64,
            Arc::clone(&counters),
        )
        .unwrap();

        assert!(wait_until(|| counters.snapshot().samples_dropped >= 2));
        assert_eq!(collector.queue().len(), 2);
        assert_eq!(collector.stop(), StopOutcome::Joined);
    }

    #[test]
    fn test_read_errors_do_not_end_loop() {
        let counters = Arc::new(HarvestCounters::new());
        let mut collector = EntropyCollector::spawn(
            open_shared(Box::new(SimulatedNoise::with_seed(3).fail_every(2))),
            Arc::new(NoiseExtractor::default()),
            &fast_config(1000),
            64,
            Arc::clone(&counters),
        )
        .unwrap();

        assert!(wait_until(|| {
            let stats = counters.snapshot();
            stats.collector_errors >= 3 && stats.samples_collected >= 3
        }));
        assert!(collector.is_running());
        collector.stop();
    }

    #[test]
    fn test_exits_when_source_closed() {
        let source = open_shared(Box::new(SystemNoise::new()));
        let mut collector = EntropyCollector::spawn(
            Arc::clone(&source),
            Arc::new(NoiseExtractor::default()),
            &fast_config(1000),
            64,
            Arc::new(HarvestCounters::new()),
        )
        .unwrap();

        lock(&source).close();
        assert_eq!(lock(&source).status(), SourceStatus::Stopped);
        assert!(wait_until(|| !collector.is_running()));
        assert_eq!(collector.stop(), StopOutcome::Joined);
    }
}
