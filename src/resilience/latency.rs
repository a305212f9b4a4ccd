//! Sliding window of recent call latencies.
//!
//! # Design Decisions
//! - Fixed capacity FIFO: the oldest sample is evicted once full
//! - Percentiles are computed on a sorted copy; insertion order is kept
//! - An empty window reports a fixed "healthy" default so a cold breaker
//!   never trips on missing evidence

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Thread-safe latency window.
#[derive(Debug)]
pub struct LatencyTracker {
    samples: Mutex<VecDeque<Duration>>,
    capacity: usize,
    default_latency: Duration,
}

impl LatencyTracker {
    pub fn new(capacity: usize, default_latency: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            default_latency,
        }
    }

    /// Append a sample, evicting the oldest when over capacity.
    pub fn record(&self, latency: Duration) {
        let mut samples = self.samples.lock().expect("latency window mutex poisoned");
        samples.push_back(latency);
        while samples.len() > self.capacity {
            samples.pop_front();
        }
    }

    /// Sample at sorted rank `floor(p * n / 100)`, clamped to the last sample.
    ///
    /// `p` above 100 is treated as 100.
    pub fn percentile(&self, p: u8) -> Duration {
        let mut sorted: Vec<Duration> = {
            let samples = self.samples.lock().expect("latency window mutex poisoned");
            if samples.is_empty() {
                return self.default_latency;
            }
            samples.iter().copied().collect()
        };
        sorted.sort_unstable();

        let n = sorted.len();
        let rank = (usize::from(p.min(100)) * n) / 100;
        sorted[rank.min(n - 1)]
    }

    /// Drop every sample.
    pub fn reset(&self) {
        self.samples
            .lock()
            .expect("latency window mutex poisoned")
            .clear();
    }

    pub fn len(&self) -> usize {
        self.samples.lock().expect("latency window mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples in arrival order.
    pub fn samples(&self) -> Vec<Duration> {
        self.samples
            .lock()
            .expect("latency window mutex poisoned")
            .iter()
            .copied()
            .collect()
    }
}
