//! Adaptive circuit breaker guarding rate lookups.
//!
//! # States
//! - Closed: normal operation, lookups pass through and latencies are sampled
//! - Open: the feed is assumed unhealthy, calls fail fast with `CircuitOpen`
//! - Half-Open: a bounded number of probe calls test whether it recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open:     before a call, p90 latency > latency threshold
//!                    or consecutive failures > failure threshold;
//!                    after a call, consecutive failures > failure threshold
//! Open → Half-Open:  first call after the cool-down since opened_at
//! Half-Open → Closed: a probe succeeds (failures and latency window cleared)
//! Half-Open → Open:  a probe fails (opened_at refreshed)
//! ```
//!
//! # Design Decisions
//! - One mutex guards the phase and its counters, so concurrent callers see
//!   linearizable transitions; once any caller trips, the breaker is Open
//! - Every transition bumps a generation; outcomes of calls admitted under an
//!   older generation only contribute latency, never counters
//! - Only upstream failures count against the feed; an unknown currency code
//!   is a client problem and counts as a healthy answer
//! - A probe abandoned mid-flight (caller cancelled) returns its slot

use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::rates::{RateCache, RateError, RateResult};
use crate::resilience::latency::LatencyTracker;

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { probes: u32 },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct Machine {
    phase: Phase,
    generation: u64,
}

/// Breaker status, for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub half_open_probes: u32,
    pub opened_for_ms: Option<u64>,
    pub window_len: usize,
    pub latency_percentile: u8,
    pub latency_percentile_ms: u64,
}

/// Circuit breaker wrapping the rate cache.
pub struct CircuitBreaker {
    cache: RateCache,
    latency: LatencyTracker,
    machine: Mutex<Machine>,
    cool_down: Duration,
    failure_threshold: u32,
    latency_threshold: Duration,
    percentile: u8,
    half_open_probes: u32,
}

impl CircuitBreaker {
    /// Create a closed breaker in front of `cache`.
    pub fn new(config: &BreakerConfig, cache: RateCache) -> Self {
        Self {
            cache,
            latency: LatencyTracker::new(
                config.window_capacity,
                Duration::from_millis(config.default_latency_ms),
            ),
            machine: Mutex::new(Machine {
                phase: Phase::Closed {
                    consecutive_failures: 0,
                },
                generation: 0,
            }),
            cool_down: Duration::from_millis(config.cool_down_ms),
            failure_threshold: config.failure_threshold,
            latency_threshold: Duration::from_millis(config.latency_threshold_ms),
            percentile: config.latency_percentile,
            half_open_probes: config.half_open_probes,
        }
    }

    /// Look up the rate for `from`, subject to the breaker.
    ///
    /// `to` is carried for logging only: every rate is quoted in the feed's
    /// base currency.
    pub async fn execute(&self, from: &str, to: &str) -> RateResult<f64> {
        let admission = match self.admit() {
            Ok(admission) => admission,
            Err(e) => {
                tracing::debug!(from = %from, to = %to, "Circuit open, rejecting rate lookup");
                return Err(e);
            }
        };

        let started = Instant::now();
        let result = self.cache.lookup(from).await;
        let elapsed = started.elapsed();
        admission.settle(elapsed, &result);

        match &result {
            Ok(rate) => tracing::debug!(
                from = %from,
                to = %to,
                rate = rate,
                latency_ms = elapsed.as_millis() as u64,
                "Exchange rate retrieved"
            ),
            Err(e) => tracing::debug!(
                from = %from,
                to = %to,
                error = %e,
                latency_ms = elapsed.as_millis() as u64,
                "Exchange rate lookup failed"
            ),
        }

        result
    }

    /// Current state. An Open breaker whose cool-down has elapsed still
    /// reports Open until the next call moves it to Half-Open.
    pub fn state(&self) -> CircuitState {
        self.lock().phase.state()
    }

    /// When the breaker last opened, if it is currently Open.
    pub fn opened_at(&self) -> Option<Instant> {
        match self.lock().phase {
            Phase::Open { opened_at } => Some(opened_at),
            _ => None,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        match self.lock().phase {
            Phase::Closed {
                consecutive_failures,
            } => consecutive_failures,
            _ => 0,
        }
    }

    /// Time left before an Open breaker admits a probe.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.lock().phase {
            Phase::Open { opened_at } => Some(self.cool_down.saturating_sub(opened_at.elapsed())),
            _ => None,
        }
    }

    pub fn cool_down(&self) -> Duration {
        self.cool_down
    }

    pub fn latency(&self) -> &LatencyTracker {
        &self.latency
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let machine = self.lock();
        let (consecutive_failures, half_open_probes, opened_for_ms) = match machine.phase {
            Phase::Closed {
                consecutive_failures,
            } => (consecutive_failures, 0, None),
            Phase::Open { opened_at } => (0, 0, Some(opened_at.elapsed().as_millis() as u64)),
            Phase::HalfOpen { probes } => (0, probes, None),
        };

        BreakerSnapshot {
            state: machine.phase.state(),
            consecutive_failures,
            half_open_probes,
            opened_for_ms,
            window_len: self.latency.len(),
            latency_percentile: self.percentile,
            latency_percentile_ms: self.latency.percentile(self.percentile).as_millis() as u64,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().expect("circuit breaker lock is not poisoned")
    }

    /// Decide whether a call may proceed, applying any due transition.
    fn admit(&self) -> RateResult<Admission<'_>> {
        let mut machine = self.lock();
        let now = Instant::now();

        if let Phase::Open { opened_at } = machine.phase {
            if now.duration_since(opened_at) >= self.cool_down {
                self.transition(&mut machine, Phase::HalfOpen { probes: 0 }, "cool-down elapsed");
            }
        }

        let phase = machine.phase;
        match phase {
            Phase::Closed {
                consecutive_failures,
            } => {
                let observed = self.latency.percentile(self.percentile);
                let reason = if observed > self.latency_threshold {
                    Some("latency percentile above threshold")
                } else if consecutive_failures > self.failure_threshold {
                    Some("consecutive failures above threshold")
                } else {
                    None
                };

                if let Some(reason) = reason {
                    tracing::warn!(
                        percentile = self.percentile,
                        observed_ms = observed.as_millis() as u64,
                        threshold_ms = self.latency_threshold.as_millis() as u64,
                        consecutive_failures,
                        "Tripping circuit breaker before call"
                    );
                    self.transition(&mut machine, Phase::Open { opened_at: now }, reason);
                    metrics::record_breaker_rejection();
                    return Err(RateError::CircuitOpen);
                }

                Ok(Admission::new(self, machine.generation, false))
            }
            Phase::HalfOpen { probes } if probes < self.half_open_probes => {
                machine.phase = Phase::HalfOpen { probes: probes + 1 };
                Ok(Admission::new(self, machine.generation, true))
            }
            Phase::HalfOpen { .. } | Phase::Open { .. } => {
                metrics::record_breaker_rejection();
                Err(RateError::CircuitOpen)
            }
        }
    }

    /// Fold a finished call into the counters.
    fn settle(&self, generation: u64, latency: Duration, result: &RateResult<f64>) {
        let mut machine = self.lock();

        if !matches!(machine.phase, Phase::Open { .. }) {
            self.latency.record(latency);
        }

        if generation != machine.generation {
            return;
        }

        let failed = matches!(result, Err(e) if e.is_upstream_failure());
        let phase = machine.phase;
        match phase {
            Phase::Closed {
                consecutive_failures,
            } => {
                if !failed {
                    machine.phase = Phase::Closed {
                        consecutive_failures: 0,
                    };
                    return;
                }

                let failures = consecutive_failures.saturating_add(1);
                if failures > self.failure_threshold {
                    self.transition(
                        &mut machine,
                        Phase::Open {
                            opened_at: Instant::now(),
                        },
                        "consecutive failures above threshold",
                    );
                } else {
                    machine.phase = Phase::Closed {
                        consecutive_failures: failures,
                    };
                }
            }
            Phase::HalfOpen { .. } => {
                if failed {
                    self.transition(
                        &mut machine,
                        Phase::Open {
                            opened_at: Instant::now(),
                        },
                        "half-open probe failed",
                    );
                } else {
                    self.transition(
                        &mut machine,
                        Phase::Closed {
                            consecutive_failures: 0,
                        },
                        "half-open probe succeeded",
                    );
                }
            }
            Phase::Open { .. } => {}
        }
    }

    /// Return the probe slot of a call that never finished.
    fn abandon(&self, generation: u64) {
        let mut machine = self.lock();
        if generation != machine.generation {
            return;
        }
        if let Phase::HalfOpen { probes } = machine.phase {
            machine.phase = Phase::HalfOpen {
                probes: probes.saturating_sub(1),
            };
        }
    }

    fn transition(&self, machine: &mut Machine, to: Phase, reason: &'static str) {
        let from = machine.phase.state();
        machine.phase = to;
        machine.generation = machine.generation.wrapping_add(1);

        if let Phase::Closed { .. } = to {
            self.latency.reset();
        }

        match to.state() {
            CircuitState::Open => tracing::warn!(
                from = from.as_str(),
                to = "open",
                reason,
                cool_down_ms = self.cool_down.as_millis() as u64,
                "Circuit breaker state change"
            ),
            state => tracing::info!(
                from = from.as_str(),
                to = state.as_str(),
                reason,
                "Circuit breaker state change"
            ),
        }
        metrics::record_breaker_transition(from.as_str(), to.state().as_str());
    }
}

/// An admitted call. Settling it records the outcome; dropping it unsettled
/// releases any half-open probe slot it held.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    probe: bool,
    settled: bool,
}

impl<'a> Admission<'a> {
    fn new(breaker: &'a CircuitBreaker, generation: u64, probe: bool) -> Self {
        Self {
            breaker,
            generation,
            probe,
            settled: false,
        }
    }

    fn settle(mut self, latency: Duration, result: &RateResult<f64>) {
        self.settled = true;
        self.breaker.settle(self.generation, latency, result);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.abandon(self.generation);
        }
    }
}
