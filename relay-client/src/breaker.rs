//! Circuit breaker for the upstream orders API
//!
//! # States
//! - Closed: requests pass through, failures are counted in a rolling window
//! - Open: requests fail fast without reaching the network
//! - Half-open: after the cooldown a limited number of probes may pass
//!
//! ```text
//! Closed    → Open:      failure_threshold failures within window
//! Open      → Half-open: cooldown elapsed (checked on the next call)
//! Half-open → Closed:    a probe succeeds
//! Half-open → Open:      a probe fails
//! ```
//!
//! One breaker exists per upstream target for the process lifetime. It is
//! shared behind an `Arc` and synchronizes internally, so callers never lock.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

/// Breaker tuning
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Failures inside `window` that open the circuit
    pub failure_threshold: u32,
    /// Rolling window for counting failures
    pub window: Duration,
    /// Time spent open before probes are allowed
    pub cooldown: Duration,
    /// Calls admitted while half-open
    pub half_open_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
            half_open_probes: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failures: VecDeque<Instant>,
    opened_at: Option<Instant>,
    probes_admitted: u32,
}

/// Returned when the breaker rejects a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected;

#[derive(Debug)]
pub struct CircuitBreaker {
    target: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker guarding `target`
    pub fn new(target: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            target: target.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: VecDeque::new(),
                opened_at: None,
                probes_admitted: 0,
            }),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state, accounting for an elapsed cooldown
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        inner.state
    }

    /// Asks permission for one call
    ///
    /// The returned permit must be resolved with [`Permit::success`] or
    /// [`Permit::failure`]. Dropping it unresolved gives a half-open probe
    /// slot back without affecting the state.
    pub fn try_acquire(&self) -> Result<Permit<'_>, Rejected> {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());

        match inner.state {
            CircuitState::Closed => Ok(Permit::new(self, false)),
            CircuitState::Open => Err(Rejected),
            CircuitState::HalfOpen => {
                if inner.probes_admitted < self.config.half_open_probes {
                    inner.probes_admitted += 1;
                    Ok(Permit::new(self, true))
                } else {
                    Err(Rejected)
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self, inner: &mut Inner, now: Instant) {
        if inner.state == CircuitState::Open
            && inner
                .opened_at
                .is_some_and(|at| now.duration_since(at) >= self.config.cooldown)
        {
            info!(target_url = %self.target, "Circuit breaker half-open, admitting probes");
            inner.state = CircuitState::HalfOpen;
            inner.probes_admitted = 0;
        }
    }

    fn on_success(&self, probe: bool) {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::HalfOpen if probe => {
                info!(target_url = %self.target, "Circuit breaker closed after successful probe");
                inner.state = CircuitState::Closed;
                inner.failures.clear();
                inner.opened_at = None;
                inner.probes_admitted = 0;
            }
            CircuitState::Closed => inner.failures.clear(),
            // Late results from calls admitted before the circuit opened
            _ => {}
        }
    }

    fn on_failure(&self, probe: bool) {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.state {
            CircuitState::HalfOpen if probe => {
                warn!(target_url = %self.target, "Circuit breaker probe failed, reopening");
                self.open(&mut inner, now);
            }
            CircuitState::Closed => {
                inner.failures.push_back(now);
                while inner
                    .failures
                    .front()
                    .is_some_and(|t| now.duration_since(*t) > self.config.window)
                {
                    inner.failures.pop_front();
                }

                if inner.failures.len() >= self.config.failure_threshold as usize {
                    warn!(
                        target_url = %self.target,
                        failures = inner.failures.len(),
                        cooldown = ?self.config.cooldown,
                        "Circuit breaker opened"
                    );
                    self.open(&mut inner, now);
                }
            }
            // Late results from calls admitted before the circuit opened
            _ => {}
        }
    }

    fn open(&self, inner: &mut Inner, now: Instant) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(now);
        inner.failures.clear();
        inner.probes_admitted = 0;
    }

    fn release_probe(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.probes_admitted = inner.probes_admitted.saturating_sub(1);
        }
    }
}

/// Permission for one call through the breaker
#[must_use = "resolve the permit with success() or failure()"]
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    resolved: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            resolved: false,
        }
    }

    pub fn success(mut self) {
        self.resolved = true;
        self.breaker.on_success(self.probe);
    }

    pub fn failure(mut self) {
        self.resolved = true;
        self.breaker.on_failure(self.probe);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.resolved && self.probe {
            self.breaker.release_probe();
        }
    }
}
