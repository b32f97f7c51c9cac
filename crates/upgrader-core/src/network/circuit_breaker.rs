//! Circuit breaker for the upstream release API.
//!
//! - CLOSED: calls pass through to the primary operation
//! - OPEN: calls are routed straight to the fallback
//! - HALF_OPEN: one probe call is allowed after the recovery timeout
//!
//! The breaker decides *whether* the primary path is attempted, not how
//! the request is made: in this system both the primary and the fallback
//! path hit the network, and a breaker that is open simply degrades every
//! call to the uncached fallback.

use crate::config::NetworkConfig;
use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// Time to wait before attempting recovery.
    pub recovery_timeout: Duration,
    /// Budget for one gated primary call; exceeding it counts as a failure.
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: NetworkConfig::FAILURE_THRESHOLD,
            recovery_timeout: NetworkConfig::RECOVERY_TIMEOUT,
            call_timeout: NetworkConfig::CALL_TIMEOUT,
        }
    }
}

/// Per-endpoint call-gating policy object.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: RwLock<CircuitState>,
    /// Consecutive failure count (reset on success).
    failure_count: AtomicU32,
    /// When the circuit was opened.
    opened_at: RwLock<Option<Instant>>,
    /// Number of probe calls made in half-open state.
    half_open_calls: AtomicU32,
    /// Endpoint this breaker protects.
    endpoint: String,
}

impl CircuitBreaker {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_config(endpoint, CircuitBreakerConfig::default())
    }

    pub fn with_config(endpoint: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            opened_at: RwLock::new(None),
            half_open_calls: AtomicU32::new(0),
            endpoint: endpoint.into(),
        }
    }

    /// Get the current state of the circuit.
    pub fn state(&self) -> CircuitState {
        self.maybe_transition_to_half_open();
        *self.state.read().unwrap()
    }

    /// Consecutive failure count since the last success.
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Check if a primary call should be allowed through.
    pub fn allow_request(&self) -> bool {
        self.maybe_transition_to_half_open();

        let state = *self.state.read().unwrap();
        match state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                // One probe at a time
                self.half_open_calls.fetch_add(1, Ordering::SeqCst) == 0
            }
        }
    }

    /// Record a successful primary call.
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);

        let state = *self.state.read().unwrap();
        if state == CircuitState::HalfOpen {
            self.transition_to_closed();
        }
    }

    /// Record a failed primary call.
    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;

        let state = *self.state.read().unwrap();
        match state {
            CircuitState::Closed => {
                if failures >= self.config.failure_threshold {
                    self.transition_to_open();
                }
            }
            CircuitState::HalfOpen => {
                // Probe failed, reopen and restart the recovery clock
                self.transition_to_open();
            }
            CircuitState::Open => {}
        }
    }

    /// Reset the circuit breaker to closed state.
    pub fn reset(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        self.half_open_calls.store(0, Ordering::SeqCst);
        *self.opened_at.write().unwrap() = None;
        *self.state.write().unwrap() = CircuitState::Closed;
        info!("Circuit breaker for {} reset to CLOSED", self.endpoint);
    }

    // Internal state transitions

    fn transition_to_open(&self) {
        let mut state = self.state.write().unwrap();
        *state = CircuitState::Open;
        *self.opened_at.write().unwrap() = Some(Instant::now());
        self.half_open_calls.store(0, Ordering::SeqCst);
        warn!(
            "Circuit breaker for {} opened after {} failures",
            self.endpoint,
            self.failure_count.load(Ordering::SeqCst)
        );
    }

    fn transition_to_closed(&self) {
        let mut state = self.state.write().unwrap();
        *state = CircuitState::Closed;
        self.failure_count.store(0, Ordering::SeqCst);
        *self.opened_at.write().unwrap() = None;
        info!("Circuit breaker for {} recovered to CLOSED", self.endpoint);
    }

    fn maybe_transition_to_half_open(&self) {
        let state = *self.state.read().unwrap();
        if state != CircuitState::Open {
            return;
        }

        let opened_at = *self.opened_at.read().unwrap();
        if let Some(opened) = opened_at {
            if opened.elapsed() >= self.config.recovery_timeout {
                let mut state = self.state.write().unwrap();
                if *state == CircuitState::Open {
                    *state = CircuitState::HalfOpen;
                    self.half_open_calls.store(0, Ordering::SeqCst);
                    debug!("Circuit breaker for {} entering HALF_OPEN", self.endpoint);
                }
            }
        }
    }
}

/// Registry of circuit breakers keyed by endpoint identifier.
///
/// Owned by the orchestrator; per-endpoint state is independent, so one
/// failing repository endpoint never trips another's breaker. State lives
/// in memory only and does not survive process restarts.
pub struct BreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the breaker for an endpoint.
    pub fn breaker(&self, endpoint: &str) -> Arc<CircuitBreaker> {
        {
            let breakers = self.breakers.read().unwrap();
            if let Some(breaker) = breakers.get(endpoint) {
                return Arc::clone(breaker);
            }
        }

        let mut breakers = self.breakers.write().unwrap();
        Arc::clone(breakers.entry(endpoint.to_string()).or_insert_with(|| {
            debug!("Creating circuit breaker for endpoint: {}", endpoint);
            Arc::new(CircuitBreaker::with_config(endpoint, self.config.clone()))
        }))
    }

    /// Execute a gated call against an endpoint.
    ///
    /// While the breaker is closed (or half-open and due for a probe), the
    /// primary operation runs under the call timeout; a timeout or
    /// transport error counts against the breaker and the call degrades to
    /// the fallback. While the breaker is open, the fallback is invoked
    /// directly and the primary is never attempted. Non-transport errors
    /// are returned as-is and do not count.
    pub async fn call<T, P, PF, F, FF>(
        &self,
        endpoint: &str,
        primary: P,
        fallback: F,
    ) -> Result<T>
    where
        P: FnOnce() -> PF,
        PF: Future<Output = Result<T>>,
        F: FnOnce() -> FF,
        FF: Future<Output = Result<T>>,
    {
        let breaker = self.breaker(endpoint);

        if !breaker.allow_request() {
            debug!("Circuit open for {}, routing to fallback", endpoint);
            return fallback().await;
        }

        match tokio::time::timeout(self.config.call_timeout, primary()).await {
            Ok(Ok(value)) => {
                breaker.record_success();
                Ok(value)
            }
            Ok(Err(e)) if e.is_transport() => {
                breaker.record_failure();
                warn!(
                    "Primary call failed for {} ({}), degrading to fallback",
                    endpoint, e
                );
                fallback().await
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                breaker.record_failure();
                warn!(
                    "Primary call timed out after {:?} for {}, degrading to fallback",
                    self.config.call_timeout, endpoint
                );
                fallback().await
            }
        }
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
