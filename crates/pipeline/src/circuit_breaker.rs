//! Circuit breaker guarding the pipeline's external calls (spec §4.10 step 7).
//!
//! Three states: closed (normal), open (fail fast), half-open (trial
//! requests to see if the backend recovered). A consecutive-failure count
//! opens the circuit; after `config.timeout` it moves to half-open and a
//! run of `config.success_threshold` successes closes it again.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Per-dependency breaker. Cheap to clone-share via `Arc`; all mutation is
/// through interior locking so `&self` is enough for callers.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: RwLock<State>,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    opened_at: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: RwLock::new(State::Closed),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            opened_at: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, lazily transitioning Open -> HalfOpen once the
    /// timeout has elapsed.
    pub fn state(&self) -> State {
        if *self.state.read() == State::Open {
            let should_trial = self.opened_at.read().is_some_and(|at| at.elapsed() >= self.config.timeout);
            if should_trial {
                *self.state.write() = State::HalfOpen;
                self.consecutive_successes.store(0, Ordering::SeqCst);
            }
        }
        *self.state.read()
    }

    pub fn can_execute(&self) -> bool {
        self.state() != State::Open
    }

    fn record_success(&self) {
        match self.state() {
            State::Closed => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
            }
            State::HalfOpen => {
                let successes = self.consecutive_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    *self.state.write() = State::Closed;
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                    *self.opened_at.write() = None;
                }
            }
            State::Open => {}
        }
    }

    fn record_failure(&self) {
        match self.state() {
            State::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.failure_threshold {
                    self.trip();
                }
            }
            State::HalfOpen => self.trip(),
            State::Open => {}
        }
    }

    fn trip(&self) {
        *self.state.write() = State::Open;
        *self.opened_at.write() = Some(Instant::now());
        tracing::warn!(breaker = %self.name, "circuit breaker opened");
    }

    /// Run `op` if the breaker allows it, recording the outcome. Returns
    /// `None` if the circuit is open (caller falls back to a degraded path).
    pub async fn call<F, Fut, T>(&self, op: F) -> Option<rag_core::Result<T>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = rag_core::Result<T>>,
    {
        if !self.can_execute() {
            tracing::warn!(breaker = %self.name, "circuit open, skipping call");
            return None;
        }

        let result = op().await;
        match &result {
            Ok(_) => self.record_success(),
            Err(e) => {
                tracing::warn!(breaker = %self.name, error = %e, "call failed");
                self.record_failure();
            }
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig { failure_threshold, success_threshold: 2, timeout: Duration::from_millis(20) },
        )
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let cb = breaker(2);
        assert!(cb.call(|| async { Err::<(), _>(rag_core::Error::Generation("x".into())) }).await.unwrap().is_err());
        assert!(cb.can_execute());
        assert!(cb.call(|| async { Err::<(), _>(rag_core::Error::Generation("x".into())) }).await.unwrap().is_err());
        assert!(!cb.can_execute());
    }

    #[tokio::test]
    async fn skips_call_while_open() {
        let cb = breaker(1);
        let _ = cb.call(|| async { Err::<(), _>(rag_core::Error::Generation("x".into())) }).await;
        assert!(!cb.can_execute());
        assert!(cb.call(|| async { Ok::<_, rag_core::Error>(()) }).await.is_none());
    }

    #[tokio::test]
    async fn half_open_recovers_after_timeout() {
        let cb = breaker(1);
        let _ = cb.call(|| async { Err::<(), _>(rag_core::Error::Generation("x".into())) }).await;
        assert!(!cb.can_execute());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cb.state(), State::HalfOpen);

        let _ = cb.call(|| async { Ok::<_, rag_core::Error>(()) }).await;
        let _ = cb.call(|| async { Ok::<_, rag_core::Error>(()) }).await;
        assert_eq!(cb.state(), State::Closed);
    }

    #[tokio::test]
    async fn success_resets_failure_count_in_closed_state() {
        let cb = breaker(2);
        let _ = cb.call(|| async { Err::<(), _>(rag_core::Error::Generation("x".into())) }).await;
        let _ = cb.call(|| async { Ok::<_, rag_core::Error>(()) }).await;
        let _ = cb.call(|| async { Err::<(), _>(rag_core::Error::Generation("x".into())) }).await;
        assert!(cb.can_execute());
    }
}
