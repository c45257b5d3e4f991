use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker - guards calls to an outbound dependency
// ============================================================================
//
// After `failure_threshold` consecutive failures the breaker opens and
// rejects calls without touching the dependency. Once `open_for` has
// elapsed it goes HalfOpen and admits one probe at a time; other callers
// are rejected while that probe is in flight. `success_threshold` probe
// successes close it again, a single probe failure reopens it. A probe
// whose future was dropped stops blocking others after another `open_for`.
//
// ============================================================================

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

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_for: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit '{0}' is open")]
    CircuitOpen(&'static str),

    #[error(transparent)]
    OperationFailed(E),
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    probe_started: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: &'static str,
    state: Arc<Mutex<BreakerState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
                probe_started: None,
            })),
            config,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run `operation` unless the breaker is open.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut state = self.state.lock().await;
            match state.state {
                CircuitState::Closed => {}
                CircuitState::Open => {
                    let cooled_down = state
                        .opened_at
                        .map_or(true, |opened| opened.elapsed() >= self.config.open_for);
                    if !cooled_down {
                        return Err(CircuitBreakerError::CircuitOpen(self.name));
                    }
                    tracing::info!(circuit = self.name, "Circuit breaker half-open, probing");
                    state.state = CircuitState::HalfOpen;
                    state.success_count = 0;
                }
                CircuitState::HalfOpen => {
                    let probing = state
                        .probe_started
                        .is_some_and(|started| started.elapsed() < self.config.open_for);
                    if probing {
                        return Err(CircuitBreakerError::CircuitOpen(self.name));
                    }
                }
            }
            if state.state == CircuitState::HalfOpen {
                state.probe_started = Some(Instant::now());
            }
        }

        match operation.await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(err) => {
                self.record_failure().await;
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    async fn record_success(&self) {
        let mut state = self.state.lock().await;
        state.probe_started = None;
        match state.state {
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.config.success_threshold {
                    tracing::info!(circuit = self.name, "✅ Circuit breaker closed");
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                    state.opened_at = None;
                }
            }
            CircuitState::Closed => state.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        state.probe_started = None;
        state.failure_count += 1;

        let reopen = match state.state {
            CircuitState::Closed => state.failure_count >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if reopen {
            tracing::warn!(
                circuit = self.name,
                failures = state.failure_count,
                "❌ Circuit breaker opened"
            );
            state.state = CircuitState::Open;
            state.success_count = 0;
            state.opened_at = Some(Instant::now());
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.state
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
