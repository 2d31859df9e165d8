use std::time::{Duration, Instant};

/// Tracks consecutive provider failures so a provider that keeps failing is
/// skipped for a cool-down period instead of being called on every search.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    success_threshold: u32,
    open_duration: Duration,
    state: State,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { successes: u32 },
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 1,
            open_duration: Duration::from_secs(300),
        }
    }
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            success_threshold: config.success_threshold.max(1),
            open_duration: config.open_duration,
            state: State::Closed { failures: 0 },
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed { .. })
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }

    // An open breaker moves to half-open once the cool-down has elapsed
    pub fn should_allow_call(&mut self) -> bool {
        if let State::Open { opened_at } = self.state {
            if opened_at.elapsed() < self.open_duration {
                return false;
            }
            self.state = State::HalfOpen { successes: 0 };
        }
        true
    }

    pub fn success(&mut self) {
        self.state = match self.state {
            State::HalfOpen { successes } if successes + 1 < self.success_threshold => {
                State::HalfOpen {
                    successes: successes + 1,
                }
            }
            open @ State::Open { .. } => open,
            _ => State::Closed { failures: 0 },
        };
    }

    /// A failure while half-open re-opens at once.
    pub fn fail(&mut self) {
        self.state = match self.state {
            State::Closed { failures } if failures + 1 < self.failure_threshold => {
                State::Closed {
                    failures: failures + 1,
                }
            }
            open @ State::Open { .. } => open,
            _ => State::Open {
                opened_at: Instant::now(),
            },
        };
    }
}
