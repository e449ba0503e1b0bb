//! Bounded-attempt retry state machine used by the agent runner.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 8000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): initial, doubling, capped.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Sum of every backoff an exhausted run sleeps through.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.backoff_after(a)).sum()
    }

    /// Upper bound on one agent run: every attempt times out, every backoff is slept.
    pub fn worst_case(&self, call_timeout: Duration) -> Duration {
        call_timeout * self.max_attempts + self.total_backoff()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    InFlight,
    Done,
}

/// Tracks attempts for one agent run.
///
/// `begin_attempt` must be followed by exactly one of `succeed` or `fail`.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    phase: Phase,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            phase: Phase::Ready,
        }
    }

    /// Starts the next attempt and returns its 1-based number, or `None` once
    /// the run is finished.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.phase != Phase::Ready {
            return None;
        }
        self.attempt += 1;
        self.phase = Phase::InFlight;
        Some(self.attempt)
    }

    pub fn succeed(&mut self) {
        self.phase = Phase::Done;
    }

    pub fn fail(&mut self, retryable: bool) -> RetryDecision {
        if self.phase != Phase::InFlight {
            return RetryDecision::GiveUp;
        }
        if retryable && self.attempt < self.policy.max_attempts {
            self.phase = Phase::Ready;
            RetryDecision::Retry {
                delay: self.policy.backoff_after(self.attempt),
            }
        } else {
            self.phase = Phase::Done;
            RetryDecision::GiveUp
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}
