//! ==============================================================================
//! backoff.rs - exponential backoff for remote forecast fetches
//! ==============================================================================
//!
//! purpose:
//!     tracks consecutive remote failures and the earliest time the next
//!     fetch may be attempted. pure state: the caller supplies `now`.
//!
//!     gate after the n-th consecutive failure:
//!
//!         base * 2^min(n, exponent_cap)      (30s * 2^6 = 1920s max)
//!
//!     failure_count keeps counting up to failure_cap for diagnostics even
//!     after the delay has stopped growing.
//!
//! relationships:
//!     - mutated by: fetch.rs (one transition per network attempt)
//!     - read by: scheduler.rs (skip gated fetch steps)
//!
//! ==============================================================================

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct BackoffPolicy {
    pub base_seconds: u64,
    pub failure_cap: u32,
    pub exponent_cap: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { base_seconds: 30, failure_cap: 10, exponent_cap: 6 }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    pub failure_count: u32,
    /// 0 means never gated
    pub next_allowed_at: u64,
}

#[derive(Debug, Clone)]
pub struct BackoffController {
    policy: BackoffPolicy,
    state: BackoffState,
}

impl BackoffController {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, state: BackoffState::default() }
    }

    pub fn state(&self) -> BackoffState {
        self.state
    }

    pub fn is_gated(&self, now: u64) -> bool {
        now < self.state.next_allowed_at
    }

    pub fn on_success(&mut self) {
        self.state = BackoffState::default();
    }

    /// record a remote failure at `now`, returns the gate length in seconds
    pub fn on_failure(&mut self, now: u64) -> u64 {
        let count = self.state.failure_count.saturating_add(1).min(self.policy.failure_cap);
        let exponent = count.min(self.policy.exponent_cap);
        let backoff = self
            .policy
            .base_seconds
            .saturating_mul(1u64.checked_shl(exponent).unwrap_or(u64::MAX));

        self.state = BackoffState {
            failure_count: count,
            next_allowed_at: now.saturating_add(backoff),
        };
        backoff
    }
}

impl Default for BackoffController {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}
