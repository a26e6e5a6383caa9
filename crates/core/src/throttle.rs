//! Resend rate limiting for approval signature requests. The engine never
//! sends anything itself; the downstream signature-request workflow calls
//! `ResendThrottle::check` before each resend and stores the returned state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Last-send bookkeeping for one approver notification channel. Owned by the
/// caller and threaded through `ResendThrottle::check`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendState {
    pub last_sent_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottleDecision {
    pub allowed: bool,
    /// Time left until the next send is allowed; zero when `allowed`.
    pub retry_after: Duration,
    pub next_state: ResendState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResendThrottle {
    min_interval: Duration,
}

impl ResendThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn check(&self, state: ResendState, now: DateTime<Utc>) -> ThrottleDecision {
        let Some(last_sent_at) = state.last_sent_at else {
            return self.allow(now);
        };

        // a clock that moved backwards counts as "just sent"
        let elapsed = (now - last_sent_at).max(Duration::zero());
        if elapsed >= self.min_interval {
            return self.allow(now);
        }

        ThrottleDecision { allowed: false, retry_after: self.min_interval - elapsed, next_state: state }
    }

    fn allow(&self, now: DateTime<Utc>) -> ThrottleDecision {
        ThrottleDecision {
            allowed: true,
            retry_after: Duration::zero(),
            next_state: ResendState { last_sent_at: Some(now) },
        }
    }
}

impl Default for ResendThrottle {
    fn default() -> Self {
        Self::new(Duration::seconds(60))
    }
}
