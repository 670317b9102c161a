//! Reconnect policy: exponential backoff after abnormal closes.

use std::time::Duration;

/// Close code for a deliberate, clean shutdown. Never retried.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close frame carried no status code.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Transport dropped or never opened.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// What the connection worker should do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Server or client closed cleanly; stay closed.
    Normal,
    /// Attempt budget spent; stay closed until the next `connect()`.
    Exhausted { attempts: u32 },
    /// Sleep `delay`, then open again as retry number `attempt`.
    Retry { attempt: u32, delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry. Doubles for every later one.
    pub base_delay: Duration,
    /// Consecutive failed cycles allowed before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Backoff before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Decide how to react to a close with `close_code`, given the number
    /// of retries already spent since the last successful open.
    pub fn decide(&self, close_code: u16, attempts: u32) -> ReconnectDecision {
        if close_code == NORMAL_CLOSURE {
            return ReconnectDecision::Normal;
        }
        if attempts >= self.max_attempts {
            return ReconnectDecision::Exhausted { attempts };
        }
        let attempt = attempts + 1;
        ReconnectDecision::Retry {
            attempt,
            delay: self.delay_for_attempt(attempt),
        }
    }
}
