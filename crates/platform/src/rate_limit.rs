//! Rate Limiting Infrastructure
//!
//! Shared vocabulary for sliding-window rate limiting. Storage lives with
//! the owning domain; the window arithmetic is centralized here so every
//! backend computes the same decision.

use std::time::Duration;

/// Rate limit configuration for one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum attempts allowed in the window
    pub max_attempts: u32,
    /// Time window duration
    pub window: Duration,
}

impl RateLimitConfig {
    pub const fn new(max_attempts: u32, window_secs: u64) -> Self {
        Self {
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Attempts left in the current window (0 when refused)
    pub remaining: u32,
    /// Seconds until the window rolls over; meaningful when refused
    pub retry_after_secs: u64,
}

impl RateLimitDecision {
    /// Derive a decision from the stored window state
    ///
    /// `count` is the attempt count after the current hit was recorded.
    pub fn evaluate(config: &RateLimitConfig, count: u32, window_start_ms: i64, now_ms: i64) -> Self {
        let allowed = count <= config.max_attempts;
        let remaining = config.max_attempts.saturating_sub(count);

        let window_end_ms = window_start_ms + config.window_ms();
        let retry_after_secs = if allowed {
            0
        } else {
            // Round up so a caller that waits the hinted time lands in a
            // fresh window.
            let remaining_ms = (window_end_ms - now_ms).max(0);
            ((remaining_ms + 999) / 1000).max(1) as u64
        };

        Self {
            allowed,
            remaining,
            retry_after_secs,
        }
    }
}
