//! Sliding-window rate limiter for one incident session.
//!
//! Orthogonal to the determinism core: it throttles how fast the agent can
//! hammer the tool surface, it never changes what any position returns.
//! A limited request is surfaced as a structured value with a retry-after
//! hint; repeat violations back off exponentially.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: usize,
    /// Max requests inside the 5-second burst window.
    pub burst_limit: usize,
    /// Exponential backoff multiplier per violation.
    pub penalty_multiplier: f64,
    /// Base retry-after seconds.
    pub initial_retry_after: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
            burst_limit: 5,
            penalty_multiplier: 2.0,
            initial_retry_after: 2,
        }
    }
}

/// Outcome of admitting one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Admission {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

pub struct RateLimiter {
    config: RateLimitConfig,
    request_times: VecDeque<Instant>,
    violations: u32,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            request_times: VecDeque::new(),
            violations: 0,
        }
    }

    /// Admit or reject a request arriving now.
    pub fn admit(&mut self) -> Admission {
        self.admit_at(Instant::now())
    }

    /// Clock-injected variant, used by tests.
    pub fn admit_at(&mut self, now: Instant) -> Admission {
        let minute_ago = now.checked_sub(Duration::from_secs(60));
        while let (Some(&front), Some(cutoff)) = (self.request_times.front(), minute_ago) {
            if front < cutoff {
                self.request_times.pop_front();
            } else {
                break;
            }
        }

        let over_minute = self.request_times.len() >= self.config.requests_per_minute;
        let burst_cutoff = now.checked_sub(Duration::from_secs(5));
        let burst_count = match burst_cutoff {
            Some(cutoff) => self.request_times.iter().filter(|&&t| t >= cutoff).count(),
            None => self.request_times.len(),
        };
        let over_burst = burst_count >= self.config.burst_limit;

        if over_minute || over_burst {
            self.violations += 1;
            return Admission::Limited {
                retry_after_seconds: self.retry_after(),
            };
        }

        self.request_times.push_back(now);
        Admission::Allowed
    }

    /// Retry-after with exponential backoff, capped at 2^10 multipliers.
    fn retry_after(&self) -> u64 {
        let exponent = self.violations.min(10);
        let multiplier = self.config.penalty_multiplier.powi(exponent as i32);
        (self.config.initial_retry_after as f64 * multiplier) as u64
    }

    pub fn violations(&self) -> u32 {
        self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_limit_trips_before_minute_limit() {
        let mut limiter = RateLimiter::new(RateLimitConfig::default());
        let start = Instant::now();
        for i in 0..5 {
            assert_eq!(
                limiter.admit_at(start + Duration::from_millis(i * 100)),
                Admission::Allowed
            );
        }
        assert!(matches!(
            limiter.admit_at(start + Duration::from_millis(600)),
            Admission::Limited { .. }
        ));
    }

    #[test]
    fn spaced_requests_pass_and_backoff_grows() {
        let mut limiter = RateLimiter::new(RateLimitConfig::default());
        let start = Instant::now();
        // Spaced 6s apart: never bursts, never exceeds 30/min.
        for i in 0..10 {
            assert_eq!(
                limiter.admit_at(start + Duration::from_secs(i * 6)),
                Admission::Allowed
            );
        }

        // Hammer to collect violations; retry-after must grow.
        let t = start + Duration::from_secs(100);
        let mut last_retry = 0;
        for i in 0..4 {
            for j in 0..6 {
                let _ = limiter.admit_at(t + Duration::from_millis(i * 10 + j));
            }
        }
        if let Admission::Limited {
            retry_after_seconds,
        } = limiter.admit_at(t + Duration::from_millis(50))
        {
            last_retry = retry_after_seconds;
        }
        assert!(last_retry > 2, "backoff should exceed the base: {last_retry}");
    }
}
