//! Incident clock — simulated time, advanced once per inbound request.
//!
//! Each tool call the agent makes moves the incident forward by a bounded
//! random number of minutes. The clock feeds a severity modifier into
//! metric queries: things get worse over a two-hour horizon, briefly
//! improve inside a recovery window after a remediation attempt, then
//! re-degrade.

use serde::Serialize;

use crate::{
    rng::PositionRng,
    types::{Minutes, Tick},
};

/// Degradation saturates after this many simulated minutes.
const DEGRADATION_HORIZON_MINUTES: f64 = 120.0;

/// A remediation attempt buys this many minutes of apparent improvement.
pub const RECOVERY_WINDOW_MINUTES: Minutes = 5;

/// During the recovery window, degradation is scaled to 30% of its value.
const RECOVERY_RELIEF_FACTOR: f64 = 0.3;

/// How a metric family responds to mounting incident severity. A single
/// global curve would make every chart look the same; leak counters climb,
/// success ratios decay, queue lag explodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricShape {
    /// Leak-like counters (goroutines, memory, rebalances): monotonic growth.
    LeakLike,
    /// Success-rate-like ratios: monotonic decay toward a floor.
    RatioLike,
    /// Queue/lag-like counters: exponential growth.
    LagLike,
    /// Latency/duration: steep linear growth.
    LatencyLike,
    /// Throughput that collapses as upstream pools exhaust.
    ThroughputLike,
    /// Everything else: untouched.
    Neutral,
}

impl MetricShape {
    /// Classify a metric by name. Matching is deliberately substring-based;
    /// metric names in the wild are free-form.
    pub fn classify(metric_name: &str) -> Self {
        let name = metric_name.to_lowercase();
        if name.contains("goroutine") || name.contains("memory") || name.contains("rebalance") {
            Self::LeakLike
        } else if name.contains("success_rate") {
            Self::RatioLike
        } else if name.contains("lag") || name.contains("queue_depth") {
            Self::LagLike
        } else if name.contains("latency") || name.contains("duration") {
            Self::LatencyLike
        } else if name.contains("request_rate") && name.contains("shipping") {
            Self::ThroughputLike
        } else {
            Self::Neutral
        }
    }

    /// Multiplier for a base metric value given degradation in [0, 1].
    fn modifier(self, degradation: f64) -> f64 {
        match self {
            // 1x climbing to 18x — a goroutine count of 47 reads 800+ by hour two.
            Self::LeakLike => 1.0 + degradation * 17.0,
            // 0.99 decaying to a 0.15 floor.
            Self::RatioLike => (1.0 - degradation * 0.85).max(0.15),
            // Exponential: 1x to ~100x.
            Self::LagLike => 100.0_f64.powf(degradation),
            Self::LatencyLike => 1.0 + degradation * 30.0,
            Self::ThroughputLike => (1.0 - degradation * 0.95).max(0.05),
            Self::Neutral => 1.0,
        }
    }
}

/// A record of one remediation attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryAttempt {
    pub action: String,
    pub at_minute: Minutes,
    pub at_tick: Tick,
}

pub struct IncidentClock {
    rng: PositionRng,
    minutes_per_tick: u64,
    ticks_elapsed: Tick,
    minutes_elapsed: Minutes,
    recovery_cooldown_remaining: Minutes,
    recovery_attempts: Vec<RecoveryAttempt>,
}

impl IncidentClock {
    /// `minutes_per_tick` bounds the random advance per tick (1..=bound).
    pub fn new(rng: PositionRng, minutes_per_tick: u64) -> Self {
        Self {
            rng,
            minutes_per_tick: minutes_per_tick.max(1),
            ticks_elapsed: 0,
            minutes_elapsed: 0,
            recovery_cooldown_remaining: 0,
            recovery_attempts: Vec::new(),
        }
    }

    /// Advance one tick. Returns the new minutes elapsed.
    pub fn tick(&mut self) -> Minutes {
        self.ticks_elapsed += 1;
        let advance = 1 + self.rng.below(self.minutes_per_tick);
        self.minutes_elapsed += advance;
        self.recovery_cooldown_remaining =
            self.recovery_cooldown_remaining.saturating_sub(advance);
        self.minutes_elapsed
    }

    pub fn ticks_elapsed(&self) -> Tick {
        self.ticks_elapsed
    }

    pub fn minutes_elapsed(&self) -> Minutes {
        self.minutes_elapsed
    }

    /// Record a remediation attempt and open the improvement window.
    pub fn trigger_recovery(&mut self, action: &str) -> RecoveryAttempt {
        let attempt = RecoveryAttempt {
            action: action.to_string(),
            at_minute: self.minutes_elapsed,
            at_tick: self.ticks_elapsed,
        };
        log::info!(
            "recovery attempt '{action}' at minute {}",
            self.minutes_elapsed
        );
        self.recovery_attempts.push(attempt.clone());
        self.recovery_cooldown_remaining = RECOVERY_WINDOW_MINUTES;
        attempt
    }

    pub fn in_recovery_window(&self) -> bool {
        self.recovery_cooldown_remaining > 0
    }

    pub fn recovery_cooldown_remaining(&self) -> Minutes {
        self.recovery_cooldown_remaining
    }

    pub fn recovery_attempts(&self) -> &[RecoveryAttempt] {
        &self.recovery_attempts
    }

    /// Degradation factor in [0, 1]: how far into the incident we are,
    /// relieved during a recovery window.
    pub fn degradation(&self) -> f64 {
        let base = (self.minutes_elapsed as f64 / DEGRADATION_HORIZON_MINUTES).min(1.0);
        if self.in_recovery_window() {
            base * RECOVERY_RELIEF_FACTOR
        } else {
            base
        }
    }

    /// Value multiplier for `metric_name` at the current simulated time.
    pub fn severity_modifier(&self, metric_name: &str) -> f64 {
        MetricShape::classify(metric_name).modifier(self.degradation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> IncidentClock {
        IncidentClock::new(PositionRng::stream(42, 1), 2)
    }

    #[test]
    fn minutes_are_monotonic_and_bounded() {
        let mut clock = clock();
        let mut previous = 0;
        for _ in 0..200 {
            let minutes = clock.tick();
            assert!(minutes > previous);
            assert!(minutes - previous <= 2);
            previous = minutes;
        }
        assert_eq!(clock.ticks_elapsed(), 200);
    }

    #[test]
    fn recovery_window_opens_and_decays() {
        let mut clock = clock();
        for _ in 0..10 {
            clock.tick();
        }
        assert!(!clock.in_recovery_window());

        clock.trigger_recovery("restart_checkout");
        assert!(clock.in_recovery_window());
        assert_eq!(clock.recovery_cooldown_remaining(), RECOVERY_WINDOW_MINUTES);

        // Window decays with simulated minutes, not ticks.
        for _ in 0..RECOVERY_WINDOW_MINUTES {
            clock.tick();
        }
        assert!(!clock.in_recovery_window());
        assert_eq!(clock.recovery_attempts().len(), 1);
    }

    #[test]
    fn shapes_diverge_per_metric_class() {
        let mut clock = clock();
        for _ in 0..120 {
            clock.tick(); // well past the horizon
        }
        assert!(clock.severity_modifier("goroutine_count") > 10.0);
        assert!(clock.severity_modifier("checkout_success_rate") <= 0.2);
        assert!(clock.severity_modifier("kafka_consumer_lag") > 50.0);
        assert!((clock.severity_modifier("unrelated_gauge") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recovery_relieves_then_redegrades() {
        let mut clock = clock();
        for _ in 0..60 {
            clock.tick();
        }
        let degraded = clock.severity_modifier("goroutine_count");
        clock.trigger_recovery("restart_checkout");
        let relieved = clock.severity_modifier("goroutine_count");
        assert!(relieved < degraded, "recovery window must relieve severity");

        for _ in 0..RECOVERY_WINDOW_MINUTES {
            clock.tick();
        }
        let after = clock.severity_modifier("goroutine_count");
        assert!(after >= degraded, "severity must re-degrade after the window");
    }
}
