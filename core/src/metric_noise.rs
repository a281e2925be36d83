//! Time-series noise generation.
//!
//! Samples follow a realistic 24-hour traffic curve plus gaussian noise, so
//! a metric's history looks like production traffic rather than white noise.

use crate::{
    chat_noise::SERVICES,
    entry::{Entry, MetricLabels, MetricPoint},
    generator::{EntryGenerator, GeneratorConfig},
    rng::PositionRng,
    types::Position,
};

/// Normalized daily traffic curve, one factor per hour of day.
const DAILY_CURVE: [f64; 24] = [
    0.20, 0.15, 0.10, 0.10, 0.15, 0.30, // 00-05 (night)
    0.50, 0.70, 0.85, 0.95, 1.00, 0.95, // 06-11 (morning peak)
    0.85, 0.90, 1.00, 0.95, 0.85, 0.80, // 12-17 (afternoon peak)
    0.70, 0.75, 0.80, 0.60, 0.40, 0.30, // 18-23 (evening)
];

pub struct MetricNoiseGenerator {
    metric_name: String,
    base_value: f64,
    noise_pct: f64,
}

impl MetricNoiseGenerator {
    pub fn new(metric_name: impl Into<String>, base_value: f64, noise_pct: f64) -> Self {
        Self {
            metric_name: metric_name.into(),
            base_value,
            noise_pct,
        }
    }
}

impl EntryGenerator for MetricNoiseGenerator {
    fn generate(
        &self,
        config: &GeneratorConfig,
        position: Position,
        rng: &mut PositionRng,
    ) -> Entry {
        use chrono::Timelike;

        let timestamp = config.base_time(position);
        let daily_factor = DAILY_CURVE[timestamp.hour() as usize];
        let noise = rng.gauss(0.0, self.base_value * self.noise_pct);
        let value = (self.base_value * daily_factor + noise).max(0.0);

        Entry::Metric(MetricPoint {
            metric: self.metric_name.clone(),
            timestamp,
            value: (value * 1000.0).round() / 1000.0,
            labels: MetricLabels {
                service: rng.pick(SERVICES).to_string(),
                instance: format!("pod-{}", rng.below(5) + 1),
            },
        })
    }
}
