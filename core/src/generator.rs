//! Generator contract and per-source configuration.
//!
//! RULE: generate() must be a pure function of (config, position, rng),
//! where rng itself derives from (base_seed, discriminant, position).
//! Generators own no mutable state — determinism is defined relative to
//! position, not call order.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    entry::Entry,
    rng::PositionRng,
    types::Position,
};

/// Immutable noise-generation parameters for one data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// The session's master seed.
    pub base_seed: u64,
    /// Stable per-source discriminant (see rng::source_discriminant).
    pub discriminant: u64,
    /// Corpus size N. Fixed at configuration time.
    pub total: usize,
    /// Start of the simulated time window.
    pub window_start: DateTime<Utc>,
    /// Width of the simulated time window.
    pub window_hours: u32,
}

impl GeneratorConfig {
    pub fn new(base_seed: u64, discriminant: u64, total: usize) -> Self {
        Self {
            base_seed,
            discriminant,
            total,
            // Fixed default window: one week ending at a pinned instant.
            // A wall-clock default would break cross-run reproducibility.
            window_start: Utc.with_ymd_and_hms(2025, 10, 27, 0, 0, 0).unwrap(),
            window_hours: 168,
        }
    }

    pub fn with_window(mut self, start: DateTime<Utc>, hours: u32) -> Self {
        self.window_start = start;
        self.window_hours = hours;
        self
    }

    /// Fresh RNG for one position of this source.
    pub fn rng_at(&self, position: Position) -> PositionRng {
        PositionRng::at(self.base_seed, self.discriminant, position as u64)
    }

    /// Base timestamp for a position: paging forward through positions is
    /// paging forward in simulated time. Jitter is added by the caller so
    /// each generator controls its own spread.
    pub fn base_time(&self, position: Position) -> DateTime<Utc> {
        let total = self.total.max(1) as f64;
        let hours = (position as f64 / total) * f64::from(self.window_hours);
        self.window_start + Duration::seconds((hours * 3600.0) as i64)
    }
}

/// One synthetic-entry factory per data-source flavor.
pub trait EntryGenerator: Send + Sync {
    /// Produce the entry at `position`. `rng` is already position-derived;
    /// implementations draw from it in a fixed order so the whole entry is
    /// deterministic as a unit.
    fn generate(&self, config: &GeneratorConfig, position: Position, rng: &mut PositionRng)
        -> Entry;
}
