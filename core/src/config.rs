//! Session configuration — volume, time window, and signal placement.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Position;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Master seed. Every per-source RNG stream derives from it.
    pub seed: u64,
    /// Corpus size N per data source.
    #[serde(default = "default_entries_per_source")]
    pub entries_per_source: usize,
    /// Start of the simulated noise window. Fixed so that runs reproduce.
    #[serde(default = "default_window_start")]
    pub window_start: DateTime<Utc>,
    /// Width of the noise window in hours; the incident begins at its end.
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
    /// Upper bound on the random minute advance per tick.
    #[serde(default = "default_minutes_per_tick")]
    pub minutes_per_tick: u64,
    /// Source name → ordered signal positions. Sources not listed pin their
    /// signals at the head of the corpus.
    #[serde(default)]
    pub signal_positions: HashMap<String, Vec<Position>>,
}

fn default_entries_per_source() -> usize {
    5000
}

fn default_window_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 27, 0, 0, 0).unwrap()
}

fn default_window_hours() -> u32 {
    168 // one week of data
}

fn default_minutes_per_tick() -> u64 {
    2
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            entries_per_source: default_entries_per_source(),
            window_start: default_window_start(),
            window_hours: default_window_hours(),
            minutes_per_tick: default_minutes_per_tick(),
            signal_positions: HashMap::new(),
        }
    }
}

impl SimConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Signal positions for `source`, defaulting to the corpus head when
    /// none were assigned.
    pub fn positions_for(&self, source: &str, signal_count: usize) -> Vec<Position> {
        match self.signal_positions.get(source) {
            Some(positions) => positions.clone(),
            None => (0..signal_count).collect(),
        }
    }

    /// The instant the incident starts: the end of the noise window.
    pub fn incident_start(&self) -> DateTime<Utc> {
        self.window_start + chrono::Duration::hours(i64::from(self.window_hours))
    }
}
