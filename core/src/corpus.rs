//! Paginated corpus: one addressable stream of N entries.
//!
//! RULE: entries are never pre-materialized. A corpus is a sparse signal
//! map over a lazy generator — `get(p)` answers from the signal map first
//! and falls back to generating from (seed, p). For any position the
//! answer is referentially stable no matter the access order, cursor, or
//! number of prior queries.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    entry::Entry,
    error::{SimError, SimResult},
    generator::{EntryGenerator, GeneratorConfig},
    types::Position,
};

/// Filtered scans stop after `limit * SCAN_CEILING_FACTOR` positions so a
/// filter with sparse (or zero) matches still terminates in one request.
const SCAN_CEILING_FACTOR: usize = 100;

/// Search scans generated entries up to `limit * SEARCH_CEILING_FACTOR`
/// positions after the signal map has been checked.
const SEARCH_CEILING_FACTOR: usize = 200;

/// Result of a paginated query.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub entries: Vec<Entry>,
    pub total: usize,
    pub next_cursor: Option<Position>,
    pub has_more: bool,
}

impl Page {
    fn empty(total: usize) -> Self {
        Self {
            entries: Vec::new(),
            total,
            next_cursor: None,
            has_more: false,
        }
    }
}

/// Filter predicate applied during slow-path pagination.
///
/// Clauses with field keys no entry flavor knows are silently ignored — an
/// agent sending a filter we don't support gets unfiltered semantics for
/// that clause rather than a rejection.
#[derive(Debug, Clone)]
enum Clause {
    /// Case-insensitive containment against one named field.
    FieldContains { field: String, needle: String },
    /// Case-insensitive containment against any text field (grep).
    AnyTextContains { needle: String },
    /// Entries at or after a timestamp.
    Since(chrono::DateTime<chrono::Utc>),
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    clauses: Vec<Clause>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, contains: impl Into<String>) -> Self {
        let (field, contains) = (field.into(), contains.into());
        if !contains.is_empty() {
            self.clauses.push(Clause::FieldContains {
                field,
                needle: contains.to_lowercase(),
            });
        }
        self
    }

    pub fn grep(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        if !needle.is_empty() {
            self.clauses.push(Clause::AnyTextContains {
                needle: needle.to_lowercase(),
            });
        }
        self
    }

    pub fn since(mut self, instant: chrono::DateTime<chrono::Utc>) -> Self {
        self.clauses.push(Clause::Since(instant));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::FieldContains { field, needle } => match entry.field(field) {
                Some(value) => value.to_lowercase().contains(needle),
                // Unknown field: clause ignored.
                None => true,
            },
            Clause::AnyTextContains { needle } => entry.matches_text(needle),
            Clause::Since(instant) => entry.timestamp() >= *instant,
        })
    }
}

/// A generator plus a sparse map of pinned signal entries.
pub struct PaginatedCorpus {
    config: GeneratorConfig,
    generator: Box<dyn EntryGenerator>,
    signal_map: BTreeMap<Position, Entry>,
}

impl std::fmt::Debug for PaginatedCorpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedCorpus")
            .field("config", &self.config)
            .field("signal_map", &self.signal_map)
            .finish_non_exhaustive()
    }
}

impl PaginatedCorpus {
    /// Build a corpus, pinning `signals[i]` at `positions[i]`.
    ///
    /// Fails loudly on a broken evidence definition: more positions than
    /// supplied signals, or a position outside `[0, total)`. These are the
    /// only fatal conditions in the engine — everything after start-up is
    /// recoverable by the agent.
    pub fn new(
        source: &str,
        config: GeneratorConfig,
        generator: Box<dyn EntryGenerator>,
        signals: Vec<Entry>,
        positions: &[Position],
    ) -> SimResult<Self> {
        if config.total == 0 {
            return Err(SimError::Config(format!("source '{source}' has corpus size 0")));
        }
        if positions.len() > signals.len() {
            return Err(SimError::SignalCountMismatch {
                source_name: source.to_string(),
                assigned: positions.len(),
                supplied: signals.len(),
            });
        }
        let mut signal_map = BTreeMap::new();
        for (entry, &position) in signals.into_iter().zip(positions.iter()) {
            if position >= config.total {
                return Err(SimError::SignalPositionOutOfRange {
                    source_name: source.to_string(),
                    position,
                    total: config.total,
                });
            }
            signal_map.insert(position, entry);
        }
        log::debug!(
            "corpus '{source}': {} entries, {} signals pinned",
            config.total,
            signal_map.len()
        );
        Ok(Self {
            config,
            generator,
            signal_map,
        })
    }

    pub fn total(&self) -> usize {
        self.config.total
    }

    /// Entry at `position` — pinned signal if one exists, generated noise
    /// otherwise. None past the end of the corpus.
    pub fn get(&self, position: Position) -> Option<Entry> {
        if position >= self.config.total {
            return None;
        }
        if let Some(signal) = self.signal_map.get(&position) {
            return Some(signal.clone());
        }
        let mut rng = self.config.rng_at(position);
        Some(self.generator.generate(&self.config, position, &mut rng))
    }

    /// Cursor pagination.
    ///
    /// Unfiltered: O(limit), returns `[cursor, cursor+limit)`.
    /// Filtered: scans forward from `cursor` until `limit` matches or the
    /// scan ceiling, and the returned cursor points past the last *scanned*
    /// position so resuming never re-scans skipped ranges.
    /// An out-of-range cursor yields an empty page, never an error.
    pub fn page(&self, cursor: Position, limit: usize, filter: &EntryFilter) -> Page {
        let total = self.config.total;
        if cursor >= total || limit == 0 {
            return Page::empty(total);
        }

        if filter.is_empty() {
            let end = (cursor + limit).min(total);
            let entries: Vec<Entry> = (cursor..end).filter_map(|p| self.get(p)).collect();
            let has_more = end < total;
            return Page {
                entries,
                total,
                next_cursor: has_more.then_some(end),
                has_more,
            };
        }

        let ceiling = limit.saturating_mul(SCAN_CEILING_FACTOR);
        let scan_end = cursor.saturating_add(ceiling).min(total);
        let mut entries = Vec::new();
        let mut pos = cursor;
        while pos < scan_end && entries.len() < limit {
            if let Some(entry) = self.get(pos) {
                if filter.matches(&entry) {
                    entries.push(entry);
                }
            }
            pos += 1;
        }
        let has_more = pos < total;
        Page {
            entries,
            total,
            next_cursor: has_more.then_some(pos),
            has_more,
        }
    }

    /// Bounded full-text search. Signal entries are checked first — cheap,
    /// bounded by the signal map — so hand-authored evidence is never
    /// starved by noise. Generated entries are then scanned up to a bounded
    /// multiple of `limit`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Entry> {
        let query = query.to_lowercase();
        let mut results = Vec::new();

        for entry in self.signal_map.values() {
            if entry.matches_text(&query) {
                results.push(entry.clone());
                if results.len() >= limit {
                    return results;
                }
            }
        }

        let scan_end = limit
            .saturating_mul(SEARCH_CEILING_FACTOR)
            .min(self.config.total);
        for pos in 0..scan_end {
            if self.signal_map.contains_key(&pos) {
                continue; // already checked
            }
            if let Some(entry) = self.get(pos) {
                if entry.matches_text(&query) {
                    results.push(entry);
                    if results.len() >= limit {
                        break;
                    }
                }
            }
        }
        results
    }

    /// Pinned signal entries in position order. Used by the issue source
    /// for authored-id lookups.
    pub fn signals(&self) -> impl Iterator<Item = (&Position, &Entry)> {
        self.signal_map.iter()
    }
}
