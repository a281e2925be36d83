//! haystack-core — deterministic evidence simulation for incident drills.
//!
//! An agent under evaluation sees what looks like a live observability
//! surface: team chat, service logs, metric dashboards, an error tracker.
//! Underneath, every data source is a seeded corpus of N addressable
//! entries — a handful of hand-authored signal entries pinned among
//! lazily generated noise. Nothing is pre-materialized; entry `p` of any
//! source is a pure function of (seed, source, p), so two sessions with
//! the same seed and evidence see byte-identical worlds regardless of
//! what order they query in.
//!
//! On top of the corpora sits the live layer: a reactive conversation
//! that answers agent posts in coworker personas, an incident clock that
//! degrades metrics as simulated minutes pass, and a scripted timeline
//! that injects events at fixed minute marks.

pub mod chat_noise;
pub mod config;
pub mod conversation;
pub mod corpus;
pub mod entry;
pub mod error;
pub mod evidence;
pub mod generator;
pub mod incident_clock;
pub mod issue_noise;
pub mod log_noise;
pub mod metric_noise;
pub mod rate_limiter;
pub mod rng;
pub mod session;
pub mod timeline;
pub mod types;

pub use config::SimConfig;
pub use entry::{ChatMessage, Entry, ErrorIssue, LogLine, MetricPoint};
pub use error::{SimError, SimResult};
pub use evidence::EvidenceCorpus;
pub use session::IncidentSession;
