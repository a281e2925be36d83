//! One incident session — the engine behind the tool surface.
//!
//! EXECUTION ORDER per inbound request (fixed, documented, never reordered):
//!   1. Pending conversation replies tick down; matured ones are delivered.
//!   2. The incident clock advances one tick.
//!   3. Newly-due scripted timeline events are injected into conversation.
//!   4. The request resolves against the relevant corpus, with the clock's
//!      severity modifier applied to numeric metric results.
//!
//! RULES:
//!   - One session per evaluated agent. Sessions share nothing mutable;
//!     determinism is defined relative to (seed, position), never call
//!     order across sessions.
//!   - Runtime misses (unknown channel, bad cursor) are values, not errors.
//!     Only start-up validation may fail.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{
    chat_noise::ChatNoiseGenerator,
    config::SimConfig,
    conversation::{default_responder_profiles, PostOutcome, ReactiveConversation},
    corpus::{EntryFilter, Page, PaginatedCorpus},
    entry::{ChatMessage, Entry, ErrorIssue, MetricPoint},
    error::SimResult,
    evidence::EvidenceCorpus,
    generator::GeneratorConfig,
    incident_clock::IncidentClock,
    issue_noise::IssueNoiseGenerator,
    log_noise::LogNoiseGenerator,
    metric_noise::MetricNoiseGenerator,
    rng::{source_discriminant, PositionRng},
    timeline::{default_recovery_playbook, ScriptedTimeline},
    types::{Minutes, Position},
};

/// How many trailing samples a metric query returns as history.
const METRIC_HISTORY_POINTS: usize = 12;

/// Issue listings are capped; the corpus behind them is not materialized.
const ISSUE_LIST_LIMIT: usize = 50;

// Stateful per-session RNG stream discriminants. Distinct from any
// source discriminant because no data source is named these.
const CLOCK_STREAM: &str = "incident-clock";
const FALLBACK_STREAM: &str = "fallback-pool";

// ── Result types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub entry_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatMessages {
    Ok {
        channel: String,
        messages: Vec<Entry>,
        total: usize,
        next_cursor: Option<Position>,
        has_more: bool,
        /// Delivered conversation for this channel, appended after the
        /// corpus page so agent posts and replies surface in normal reads.
        conversation: Vec<ChatMessage>,
    },
    NotFound {
        requested: String,
        known: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PostResult {
    Posted {
        ok: bool,
        #[serde(flatten)]
        outcome: PostOutcome,
        /// Set when the message matched a recovery-playbook action.
        #[serde(skip_serializing_if = "Option::is_none")]
        recovery_action: Option<String>,
    },
    NotFound {
        requested: String,
        known: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogEntries {
    Ok {
        service: String,
        entries: Vec<Entry>,
        total: usize,
        next_cursor: Option<Position>,
        has_more: bool,
        filtered: bool,
    },
    NotFound {
        requested: String,
        known: Vec<String>,
    },
}

/// Optional filters for a log page.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub level: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub grep: Option<String>,
}

impl LogQuery {
    fn to_filter(&self) -> EntryFilter {
        let mut filter = EntryFilter::new();
        if let Some(level) = &self.level {
            filter = filter.with("level", level.clone());
        }
        if let Some(grep) = &self.grep {
            filter = filter.grep(grep.clone());
        }
        if let Some(since) = self.since {
            filter = filter.since(since);
        }
        filter
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
    pub metric: String,
    pub current: f64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricReading {
    Ok {
        metric: String,
        current: f64,
        timestamp: DateTime<Utc>,
        history: Vec<MetricPoint>,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        minutes_elapsed: Minutes,
        recovering: bool,
    },
    /// No exact match; metrics whose names contain any query term.
    Matches {
        query: String,
        matches: Vec<MetricSummary>,
        total: usize,
    },
    Unknown {
        query: String,
        available: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IssueList {
    Ok {
        issues: Vec<ErrorIssue>,
        total: usize,
    },
    NotFound {
        requested: String,
        known: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IssueLookup {
    Ok { issue: ErrorIssue },
    NotFound { id: String },
}

// ── Internal source wiring ───────────────────────────────────────────────────

struct MetricFamily {
    name: String,
    base_current: f64,
    note: Option<String>,
    corpus: PaginatedCorpus,
}

struct IssueProject {
    name: String,
    corpus: PaginatedCorpus,
}

// ── The session ──────────────────────────────────────────────────────────────

pub struct IncidentSession {
    config: SimConfig,
    clock: IncidentClock,
    timeline: ScriptedTimeline,
    conversation: ReactiveConversation,
    chat: BTreeMap<String, PaginatedCorpus>,
    logs: BTreeMap<String, PaginatedCorpus>,
    metrics: Vec<MetricFamily>,
    issues: Vec<IssueProject>,
    incident_start: DateTime<Utc>,
}

impl IncidentSession {
    /// Wire a full session from config plus the hand-authored evidence.
    /// Fails loudly on broken evidence before any request is served.
    pub fn new(config: SimConfig, evidence: EvidenceCorpus) -> SimResult<Self> {
        evidence.validate()?;

        let generator_config = |kind: &str, name: &str| {
            GeneratorConfig::new(
                config.seed,
                source_discriminant(kind, name),
                config.entries_per_source,
            )
            .with_window(config.window_start, config.window_hours)
        };

        let mut chat = BTreeMap::new();
        for channel in &evidence.channels {
            let signals: Vec<Entry> = channel
                .messages
                .iter()
                .cloned()
                .map(Entry::Chat)
                .collect();
            let positions = config.positions_for(&channel.name, signals.len());
            chat.insert(
                channel.name.clone(),
                PaginatedCorpus::new(
                    &channel.name,
                    generator_config("chat", &channel.name),
                    Box::new(ChatNoiseGenerator),
                    signals,
                    &positions,
                )?,
            );
        }

        let mut logs = BTreeMap::new();
        for service in &evidence.services {
            let signals: Vec<Entry> =
                service.entries.iter().cloned().map(Entry::Log).collect();
            let positions = config.positions_for(&service.name, signals.len());
            logs.insert(
                service.name.clone(),
                PaginatedCorpus::new(
                    &service.name,
                    generator_config("logs", &service.name),
                    Box::new(LogNoiseGenerator::new(&service.name, service.language)),
                    signals,
                    &positions,
                )?,
            );
        }

        let mut metrics = Vec::new();
        for family in &evidence.metrics {
            let signals: Vec<Entry> = family
                .signal_points
                .iter()
                .cloned()
                .map(Entry::Metric)
                .collect();
            let positions = config.positions_for(&family.metric, signals.len());
            metrics.push(MetricFamily {
                name: family.metric.clone(),
                base_current: family.current.unwrap_or(family.base_value),
                note: family.note.clone(),
                corpus: PaginatedCorpus::new(
                    &family.metric,
                    generator_config("metrics", &family.metric),
                    Box::new(MetricNoiseGenerator::new(
                        &family.metric,
                        family.base_value,
                        family.noise_pct,
                    )),
                    signals,
                    &positions,
                )?,
            });
        }

        let mut issues = Vec::new();
        for project in &evidence.projects {
            let signals: Vec<Entry> =
                project.issues.iter().cloned().map(Entry::Issue).collect();
            let positions = config.positions_for(&project.name, signals.len());
            issues.push(IssueProject {
                name: project.name.clone(),
                corpus: PaginatedCorpus::new(
                    &project.name,
                    generator_config("issues", &project.name),
                    Box::new(IssueNoiseGenerator::new(&project.name, project.language)),
                    signals,
                    &positions,
                )?,
            });
        }

        let clock = IncidentClock::new(
            PositionRng::stream(config.seed, source_discriminant("stream", CLOCK_STREAM)),
            config.minutes_per_tick,
        );
        let timeline = ScriptedTimeline::new(
            evidence.timeline.clone(),
            evidence
                .recovery_playbook
                .clone()
                .unwrap_or_else(default_recovery_playbook),
        );
        let conversation = ReactiveConversation::new(
            evidence.trigger_rules.clone(),
            evidence
                .responder_profiles
                .clone()
                .unwrap_or_else(default_responder_profiles),
            evidence.fallback_responder.clone(),
            PositionRng::stream(config.seed, source_discriminant("stream", FALLBACK_STREAM)),
        );

        let incident_start = config.incident_start();
        log::info!(
            "session wired: {} channels, {} services, {} metrics, {} projects, seed {}",
            chat.len(),
            logs.len(),
            metrics.len(),
            issues.len(),
            config.seed
        );

        Ok(Self {
            config,
            clock,
            timeline,
            conversation,
            chat,
            logs,
            metrics,
            issues,
            incident_start,
        })
    }

    /// Simulated "now": incident start plus elapsed minutes.
    pub fn sim_now(&self) -> DateTime<Utc> {
        self.incident_start + Duration::minutes(self.clock.minutes_elapsed() as i64)
    }

    pub fn clock(&self) -> &IncidentClock {
        &self.clock
    }

    pub fn conversation_history(&self) -> &[ChatMessage] {
        self.conversation.history()
    }

    /// Steps 1-3 of the per-request execution order.
    fn begin_request(&mut self) {
        self.conversation.advance_pending();
        let minutes = self.clock.tick();
        let now = self.sim_now();
        for event in self.timeline.due_events(minutes) {
            self.conversation.append(ChatMessage {
                user: event.speaker,
                text: event.text,
                timestamp: now,
                channel: Some(event.channel),
            });
        }
    }

    // ── Chat ─────────────────────────────────────────────────────────────

    pub fn list_channels(&mut self) -> Vec<SourceInfo> {
        self.begin_request();
        self.chat
            .iter()
            .map(|(name, corpus)| SourceInfo {
                name: name.clone(),
                entry_count: corpus.total(),
            })
            .collect()
    }

    pub fn get_messages(&mut self, channel: &str, cursor: Position, limit: usize) -> ChatMessages {
        self.begin_request();
        let channel = channel.trim_start_matches('#');
        match self.chat.get(channel) {
            Some(corpus) => {
                let page = corpus.page(cursor, limit, &EntryFilter::new());
                ChatMessages::Ok {
                    channel: channel.to_string(),
                    messages: page.entries,
                    total: page.total,
                    next_cursor: page.next_cursor,
                    has_more: page.has_more,
                    conversation: self.conversation.history_for(channel),
                }
            }
            None => ChatMessages::NotFound {
                requested: channel.to_string(),
                known: self.chat.keys().cloned().collect(),
            },
        }
    }

    pub fn search_chat(&mut self, query: &str, limit: usize) -> Vec<Entry> {
        self.begin_request();
        let mut results = Vec::new();
        for (name, corpus) in &self.chat {
            for entry in corpus.search(query, limit) {
                results.push(match entry {
                    Entry::Chat(mut message) => {
                        message.channel = Some(name.clone());
                        Entry::Chat(message)
                    }
                    other => other,
                });
                if results.len() >= limit {
                    return results;
                }
            }
        }
        results
    }

    pub fn post_message(&mut self, channel: &str, text: &str) -> PostResult {
        self.begin_request();
        let channel = channel.trim_start_matches('#');
        if !self.chat.contains_key(channel) {
            return PostResult::NotFound {
                requested: channel.to_string(),
                known: self.chat.keys().cloned().collect(),
            };
        }

        // Remediation attempts open the recovery window and schedule their
        // own regression relative to now.
        let recovery_action = match self.timeline.match_recovery(text).cloned() {
            Some(rule) => {
                self.clock.trigger_recovery(&rule.action);
                let now = self.sim_now();
                self.conversation.append(ChatMessage {
                    user: rule.immediate.speaker.clone(),
                    text: rule.immediate.text.clone(),
                    timestamp: now,
                    channel: Some(channel.to_string()),
                });
                self.timeline
                    .schedule_regression(&rule, self.clock.minutes_elapsed(), channel);
                Some(rule.action)
            }
            None => None,
        };

        let now = self.sim_now();
        let outcome = self.conversation.post(channel, text, now);
        PostResult::Posted {
            ok: true,
            outcome,
            recovery_action,
        }
    }

    // ── Logs ─────────────────────────────────────────────────────────────

    pub fn list_services(&mut self) -> Vec<SourceInfo> {
        self.begin_request();
        self.logs
            .iter()
            .map(|(name, corpus)| SourceInfo {
                name: name.clone(),
                entry_count: corpus.total(),
            })
            .collect()
    }

    pub fn get_logs(
        &mut self,
        service: &str,
        cursor: Position,
        limit: usize,
        query: &LogQuery,
    ) -> LogEntries {
        self.begin_request();
        match self.logs.get(service) {
            Some(corpus) => {
                let filter = query.to_filter();
                let filtered = !filter.is_empty();
                let page: Page = corpus.page(cursor, limit, &filter);
                LogEntries::Ok {
                    service: service.to_string(),
                    entries: page.entries,
                    total: page.total,
                    next_cursor: page.next_cursor,
                    has_more: page.has_more,
                    filtered,
                }
            }
            None => LogEntries::NotFound {
                requested: service.to_string(),
                known: self.logs.keys().cloned().collect(),
            },
        }
    }

    pub fn search_logs(&mut self, query: &str, limit: usize) -> Vec<Entry> {
        self.begin_request();
        let mut results = Vec::new();
        for corpus in self.logs.values() {
            for entry in corpus.search(query, limit) {
                results.push(entry);
                if results.len() >= limit {
                    return results;
                }
            }
        }
        results
    }

    // ── Metrics ──────────────────────────────────────────────────────────

    pub fn query_metric(&mut self, query: &str) -> MetricReading {
        self.begin_request();
        let query_lower = query.to_lowercase();

        if let Some(family) = self
            .metrics
            .iter()
            .find(|f| f.name.to_lowercase() == query_lower)
        {
            let modifier = self.clock.severity_modifier(&family.name);
            let current = round3(family.base_current * modifier);
            let history = self.metric_history(family);
            return MetricReading::Ok {
                metric: family.name.clone(),
                current,
                timestamp: self.sim_now(),
                history,
                note: family.note.clone(),
                minutes_elapsed: self.clock.minutes_elapsed(),
                recovering: self.clock.in_recovery_window(),
            };
        }

        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        let matches: Vec<MetricSummary> = self
            .metrics
            .iter()
            .filter(|f| {
                let name = f.name.to_lowercase();
                terms.iter().any(|t| name.contains(t))
            })
            .map(|f| MetricSummary {
                metric: f.name.clone(),
                current: round3(f.base_current * self.clock.severity_modifier(&f.name)),
            })
            .collect();

        if matches.is_empty() {
            MetricReading::Unknown {
                query: query.to_string(),
                available: self.metrics.iter().map(|f| f.name.clone()).collect(),
            }
        } else {
            let total = matches.len();
            MetricReading::Matches {
                query: query.to_string(),
                matches,
                total,
            }
        }
    }

    fn metric_history(&self, family: &MetricFamily) -> Vec<MetricPoint> {
        let total = family.corpus.total();
        let start = total.saturating_sub(METRIC_HISTORY_POINTS);
        (start..total)
            .filter_map(|p| family.corpus.get(p))
            .filter_map(|entry| match entry {
                Entry::Metric(point) => Some(point),
                _ => None,
            })
            .collect()
    }

    // ── Error issues ─────────────────────────────────────────────────────

    pub fn list_projects(&mut self) -> Vec<SourceInfo> {
        self.begin_request();
        self.issues
            .iter()
            .map(|p| SourceInfo {
                name: p.name.clone(),
                entry_count: p.corpus.total(),
            })
            .collect()
    }

    /// Issues for one project (or all). Signals first, then generated
    /// noise from the head of each corpus, capped — the corpus itself is
    /// never materialized.
    pub fn list_issues(&mut self, project: Option<&str>) -> IssueList {
        self.begin_request();
        let selected: Vec<&IssueProject> = match project {
            Some(name) => {
                let Some(p) = self.issues.iter().find(|p| p.name == name) else {
                    return IssueList::NotFound {
                        requested: name.to_string(),
                        known: self.issues.iter().map(|p| p.name.clone()).collect(),
                    };
                };
                vec![p]
            }
            None => self.issues.iter().collect(),
        };

        let total = selected.iter().map(|p| p.corpus.total()).sum();
        let mut issues = Vec::new();
        'outer: for p in &selected {
            let signal_positions: Vec<Position> =
                p.corpus.signals().map(|(&pos, _)| pos).collect();
            for (_, entry) in p.corpus.signals() {
                if let Entry::Issue(issue) = entry {
                    issues.push(issue.clone());
                    if issues.len() >= ISSUE_LIST_LIMIT {
                        break 'outer;
                    }
                }
            }
            for pos in 0..p.corpus.total() {
                if signal_positions.contains(&pos) {
                    continue;
                }
                if let Some(Entry::Issue(issue)) = p.corpus.get(pos) {
                    issues.push(issue);
                    if issues.len() >= ISSUE_LIST_LIMIT {
                        break 'outer;
                    }
                }
                if pos >= ISSUE_LIST_LIMIT {
                    break;
                }
            }
        }
        IssueList::Ok { issues, total }
    }

    /// Authored signal ids are checked first; generated ids encode their
    /// position, so neither path scans the corpus.
    pub fn get_issue(&mut self, id: &str) -> IssueLookup {
        self.begin_request();
        for project in &self.issues {
            for (_, entry) in project.corpus.signals() {
                if let Entry::Issue(issue) = entry {
                    if issue.id == id {
                        return IssueLookup::Ok {
                            issue: issue.clone(),
                        };
                    }
                }
            }
        }
        for project in &self.issues {
            if let Some(position) = IssueNoiseGenerator::position_for(&project.name, id) {
                if let Some(Entry::Issue(issue)) = project.corpus.get(position) {
                    // The decoded position may be pinned by an authored
                    // signal with its own id; that id is not this one.
                    if issue.id == id {
                        return IssueLookup::Ok { issue };
                    }
                }
            }
        }
        IssueLookup::NotFound { id: id.to_string() }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
