//! The unit of synthetic evidence.
//!
//! An Entry is immutable once produced. Signal entries are deserialized from
//! the evidence corpus at start-up; noise entries are built by the
//! generators. Both flow through the same pagination and search paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat message (authored signal, generated noise, or conversation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

/// One application log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub function: String,
    pub service: String,
}

/// One time-series sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub metric: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub labels: MetricLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricLabels {
    pub service: String,
    pub instance: String,
}

/// One error-tracker issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorIssue {
    pub id: String,
    pub title: String,
    pub count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub level: String,
    pub project: String,
    pub tags: IssueTags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueTags {
    pub environment: String,
    pub runtime: String,
}

/// One unit of evidence, of whichever flavor its corpus produces.
///
/// Untagged so that a page of log lines serializes as plain log objects,
/// not wrapped variants. Variant order matters for deserialization: the
/// field sets are disjoint enough that the most specific shapes go first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Issue(ErrorIssue),
    Metric(MetricPoint),
    Log(LogLine),
    Chat(ChatMessage),
}

impl Entry {
    /// Look up a named field as text. Unknown names return None, which is
    /// how unsupported filter keys end up silently ignored.
    pub fn field(&self, name: &str) -> Option<String> {
        match self {
            Entry::Chat(m) => match name {
                "user" => Some(m.user.clone()),
                "text" => Some(m.text.clone()),
                "timestamp" => Some(m.timestamp.to_rfc3339()),
                "channel" => m.channel.clone(),
                _ => None,
            },
            Entry::Log(l) => match name {
                "timestamp" => Some(l.timestamp.to_rfc3339()),
                "level" => Some(l.level.clone()),
                "message" => Some(l.message.clone()),
                "function" => Some(l.function.clone()),
                "service" => Some(l.service.clone()),
                _ => None,
            },
            Entry::Metric(p) => match name {
                "metric" => Some(p.metric.clone()),
                "timestamp" => Some(p.timestamp.to_rfc3339()),
                "value" => Some(p.value.to_string()),
                "service" => Some(p.labels.service.clone()),
                "instance" => Some(p.labels.instance.clone()),
                _ => None,
            },
            Entry::Issue(i) => match name {
                "id" => Some(i.id.clone()),
                "title" => Some(i.title.clone()),
                "level" => Some(i.level.clone()),
                "project" => Some(i.project.clone()),
                "environment" => Some(i.tags.environment.clone()),
                "runtime" => Some(i.tags.runtime.clone()),
                _ => None,
            },
        }
    }

    /// The primary timestamp of the entry.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Entry::Chat(m) => m.timestamp,
            Entry::Log(l) => l.timestamp,
            Entry::Metric(p) => p.timestamp,
            Entry::Issue(i) => i.last_seen,
        }
    }

    /// Case-insensitive containment over every text field.
    /// `query` must already be lowercased.
    pub fn matches_text(&self, query: &str) -> bool {
        let haystacks: &[&str] = match self {
            Entry::Chat(m) => &[&m.user, &m.text],
            Entry::Log(l) => &[&l.level, &l.message, &l.function, &l.service],
            Entry::Metric(p) => &[&p.metric, &p.labels.service],
            Entry::Issue(i) => &[&i.id, &i.title, &i.level, &i.project],
        };
        haystacks
            .iter()
            .any(|h| h.to_lowercase().contains(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_log() -> Entry {
        Entry::Log(LogLine {
            timestamp: Utc.with_ymd_and_hms(2025, 11, 3, 9, 30, 0).unwrap(),
            level: "ERROR".into(),
            message: "could not charge the card: rpc error".into(),
            function: "chargeCard".into(),
            service: "checkout".into(),
        })
    }

    #[test]
    fn field_lookup_known_and_unknown() {
        let entry = sample_log();
        assert_eq!(entry.field("level").as_deref(), Some("ERROR"));
        assert_eq!(entry.field("no_such_field"), None);
    }

    #[test]
    fn text_match_is_case_insensitive() {
        let entry = sample_log();
        assert!(entry.matches_text("rpc error"));
        assert!(entry.matches_text("chargecard"));
        assert!(!entry.matches_text("kafka"));
    }

    #[test]
    fn log_line_round_trips_untagged() {
        let entry = sample_log();
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"level\":\"ERROR\""));
        let back: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
