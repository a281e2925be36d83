//! The evidence corpus: everything hand-authored about one incident.
//!
//! Loaded once at session start-up from JSON produced upstream (the
//! failure-pattern tooling distills it from an evidence map). Signal
//! entries here are the needles; the generators supply the haystack.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    conversation::{ResponderProfile, TriggerRule},
    entry::{ChatMessage, ErrorIssue, LogLine, MetricPoint},
    error::{SimError, SimResult},
    log_noise::ServiceLanguage,
    timeline::{RecoveryRule, TimelineEvent},
};

/// One chat channel with its authored signal messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvidence {
    pub name: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// One log service with its authored signal lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEvidence {
    pub name: String,
    #[serde(default)]
    pub language: ServiceLanguage,
    #[serde(default)]
    pub entries: Vec<LogLine>,
}

/// One metric family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEvidence {
    pub metric: String,
    pub base_value: f64,
    #[serde(default = "default_noise_pct")]
    pub noise_pct: f64,
    /// Authored "healthy" reading. Defaults to base_value; the incident
    /// clock's severity modifier is applied on top at query time.
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
    /// Authored samples to pin into the history.
    #[serde(default)]
    pub signal_points: Vec<MetricPoint>,
}

fn default_noise_pct() -> f64 {
    0.1
}

/// One error-tracker project with its authored signal issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEvidence {
    pub name: String,
    #[serde(default)]
    pub language: ServiceLanguage,
    #[serde(default)]
    pub issues: Vec<ErrorIssue>,
}

/// The full hand-authored corpus for one incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceCorpus {
    #[serde(default)]
    pub channels: Vec<ChannelEvidence>,
    #[serde(default)]
    pub services: Vec<ServiceEvidence>,
    #[serde(default)]
    pub metrics: Vec<MetricEvidence>,
    #[serde(default)]
    pub projects: Vec<ProjectEvidence>,
    #[serde(default)]
    pub trigger_rules: Vec<TriggerRule>,
    /// Overrides the built-in responder delay table when present.
    #[serde(default)]
    pub responder_profiles: Option<HashMap<String, ResponderProfile>>,
    #[serde(default = "default_fallback_responder")]
    pub fallback_responder: String,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    /// Overrides the built-in recovery playbook when present.
    #[serde(default)]
    pub recovery_playbook: Option<Vec<RecoveryRule>>,
}

fn default_fallback_responder() -> String {
    "tyler (junior eng)".to_string()
}

impl EvidenceCorpus {
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let corpus: Self = serde_json::from_str(json)?;
        corpus.validate()?;
        Ok(corpus)
    }

    pub fn from_json_file(path: &Path) -> SimResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SimError::Config(format!("cannot read evidence file {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Start-up sanity checks beyond what deserialization enforces.
    /// Broken evidence must fail before any request is served.
    pub fn validate(&self) -> SimResult<()> {
        for rule in &self.trigger_rules {
            if rule.triggers.is_empty() {
                return Err(SimError::Config(format!(
                    "trigger rule for '{}' has no trigger keywords",
                    rule.responder
                )));
            }
            if rule.responses.is_empty() {
                return Err(SimError::Config(format!(
                    "trigger rule for '{}' has no responses",
                    rule.responder
                )));
            }
        }
        for metric in &self.metrics {
            if metric.base_value < 0.0 {
                return Err(SimError::Config(format!(
                    "metric '{}' has negative base_value",
                    metric.metric
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_corpus_parses_with_defaults() {
        let corpus = EvidenceCorpus::from_json_str(
            r#"{
                "channels": [{"name": "incidents"}],
                "metrics": [{"metric": "goroutine_count", "base_value": 47.0}]
            }"#,
        )
        .unwrap();
        assert_eq!(corpus.channels.len(), 1);
        assert_eq!(corpus.fallback_responder, "tyler (junior eng)");
        assert!((corpus.metrics[0].noise_pct - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_trigger_rule_is_rejected() {
        let err = EvidenceCorpus::from_json_str(
            r#"{"trigger_rules": [{"triggers": [], "responder": "dan", "responses": ["x"]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }
}
