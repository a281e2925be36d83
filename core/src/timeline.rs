//! Scripted incident timeline.
//!
//! A static, ordered list of (minute, channel, speaker, text) events is
//! scanned once per tick; any event whose threshold has newly been crossed
//! is injected into the conversation exactly once. Recovery actions append
//! new events scheduled relative to "now", so a remediation attempt's
//! regression message lands a fixed offset after the attempt, not at a
//! fixed global minute.

use serde::{Deserialize, Serialize};

use crate::types::Minutes;

/// Regression messages land this many simulated minutes after the
/// remediation attempt they answer — just past the recovery window.
pub const REGRESSION_OFFSET_MINUTES: Minutes = 5;

/// One scripted message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub at_minute: Minutes,
    #[serde(default = "default_channel")]
    pub channel: String,
    pub speaker: String,
    pub text: String,
}

fn default_channel() -> String {
    "incidents".to_string()
}

/// A (speaker, text) pair used by recovery playbook entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerLine {
    pub speaker: String,
    pub text: String,
}

/// One recovery action the agent can attempt from chat: trigger phrases,
/// the immediate improvement message, and the delayed regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryRule {
    pub action: String,
    pub triggers: Vec<String>,
    pub immediate: SpeakerLine,
    pub regression: SpeakerLine,
}

pub struct ScriptedTimeline {
    events: Vec<TimelineEvent>,
    delivered: Vec<bool>,
    playbook: Vec<RecoveryRule>,
}

impl ScriptedTimeline {
    pub fn new(events: Vec<TimelineEvent>, playbook: Vec<RecoveryRule>) -> Self {
        let delivered = vec![false; events.len()];
        Self {
            events,
            delivered,
            playbook,
        }
    }

    /// All events whose threshold has been crossed and which have not been
    /// delivered yet. Marks them delivered — each fires exactly once.
    pub fn due_events(&mut self, minutes_elapsed: Minutes) -> Vec<TimelineEvent> {
        let mut due = Vec::new();
        for (idx, event) in self.events.iter().enumerate() {
            if !self.delivered[idx] && minutes_elapsed >= event.at_minute {
                self.delivered[idx] = true;
                due.push(event.clone());
            }
        }
        due
    }

    /// Find the recovery rule whose trigger phrases appear in an
    /// agent-authored message. `text` is matched case-insensitively.
    pub fn match_recovery(&self, text: &str) -> Option<&RecoveryRule> {
        let text = text.to_lowercase();
        self.playbook
            .iter()
            .find(|rule| rule.triggers.iter().any(|t| text.contains(&t.to_lowercase())))
    }

    /// Schedule a regression message at `now + REGRESSION_OFFSET_MINUTES`.
    pub fn schedule_regression(&mut self, rule: &RecoveryRule, now: Minutes, channel: &str) {
        self.events.push(TimelineEvent {
            at_minute: now + REGRESSION_OFFSET_MINUTES,
            channel: channel.to_string(),
            speaker: rule.regression.speaker.clone(),
            text: rule.regression.text.clone(),
        });
        self.delivered.push(false);
    }
}

/// Built-in recovery playbook. Evidence corpora can replace it with
/// pattern-specific actions.
pub fn default_recovery_playbook() -> Vec<RecoveryRule> {
    let rule = |action: &str,
                triggers: &[&str],
                immediate: (&str, &str),
                regression: (&str, &str)| RecoveryRule {
        action: action.to_string(),
        triggers: triggers.iter().map(|t| t.to_string()).collect(),
        immediate: SpeakerLine {
            speaker: immediate.0.to_string(),
            text: immediate.1.to_string(),
        },
        regression: SpeakerLine {
            speaker: regression.0.to_string(),
            text: regression.1.to_string(),
        },
    };

    vec![
        rule(
            "restart_notification",
            &["restart notification", "rollout restart notification", "restart notify"],
            (
                "frank-devops (platform eng)",
                "Notification service restarted. It's consuming messages from the queue... \
                 emails are flowing! 12 sent in the last 30 seconds.",
            ),
            (
                "frank-devops (platform eng)",
                "The notification service just crashed again. Same exception as before. The \
                 restart only worked while it was processing the message backlog.",
            ),
        ),
        rule(
            "restart_checkout",
            &["restart checkout", "rollout restart checkout", "kubectl restart"],
            (
                "alicia (SRE on-call)",
                "Checkout pods restarting. Goroutine count dropping... success rate \
                 recovering to 72%.",
            ),
            (
                "alicia (SRE on-call)",
                "Checkout degrading again. Goroutines climbing back up. Kafka producer is \
                 blocking new requests. The restart bought us about 3 minutes.",
            ),
        ),
        rule(
            "fix_config",
            &[
                "deploy config", "update config", "fix config", "apply config", "configmap",
            ],
            (
                "frank-devops (platform eng)",
                "Config deployed. Service restarting with new config... it's up! Processing \
                 messages again.",
            ),
            (
                "frank-devops (platform eng)",
                "The config change held, but checkout is still degraded and downstream \
                 services are still erroring. The config fix didn't fix the underlying issue.",
            ),
        ),
        rule(
            "restart_cart",
            &["restart cart", "rollout restart cart"],
            (
                "dave-fe (frontend eng)",
                "Cart pods restarted. Cart functionality looks normal now.",
            ),
            (
                "dave-fe (frontend eng)",
                "Carts going empty again. Same 'transport is closing' errors. This isn't a \
                 cart bug, something upstream is killing the connections.",
            ),
        ),
        rule(
            "increase_memory",
            &["increase memory", "memory limit", "resources.limits.memory"],
            (
                "alicia (SRE on-call)",
                "Increased checkout memory limit to 1GB. Memory usage stabilized at 680MB.",
            ),
            (
                "dan (backend eng)",
                "Memory at 780MB and climbing. We delayed the OOM but the goroutine count is \
                 still going up. This isn't a memory issue, it's a goroutine leak.",
            ),
        ),
    ]
}
