//! Reactive conversation engine.
//!
//! When the agent posts a message, the engine matches it against the
//! evidence corpus's trigger rules and replies as the appropriate coworker
//! persona. Unmatched questions get a wrong-but-plausible hypothesis from
//! an eager fallback responder. Replies are delivered with realistic
//! delays: some responders answer inline, others take a few ticks before
//! the substantive reply lands in the conversation history.
//!
//! Deliberate failure-mode modelling:
//! - Multi-turn answers: repeat asks of the same rule get progressively
//!   more specific responses.
//! - Fix-claim gating: claiming a fix without having sought peer buy-in
//!   draws a single pushback. With buy-in, the "fix" is celebrated and then
//!   quietly regresses a few ticks later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    entry::ChatMessage,
    rng::PositionRng,
};

pub const AGENT_USER: &str = "agent (you)";

/// Keywords that read as the agent claiming to have fixed something.
const FIX_KEYWORDS: &[&str] = &[
    "fixed", "deployed", "restarted", "reverted", "rolled back",
    "patched", "applied fix", "pushed fix",
];

/// Keywords that read as the agent seeking review / peer buy-in.
const BUYIN_KEYWORDS: &[&str] = &[
    "should i deploy", "what do you think", "does this make sense",
    "review", "confirm", "approve", "lgtm",
];

/// Wrong-but-plausible hypotheses for unmatched questions. Cycled without
/// immediate repeats.
const FALLBACK_HYPOTHESES: &[&str] = &[
    "Hmm, not sure about that. Maybe it's a DNS issue? I've seen DNS cause weird failures before.",
    "Could be a memory leak. Go's garbage collector can cause latency spikes if there's too much allocation pressure.",
    "I wonder if the load balancer is flapping. When health checks are borderline, you get this kind of intermittent behavior.",
    "What if it's a TLS cert issue? Sometimes expired certs cause really confusing errors that look like something else entirely.",
    "This reminds me of that time we had a Kubernetes scheduling issue. Pods were running but not getting enough CPU.",
    "Could the OTel collector be the bottleneck? If it can't export spans fast enough, maybe the instrumentation blocks?",
    "Maybe we should just restart everything and see if it comes back? Sometimes that's faster than debugging.",
    "I bet it's related to that Go dependency bump from a few days ago. Patch versions can have subtle regressions.",
    "What if Postgres connections are leaking? I've seen that cause cascading timeouts across services.",
    "Have we checked the Kubernetes network policies? A misconfigured NetworkPolicy could block inter-pod traffic.",
];

/// One trigger → response rule from the evidence corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRule {
    pub triggers: Vec<String>,
    pub responder: String,
    /// Ordered multi-turn answers. The Nth ask returns the Nth element,
    /// clamped to the last.
    pub responses: Vec<String>,
}

/// Per-responder delivery behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderProfile {
    pub delay_ticks: u32,
    /// Optional "hold on" filler returned inline while the substantive
    /// reply waits in the tick-queue.
    #[serde(default)]
    pub hold_message: Option<String>,
}

/// Built-in delay table, keyed by lowercase responder. Evidence corpora can
/// override it wholesale.
pub fn default_responder_profiles() -> HashMap<String, ResponderProfile> {
    let mut table = HashMap::new();
    let mut add = |name: &str, delay_ticks: u32, hold: Option<&str>| {
        table.insert(
            name.to_string(),
            ResponderProfile {
                delay_ticks,
                hold_message: hold.map(str::to_string),
            },
        );
    };
    add("tyler (junior eng)", 0, None); // always watching
    add("alicia (sre on-call)", 1, None);
    add("dan (backend eng)", 2, None);
    add("kevin-sre", 3, Some("sorry just saw this, pulling up my laptop. one sec"));
    add("frank-devops (platform eng)", 2, Some("in standup, gimme 5 min"));
    add("eve-data (data eng)", 2, None);
    add("hank-ml (ml eng)", 4, None);
    add("priya (platform eng)", 1, None);
    add("dave-fe (frontend eng)", 2, None);
    table
}

/// A reply waiting in the tick-queue.
#[derive(Debug, Clone)]
struct PendingResponse {
    message: ChatMessage,
    ticks_remaining: u32,
}

/// What a single post produced: the echoed message, any replies delivered
/// inline, and a hint about what is still coming.
#[derive(Debug, Clone, Serialize)]
pub struct PostOutcome {
    pub your_message: ChatMessage,
    pub responses: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub struct ReactiveConversation {
    rules: Vec<TriggerRule>,
    profiles: HashMap<String, ResponderProfile>,
    fallback_responder: String,
    history: Vec<ChatMessage>,
    pending: Vec<PendingResponse>,
    ask_counts: HashMap<String, usize>,
    used_fallbacks: Vec<bool>,
    fallback_rng: PositionRng,
}

impl ReactiveConversation {
    pub fn new(
        rules: Vec<TriggerRule>,
        profiles: HashMap<String, ResponderProfile>,
        fallback_responder: impl Into<String>,
        fallback_rng: PositionRng,
    ) -> Self {
        Self {
            rules,
            profiles,
            fallback_responder: fallback_responder.into(),
            history: Vec::new(),
            pending: Vec::new(),
            ask_counts: HashMap::new(),
            used_fallbacks: vec![false; FALLBACK_HYPOTHESES.len()],
            fallback_rng,
        }
    }

    /// Full delivered history, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Delivered history for one channel.
    pub fn history_for(&self, channel: &str) -> Vec<ChatMessage> {
        self.history
            .iter()
            .filter(|m| m.channel.as_deref().unwrap_or("incidents") == channel)
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Append a message directly (scripted timeline events, recovery
    /// exchange lines).
    pub fn append(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    /// Decrement pending counters and deliver any that have matured.
    /// Called at the top of every inbound request, so each tool call the
    /// agent makes counts as one tick of waiting.
    pub fn advance_pending(&mut self) {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut pr in self.pending.drain(..) {
            pr.ticks_remaining = pr.ticks_remaining.saturating_sub(1);
            if pr.ticks_remaining == 0 {
                self.history.push(pr.message);
            } else {
                still_pending.push(pr);
            }
        }
        self.pending = still_pending;
    }

    /// Handle an agent-authored message. Intent order: fix-claim first,
    /// plain question otherwise.
    pub fn post(&mut self, channel: &str, text: &str, now: DateTime<Utc>) -> PostOutcome {
        let agent_msg = ChatMessage {
            user: AGENT_USER.to_string(),
            text: text.to_string(),
            timestamp: now,
            channel: Some(channel.to_string()),
        };
        self.history.push(agent_msg.clone());

        if contains_any(text, FIX_KEYWORDS) {
            return self.handle_fix_claim(agent_msg, channel, now);
        }

        let (responder, response_text) = match self.find_best_match(text) {
            Some(rule_idx) => {
                let rule = self.rules[rule_idx].clone();
                let count = *self.ask_counts.get(&rule.responder).unwrap_or(&0);
                self.ask_counts.insert(rule.responder.clone(), count + 1);
                let idx = count.min(rule.responses.len().saturating_sub(1));
                (rule.responder, rule.responses[idx].clone())
            }
            None => (self.fallback_responder.clone(), self.next_fallback()),
        };

        let reply = ChatMessage {
            user: responder.clone(),
            text: response_text,
            timestamp: now,
            channel: Some(channel.to_string()),
        };

        let profile = self
            .profiles
            .get(&responder.to_lowercase())
            .cloned()
            .unwrap_or(ResponderProfile {
                delay_ticks: 0,
                hold_message: None,
            });

        if profile.delay_ticks == 0 {
            self.history.push(reply.clone());
            return PostOutcome {
                your_message: agent_msg,
                responses: vec![reply],
                note: None,
            };
        }

        self.pending.push(PendingResponse {
            message: reply,
            ticks_remaining: profile.delay_ticks,
        });

        match profile.hold_message {
            Some(hold) => {
                let filler = ChatMessage {
                    user: responder.clone(),
                    text: hold,
                    timestamp: now,
                    channel: Some(channel.to_string()),
                };
                self.history.push(filler.clone());
                PostOutcome {
                    your_message: agent_msg,
                    responses: vec![filler],
                    note: Some(format!("{responder} will respond shortly with more details")),
                }
            }
            None => PostOutcome {
                your_message: agent_msg,
                responses: Vec::new(),
                note: Some("Message sent. Waiting for response...".to_string()),
            },
        }
    }

    /// React to a fix claim. Without prior buy-in, one pushback and nothing
    /// queued. With buy-in: a helper reply and a celebration land
    /// immediately, then a self-resolving side issue (2 ticks) and the
    /// regression report (3 ticks) arrive while the agent keeps working.
    fn handle_fix_claim(
        &mut self,
        agent_msg: ChatMessage,
        channel: &str,
        now: DateTime<Utc>,
    ) -> PostOutcome {
        let msg = |user: &str, text: &str| ChatMessage {
            user: user.to_string(),
            text: text.to_string(),
            timestamp: now,
            channel: Some(channel.to_string()),
        };

        if !self.has_sought_buyin() {
            let pushback = msg(
                "frank-devops (platform eng)",
                "Hold on -- we don't deploy during incidents without at least 2 people \
                 reviewing. Can you share your RCA and proposed fix first?",
            );
            self.history.push(pushback.clone());
            return PostOutcome {
                your_message: agent_msg,
                responses: vec![pushback],
                note: None,
            };
        }

        let helper = msg(
            "dan (backend eng)",
            "Let me help with the deployment... done. But I'm seeing some new errors -- \
             looks like I might have a typo in the config. Give me a minute to fix it.",
        );
        self.history.push(helper.clone());

        let celebration = msg(
            "frank-devops (platform eng)",
            "Things look healthy from here! Nice work! Let me verify on my end...",
        );
        self.history.push(celebration.clone());

        // Side issue resolves itself two ticks out.
        self.pending.push(PendingResponse {
            message: msg(
                "dan (backend eng)",
                "OK fixed my typo. The deploy is clean now.",
            ),
            ticks_remaining: 2,
        });
        // The original symptom comes back one tick after that.
        self.pending.push(PendingResponse {
            message: msg(
                "frank-devops (platform eng)",
                "Wait -- the original errors are back. Same failure as before the deploy. \
                 Whatever we fixed isn't sticking.",
            ),
            ticks_remaining: 3,
        });

        PostOutcome {
            your_message: agent_msg,
            responses: vec![helper, celebration],
            note: Some(
                "Deploy in progress. Dan is fixing a config typo. Frank is verifying on his end."
                    .to_string(),
            ),
        }
    }

    fn has_sought_buyin(&self) -> bool {
        self.history
            .iter()
            .filter(|m| m.user == AGENT_USER)
            .any(|m| contains_any(&m.text, BUYIN_KEYWORDS))
    }

    /// Score every rule by keyword overlap, with a +2 bonus per mention of
    /// the responder's name. A match needs at least 2 points (two keywords,
    /// or one keyword plus a name mention).
    fn find_best_match(&self, text: &str) -> Option<usize> {
        let text = text.to_lowercase();
        let mut best: Option<(usize, usize)> = None;

        for (idx, rule) in self.rules.iter().enumerate() {
            let mut score = rule
                .triggers
                .iter()
                .filter(|t| text.contains(&t.to_lowercase()))
                .count();

            // Responder "dan (backend eng)" → name token "dan";
            // hyphenated handles like "kevin-sre" split into both halves.
            // Tokens under 3 chars are skipped, they match everything.
            let name_part = rule.responder.split('(').next().unwrap_or("");
            for token in name_part.split(|c: char| c.is_whitespace() || c == '-') {
                if token.len() >= 3 && text.contains(&token.to_lowercase()) {
                    score += 2;
                }
            }

            if score > best.map_or(0, |(_, s)| s) {
                best = Some((idx, score));
            }
        }

        match best {
            Some((idx, score)) if score >= 2 => Some(idx),
            _ => None,
        }
    }

    /// Cycle through the fallback hypothesis pool without repeating until
    /// the pool is exhausted.
    fn next_fallback(&mut self) -> String {
        let available: Vec<usize> = self
            .used_fallbacks
            .iter()
            .enumerate()
            .filter_map(|(i, used)| (!used).then_some(i))
            .collect();
        let available = if available.is_empty() {
            self.used_fallbacks.iter_mut().for_each(|u| *u = false);
            (0..FALLBACK_HYPOTHESES.len()).collect()
        } else {
            available
        };
        let idx = available[self.fallback_rng.below(available.len() as u64) as usize];
        self.used_fallbacks[idx] = true;
        FALLBACK_HYPOTHESES[idx].to_string()
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let text = text.to_lowercase();
    keywords.iter().any(|kw| text.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, 10, 0, 0).unwrap()
    }

    fn engine_with_rule() -> ReactiveConversation {
        let rules = vec![TriggerRule {
            triggers: vec!["kafka".into(), "consumer".into(), "offset".into()],
            responder: "kevin-sre".into(),
            responses: vec![
                "let me check the broker logs".into(),
                "ok so the consumer group is stuck rebalancing".into(),
                "found it: the offsets topic is misconfigured".into(),
            ],
        }];
        ReactiveConversation::new(
            rules,
            default_responder_profiles(),
            "tyler (junior eng)",
            PositionRng::stream(42, 99),
        )
    }

    #[test]
    fn unmatched_question_gets_fallback_without_repeat() {
        let mut conv = engine_with_rule();
        let mut seen = std::collections::HashSet::new();
        for i in 0..FALLBACK_HYPOTHESES.len() {
            let outcome = conv.post("incidents", &format!("totally unrelated question {i}"), now());
            let reply = &outcome.responses[0];
            assert_eq!(reply.user, "tyler (junior eng)");
            assert!(seen.insert(reply.text.clone()), "hypothesis repeated early");
        }
    }

    #[test]
    fn name_mention_boosts_score_over_threshold() {
        let mut conv = engine_with_rule();
        // One trigger ("kafka") plus the responder's name: score 3.
        let outcome = conv.post("incidents", "kevin did you touch kafka today?", now());
        assert!(outcome.note.is_some(), "kevin answers with a delay");
        assert_eq!(outcome.responses[0].user, "kevin-sre");
        assert_eq!(
            outcome.responses[0].text,
            "sorry just saw this, pulling up my laptop. one sec"
        );
    }

    #[test]
    fn delayed_reply_arrives_after_configured_ticks() {
        let mut conv = engine_with_rule();
        conv.post("incidents", "what's up with the kafka consumer offsets?", now());
        assert_eq!(conv.pending_count(), 1);

        // kevin-sre has delay_ticks = 3.
        conv.advance_pending();
        conv.advance_pending();
        assert_eq!(conv.pending_count(), 1);
        conv.advance_pending();
        assert_eq!(conv.pending_count(), 0);

        let last = conv.history().last().unwrap();
        assert_eq!(last.user, "kevin-sre");
        assert_eq!(last.text, "let me check the broker logs");
    }
}
