//! Chat noise generation using curated personas and message templates.
//!
//! Produces the "sea" a chat channel's signal messages are buried in:
//! standups, PR reviews, watercooler questions, and bot traffic (CI,
//! deploys, alerts, dependency bumps). The 40% bot / 60% human split and
//! the per-category weights are designed properties — they are what makes
//! a channel read like a real engineering org at scale.

use chrono::Duration;

use crate::{
    entry::{ChatMessage, Entry},
    generator::{EntryGenerator, GeneratorConfig},
    rng::PositionRng,
    types::Position,
};

/// (handle, real name) pairs for human noise authors.
const PERSONAS: &[(&str, &str)] = &[
    ("alice-eng", "Alice Chen"),
    ("bob-sre", "Bob Martinez"),
    ("carol-pm", "Carol Wang"),
    ("dave-fe", "Dave Kim"),
    ("eve-data", "Eve Johnson"),
    ("frank-devops", "Frank Osei"),
    ("grace-qa", "Grace Liu"),
    ("hank-ml", "Hank Patel"),
    ("iris-security", "Iris Nakamura"),
    ("jack-mobile", "Jack Thompson"),
];

pub(crate) const SERVICES: &[&str] = &[
    "checkout", "shipping", "recommendation", "product-catalog", "ad",
    "cart", "payment", "email", "frontend", "accounting", "product-reviews",
    "load-generator", "fraud-detection", "currency",
];

const FEATURES: &[&str] = &[
    "user authentication", "cart persistence", "search indexing",
    "recommendation model v2", "payment retry logic", "shipping cost calculator",
    "product image CDN", "A/B testing framework", "metrics pipeline",
    "admin dashboard", "mobile API", "webhook delivery", "rate limiting",
    "order tracking", "inventory sync", "email templates",
];

const TECHS: &[&str] = &[
    "gRPC", "Kafka", "Redis", "Valkey", "PostgreSQL", "Next.js", "Go",
    "Rust", "Python", "Java", "protobuf", "Kubernetes", "Docker",
    "OpenTelemetry", "Prometheus", "Grafana", "Flagd", "Terraform",
];

const TEAMS: &[&str] = &["backend", "platform", "frontend", "data", "infra"];

const COMPONENTS: &[&str] = &["checkout", "cart", "auth", "shipping", "payment"];

pub struct ChatNoiseGenerator;

impl EntryGenerator for ChatNoiseGenerator {
    fn generate(
        &self,
        config: &GeneratorConfig,
        position: Position,
        rng: &mut PositionRng,
    ) -> Entry {
        let jitter_minutes = rng.range_i64(-30, 30);
        let timestamp = config.base_time(position) + Duration::minutes(jitter_minutes);

        // 40% bot messages, 60% human.
        let (user, text) = if rng.chance(0.4) {
            bot_message(rng)
        } else {
            human_message(rng)
        };

        Entry::Chat(ChatMessage {
            user,
            text,
            timestamp,
            channel: None,
        })
    }
}

fn persona_display(rng: &mut PositionRng) -> String {
    let (handle, real) = rng.pick(PERSONAS);
    format!("{real} ({handle})")
}

fn first_name(rng: &mut PositionRng) -> &'static str {
    let (_, real) = rng.pick(PERSONAS);
    real.split_whitespace().next().unwrap_or(real)
}

fn version(rng: &mut PositionRng) -> String {
    format!("v{}.{}.{}", rng.below(5) + 1, rng.below(21), rng.below(11))
}

fn ticket(rng: &mut PositionRng) -> String {
    format!("ENG-{}", 1000 + rng.below(9000))
}

fn human_message(rng: &mut PositionRng) -> (String, String) {
    let user = persona_display(rng);
    // general weighted 3x against standup and pr_review.
    let text = match rng.below(5) {
        0 => standup_text(rng),
        1 => pr_review_text(rng),
        _ => general_text(rng),
    };
    (user, text)
}

fn standup_text(rng: &mut PositionRng) -> String {
    match rng.below(8) {
        0 => format!(
            "Yesterday: {}. Today: {}. No blockers.",
            rng.pick(FEATURES),
            rng.pick(FEATURES)
        ),
        1 => format!(
            "Wrapping up {}. Should be ready for review by EOD.",
            rng.pick(FEATURES)
        ),
        2 => format!(
            "Still working on {}. Hit a snag with {}, investigating.",
            ticket(rng),
            rng.pick(TECHS)
        ),
        3 => format!(
            "PR #{} is up for {}. Would appreciate eyes on the {} changes.",
            1000 + rng.below(1000),
            rng.pick(FEATURES),
            rng.pick(COMPONENTS)
        ),
        4 => format!(
            "Blocked on {} waiting for {} to deploy their changes.",
            ticket(rng),
            rng.pick(TEAMS)
        ),
        5 => format!(
            "Quick update: {} is in staging, running soak test overnight.",
            rng.pick(FEATURES)
        ),
        6 => format!("Pairing with {} on {} today.", first_name(rng), ticket(rng)),
        _ => "OOO this afternoon, dentist appointment. Back tomorrow.".to_string(),
    }
}

fn pr_review_text(rng: &mut PositionRng) -> String {
    match rng.below(8) {
        0 => "LGTM, approving.".to_string(),
        1 => format!(
            "Left a few comments on the {} changes, nothing blocking.",
            rng.pick(COMPONENTS)
        ),
        2 => format!(
            "nit: can we rename `{}` to something more descriptive?",
            rng.pick(&["ctx", "svc", "cfg", "req", "resp"])
        ),
        3 => format!(
            "This looks good but I'd add a test for the edge case where {}.",
            rng.pick(&["empty cart", "nil user", "timeout", "invalid currency"])
        ),
        4 => format!(
            "Approved with suggestion: consider using {} instead of {} here.",
            rng.pick(&["context.WithTimeout", "sync.Pool", "errgroup"]),
            rng.pick(&["manual goroutines", "channels", "mutex"])
        ),
        5 => format!(
            "Question: why did we choose {} over {}?",
            rng.pick(&["gRPC streaming", "HTTP/2", "WebSocket"]),
            rng.pick(&["polling", "long-polling", "SSE"])
        ),
        6 => "Looks clean. Ship it.".to_string(),
        _ => format!("+1, nice refactor of the {} module.", rng.pick(COMPONENTS)),
    }
}

fn general_text(rng: &mut PositionRng) -> String {
    match rng.below(8) {
        0 => format!(
            "Anyone know the status of the {} migration?",
            rng.pick(SERVICES)
        ),
        1 => format!(
            "FYI <link> is a good read on {}.",
            rng.pick(&["distributed systems", "Go performance", "Kafka tuning", "observability"])
        ),
        2 => format!(
            "Is {} still happening today?",
            rng.pick(&["sprint planning", "retro", "architecture review", "standup"])
        ),
        3 => format!(
            "Can someone review PR #{}? It's been open for 3 days.",
            1000 + rng.below(1000)
        ),
        4 => format!(
            "The {} environment is acting up again, seeing intermittent {}.",
            rng.pick(&["staging", "dev", "production"]),
            rng.pick(&["timeouts", "connection resets", "high latency", "OOM kills"])
        ),
        5 => format!(
            "Heads up: upgrading {} to {} next week.",
            rng.pick(TECHS),
            version(rng)
        ),
        6 => format!(
            "Does anyone have experience with {}? Trying to decide between that and {}.",
            rng.pick(TECHS),
            rng.pick(TECHS)
        ),
        _ => format!(
            "Reminder: {} is tomorrow. Don't forget to sign up.",
            rng.pick(&["tech talk", "team lunch", "demo day", "all-hands"])
        ),
    }
}

fn bot_message(rng: &mut PositionRng) -> (String, String) {
    // CI notifications dominate bot traffic 3:1:1:1.
    match rng.below(6) {
        0 | 1 | 2 => ("bot: ci-notify".to_string(), ci_text(rng)),
        3 => ("bot: deploy-notify".to_string(), deploy_text(rng)),
        4 => ("bot: grafana-alert".to_string(), alert_text(rng)),
        _ => ("bot: dependabot".to_string(), dependabot_text(rng)),
    }
}

fn branch(rng: &mut PositionRng) -> String {
    match rng.below(3) {
        0 => "main".to_string(),
        1 => "develop".to_string(),
        _ => format!("feature/{}", ticket(rng)),
    }
}

fn ci_text(rng: &mut PositionRng) -> String {
    let service = rng.pick(SERVICES);
    let build = 100 + rng.below(1900);
    let br = branch(rng);
    match rng.below(3) {
        0 => format!("Build passed: {service} #{build} ({br})"),
        1 => format!(
            "Build failed: {service} #{build} ({br}) - {} test(s) failed",
            rng.below(5) + 1
        ),
        _ => format!("Build passed: {service} #{build} ({br}) [flaky test retry succeeded]"),
    }
}

fn deploy_text(rng: &mut PositionRng) -> String {
    let service = rng.pick(SERVICES);
    let old = version(rng);
    let new = version(rng);
    match rng.below(3) {
        0 => format!("Deploy complete: {service} {old} -> {new}"),
        1 => format!(
            "Deploy started: {service} {new} to {}",
            rng.pick(&["production", "staging"])
        ),
        _ => format!("Rollback complete: {service} reverted to {old}"),
    }
}

fn alert_text(rng: &mut PositionRng) -> String {
    let alert = rng.pick(&[
        "HighLatency", "ErrorRate", "CPUUsage", "MemoryUsage", "DiskSpace", "PodRestart",
    ]);
    match rng.below(4) {
        0 => format!(
            "[FIRING] {alert}: {} {} for {}",
            rng.pick(&["http_request_duration_p99", "error_rate", "cpu_percent", "memory_used_bytes"]),
            rng.pick(&["> 1s for 5m", "> 5% for 10m", "> 80% for 15m", "> 90% for 5m"]),
            rng.pick(&["5 minutes", "10 minutes", "15 minutes"])
        ),
        1 => format!(
            "[RESOLVED] {alert}: {} returned to normal",
            rng.pick(&["http_request_duration_p99", "error_rate", "cpu_percent", "memory_used_bytes"])
        ),
        2 => format!("[FIRING] {alert}: {} health check failed", rng.pick(SERVICES)),
        _ => format!("[RESOLVED] {alert}: {} health check recovered", rng.pick(SERVICES)),
    }
}

fn dependabot_text(rng: &mut PositionRng) -> String {
    format!(
        "PR #{}: Bump {} from {}.{}.{} to {}.{}.{} in /src/{}",
        1200 + rng.below(300),
        rng.pick(&[
            "golang.org/x/net",
            "google.golang.org/grpc",
            "github.com/IBM/sarama",
            "protobuf",
        ]),
        rng.below(5) + 1,
        rng.below(41),
        rng.below(11),
        rng.below(5) + 1,
        rng.below(41),
        rng.below(15) + 1,
        rng.pick(SERVICES)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::source_discriminant;

    fn config() -> GeneratorConfig {
        GeneratorConfig::new(42, source_discriminant("chat", "incidents"), 5000)
    }

    #[test]
    fn generation_is_deterministic() {
        let cfg = config();
        let a = ChatNoiseGenerator.generate(&cfg, 1234, &mut cfg.rng_at(1234));
        let b = ChatNoiseGenerator.generate(&cfg, 1234, &mut cfg.rng_at(1234));
        assert_eq!(a, b);
    }

    #[test]
    fn bot_share_is_roughly_forty_percent() {
        let cfg = config();
        let bots = (0..2000)
            .filter(|&p| {
                let entry = ChatNoiseGenerator.generate(&cfg, p, &mut cfg.rng_at(p));
                entry.field("user").unwrap().starts_with("bot:")
            })
            .count();
        assert!(
            (600..=1000).contains(&bots),
            "expected ~40% bot messages, got {bots}/2000"
        );
    }

    #[test]
    fn timestamps_advance_with_position() {
        let cfg = config();
        let early = ChatNoiseGenerator.generate(&cfg, 10, &mut cfg.rng_at(10));
        let late = ChatNoiseGenerator.generate(&cfg, 4500, &mut cfg.rng_at(4500));
        assert!(early.timestamp() < late.timestamp());
    }
}
