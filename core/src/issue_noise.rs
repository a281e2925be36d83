//! Error-tracker issue noise generation.
//!
//! Titles are drawn from per-runtime weighted pools (Go timeouts dominate
//! Go projects, NPEs dominate Java projects) and event counts follow a
//! Pareto distribution — a few issues with thousands of events, a long
//! tail of one-offs. Generated ids encode the position
//! (`PROJECT-{position+100}`) so an issue lookup never scans the corpus.

use chrono::Duration;

use crate::{
    entry::{Entry, ErrorIssue, IssueTags},
    generator::{EntryGenerator, GeneratorConfig},
    log_noise::ServiceLanguage,
    rng::PositionRng,
    types::Position,
};

/// (title, weight) pools per runtime. Weights may sum to less than 1.0;
/// the residual probability mass falls through to the pool's first title.
const GO_ERRORS: &[(&str, f64)] = &[
    ("context deadline exceeded", 0.25),
    ("runtime error: invalid memory address or nil pointer dereference", 0.15),
    ("connection refused", 0.12),
    ("EOF", 0.10),
    ("broken pipe", 0.08),
    ("i/o timeout", 0.08),
    ("transport is closing", 0.07),
    ("TLS handshake timeout", 0.05),
    ("no route to host", 0.05),
    ("connection reset by peer", 0.05),
];

const PYTHON_ERRORS: &[(&str, f64)] = &[
    ("TimeoutError: [Errno 110] Connection timed out", 0.20),
    ("AttributeError: 'NoneType' object has no attribute", 0.18),
    ("grpc.StatusCode.UNAVAILABLE", 0.15),
    ("ConnectionRefusedError", 0.12),
    ("KeyError:", 0.10),
    ("ValueError: invalid literal", 0.08),
    ("MemoryError", 0.05),
    ("RecursionError", 0.02),
];

const JAVA_ERRORS: &[(&str, f64)] = &[
    ("java.lang.NullPointerException", 0.30),
    ("java.net.SocketTimeoutException", 0.15),
    ("io.grpc.StatusRuntimeException: UNAVAILABLE", 0.12),
    ("java.lang.OutOfMemoryError: Java heap space", 0.08),
    ("java.util.ConcurrentModificationException", 0.05),
];

pub struct IssueNoiseGenerator {
    project_name: String,
    language: ServiceLanguage,
}

impl IssueNoiseGenerator {
    pub fn new(project_name: impl Into<String>, language: ServiceLanguage) -> Self {
        Self {
            project_name: project_name.into(),
            language,
        }
    }

    /// The id this generator assigns to `position`.
    pub fn id_for(project: &str, position: Position) -> String {
        format!(
            "{}-{}",
            project.to_uppercase().replace('-', ""),
            position + 100
        )
    }

    /// Inverse of `id_for`. Returns None if the id does not belong to
    /// `project` or does not encode a position.
    pub fn position_for(project: &str, id: &str) -> Option<Position> {
        let prefix = format!("{}-", project.to_uppercase().replace('-', ""));
        let suffix = id.strip_prefix(&prefix)?;
        suffix.parse::<usize>().ok()?.checked_sub(100)
    }
}

fn weighted_title(pool: &[(&'static str, f64)], rng: &mut PositionRng) -> &'static str {
    let roll = rng.next_f64();
    let mut cumulative = 0.0;
    for (title, weight) in pool {
        cumulative += weight;
        if roll <= cumulative {
            return title;
        }
    }
    pool[0].0
}

impl EntryGenerator for IssueNoiseGenerator {
    fn generate(
        &self,
        config: &GeneratorConfig,
        position: Position,
        rng: &mut PositionRng,
    ) -> Entry {
        let pool = match self.language {
            ServiceLanguage::Python => PYTHON_ERRORS,
            ServiceLanguage::Java => JAVA_ERRORS,
            // No dedicated Rust pool upstream of us either; Rust services
            // report transport-level errors that read like the Go set.
            ServiceLanguage::Go | ServiceLanguage::Rust => GO_ERRORS,
        };
        let title = weighted_title(pool, rng);

        let last_seen = config.base_time(position);
        let first_seen = last_seen - Duration::hours(rng.range_i64(1, 72));

        // Pareto event counts: alpha 1.5, scaled x5, clamped to [1, 5000].
        let event_count = (rng.pareto(1.0, 1.5) * 5.0) as u64;
        let event_count = event_count.clamp(1, 5000);

        let level = if rng.chance(0.25) { "warning" } else { "error" };

        let runtime = match self.language {
            ServiceLanguage::Go => "go",
            ServiceLanguage::Python => "python",
            ServiceLanguage::Rust => "rust",
            ServiceLanguage::Java => "java",
        };

        Entry::Issue(ErrorIssue {
            id: Self::id_for(&self.project_name, position),
            title: title.to_string(),
            count: event_count,
            first_seen,
            last_seen,
            level: level.to_string(),
            project: self.project_name.clone(),
            tags: IssueTags {
                environment: "production".to_string(),
                runtime: runtime.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::source_discriminant;

    #[test]
    fn id_round_trips_through_position() {
        assert_eq!(IssueNoiseGenerator::id_for("checkout-service", 42), "CHECKOUTSERVICE-142");
        assert_eq!(
            IssueNoiseGenerator::position_for("checkout-service", "CHECKOUTSERVICE-142"),
            Some(42)
        );
        assert_eq!(IssueNoiseGenerator::position_for("checkout-service", "OTHER-142"), None);
        assert_eq!(IssueNoiseGenerator::position_for("checkout-service", "CHECKOUTSERVICE-17"), None);
    }

    #[test]
    fn event_counts_stay_in_bounds() {
        let cfg = GeneratorConfig::new(7, source_discriminant("issues", "ad-service"), 3000);
        let generator = IssueNoiseGenerator::new("ad-service", ServiceLanguage::Java);
        for p in 0..500 {
            match generator.generate(&cfg, p, &mut cfg.rng_at(p)) {
                Entry::Issue(issue) => {
                    assert!((1..=5000).contains(&issue.count));
                    assert!(issue.first_seen < issue.last_seen);
                }
                other => panic!("expected issue, got {other:?}"),
            }
        }
    }
}
