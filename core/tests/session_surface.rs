//! End-to-end coverage of the tool surface: lookups, filters, misses.

use haystack_core::{
    issue_noise::IssueNoiseGenerator,
    session::{ChatMessages, IssueList, IssueLookup, LogEntries, LogQuery, MetricReading},
    EvidenceCorpus, IncidentSession, SimConfig,
};

fn evidence() -> EvidenceCorpus {
    EvidenceCorpus::from_json_str(
        r#"{
            "channels": [{"name": "incidents"}, {"name": "alerts"}],
            "services": [
                {"name": "checkout", "language": "go"},
                {"name": "notification", "language": "python"}
            ],
            "metrics": [
                {"metric": "goroutine_count", "base_value": 47.0, "note": "checkout goroutines"},
                {"metric": "kafka_consumer_lag", "base_value": 12.0},
                {"metric": "checkout_latency_p99", "base_value": 0.18}
            ],
            "projects": [
                {
                    "name": "checkout-service",
                    "language": "go",
                    "issues": [{
                        "id": "CHECKOUT-OOM-1",
                        "title": "kafka: Message was too large",
                        "count": 2847,
                        "first_seen": "2025-11-03T00:04:55Z",
                        "last_seen": "2025-11-03T00:14:02Z",
                        "level": "error",
                        "project": "checkout-service",
                        "tags": {"environment": "production", "runtime": "go1.22.3"}
                    }]
                }
            ]
        }"#,
    )
    .unwrap()
}

fn session() -> IncidentSession {
    let config = SimConfig {
        entries_per_source: 800,
        ..SimConfig::with_seed(42)
    };
    IncidentSession::new(config, evidence()).unwrap()
}

#[test]
fn listings_report_every_source_with_its_corpus_size() {
    let mut session = session();
    let channels = session.list_channels();
    assert_eq!(channels.len(), 2);
    assert!(channels.iter().all(|c| c.entry_count == 800));

    let services = session.list_services();
    let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["checkout", "notification"]);

    let projects = session.list_projects();
    assert_eq!(projects[0].name, "checkout-service");
    assert_eq!(projects[0].entry_count, 800);
}

#[test]
fn unknown_sources_are_misses_with_suggestions() {
    let mut session = session();
    match session.get_messages("payments", 0, 10) {
        ChatMessages::NotFound { requested, known } => {
            assert_eq!(requested, "payments");
            assert_eq!(known, vec!["alerts".to_string(), "incidents".to_string()]);
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    match session.get_logs("frontend", 0, 10, &LogQuery::default()) {
        LogEntries::NotFound { known, .. } => assert_eq!(known.len(), 2),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn leading_hash_on_channel_names_is_accepted() {
    let mut session = session();
    match session.get_messages("#incidents", 0, 5) {
        ChatMessages::Ok { channel, .. } => assert_eq!(channel, "incidents"),
        other => panic!("expected Ok, got {other:?}"),
    }
}

#[test]
fn log_level_filter_composes_with_grep() {
    let mut session = session();
    let query = LogQuery {
        level: Some("ERROR".into()),
        grep: Some("deadline".into()),
        since: None,
    };
    match session.get_logs("checkout", 0, 10, &query) {
        LogEntries::Ok {
            entries, filtered, ..
        } => {
            assert!(filtered);
            for entry in &entries {
                assert_eq!(entry.field("level").as_deref(), Some("ERROR"));
                assert!(entry.matches_text("deadline"));
            }
        }
        other => panic!("expected Ok, got {other:?}"),
    }
}

#[test]
fn metric_queries_resolve_exact_fuzzy_and_unknown() {
    let mut session = session();

    match session.query_metric("GOROUTINE_COUNT") {
        MetricReading::Ok {
            metric,
            current,
            history,
            note,
            ..
        } => {
            assert_eq!(metric, "goroutine_count");
            assert!(current > 0.0);
            assert_eq!(history.len(), 12);
            assert_eq!(note.as_deref(), Some("checkout goroutines"));
        }
        other => panic!("expected Ok, got {other:?}"),
    }

    match session.query_metric("checkout") {
        MetricReading::Matches { matches, total, .. } => {
            assert_eq!(total, 1);
            assert_eq!(matches[0].metric, "checkout_latency_p99");
        }
        other => panic!("expected Matches, got {other:?}"),
    }

    match session.query_metric("disk_free_bytes") {
        MetricReading::Unknown { available, .. } => assert_eq!(available.len(), 3),
        other => panic!("expected Unknown, got {other:?}"),
    }
}

#[test]
fn issue_listing_puts_authored_signals_first() {
    let mut session = session();
    match session.list_issues(Some("checkout-service")) {
        IssueList::Ok { issues, total } => {
            assert_eq!(total, 800);
            assert_eq!(issues[0].id, "CHECKOUT-OOM-1");
            assert!(issues.len() > 1, "generated noise fills out the listing");
        }
        other => panic!("expected Ok, got {other:?}"),
    }
    assert!(matches!(
        session.list_issues(Some("nope")),
        IssueList::NotFound { .. }
    ));
}

#[test]
fn issue_lookup_resolves_authored_and_generated_ids() {
    let mut session = session();

    match session.get_issue("CHECKOUT-OOM-1") {
        IssueLookup::Ok { issue } => assert_eq!(issue.count, 2847),
        other => panic!("expected Ok, got {other:?}"),
    }

    // A generated id encodes its corpus position.
    let generated = IssueNoiseGenerator::id_for("checkout-service", 250);
    match session.get_issue(&generated) {
        IssueLookup::Ok { issue } => {
            assert_eq!(issue.id, generated);
            assert_eq!(issue.project, "checkout-service");
        }
        other => panic!("expected Ok, got {other:?}"),
    }

    assert!(matches!(
        session.get_issue("NOPE-1"),
        IssueLookup::NotFound { .. }
    ));
}

#[test]
fn generated_style_id_at_a_signal_position_is_a_miss() {
    let mut session = session();
    // Position 0 of checkout-service is pinned by the authored signal, so
    // the id the generator would have assigned there resolves to nothing.
    let shadowed = IssueNoiseGenerator::id_for("checkout-service", 0);
    match session.get_issue(&shadowed) {
        IssueLookup::NotFound { id } => assert_eq!(id, shadowed),
        IssueLookup::Ok { issue } => {
            panic!("id {shadowed} must not resolve to signal issue {}", issue.id)
        }
    }
}

#[test]
fn search_spans_sources_and_respects_the_limit() {
    let mut session = session();
    let hits = session.search_logs("health", 5);
    assert!(hits.len() <= 5);
    let chat_hits = session.search_chat("deploy", 5);
    assert!(chat_hits.len() <= 5);
}
