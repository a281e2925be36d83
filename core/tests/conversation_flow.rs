//! Conversation behaviour through the full session surface.

use haystack_core::{
    session::{ChatMessages, PostResult},
    EvidenceCorpus, IncidentSession, SimConfig,
};

fn evidence() -> EvidenceCorpus {
    EvidenceCorpus::from_json_str(
        r#"{
            "channels": [{"name": "incidents"}, {"name": "alerts"}],
            "services": [{"name": "checkout", "language": "go"}],
            "metrics": [{"metric": "goroutine_count", "base_value": 47.0}],
            "trigger_rules": [
                {
                    "triggers": ["kafka", "producer", "orders topic"],
                    "responder": "kevin-sre",
                    "responses": [
                        "brokers look healthy, no ISR churn",
                        "actually I see produce errors on orders",
                        "found it: messages over 1MB are rejected"
                    ]
                }
            ]
        }"#,
    )
    .unwrap()
}

fn session(seed: u64) -> IncidentSession {
    let config = SimConfig {
        entries_per_source: 1000,
        ..SimConfig::with_seed(seed)
    };
    IncidentSession::new(config, evidence()).unwrap()
}

#[test]
fn repeat_asks_walk_the_multi_turn_responses() {
    let mut session = session(42);

    // kevin-sre answers with a 3-tick delay, so drive the question in and
    // wait it out, three times over.
    let mut delivered = Vec::new();
    for _ in 0..3 {
        session.post_message("incidents", "is kafka dropping messages on the producer side?");
        for _ in 0..4 {
            session.list_channels(); // each request is one tick of waiting
        }
        let kevin: Vec<String> = session
            .conversation_history()
            .iter()
            .filter(|m| m.user == "kevin-sre" && !m.text.contains("pulling up my laptop"))
            .map(|m| m.text.clone())
            .collect();
        delivered = kevin;
    }

    assert_eq!(
        delivered,
        vec![
            "brokers look healthy, no ISR churn".to_string(),
            "actually I see produce errors on orders".to_string(),
            "found it: messages over 1MB are rejected".to_string(),
        ]
    );
}

#[test]
fn fix_claim_without_buyin_draws_pushback() {
    let mut session = session(7);
    let result = session.post_message("incidents", "I patched the producer, that should do it");
    match result {
        PostResult::Posted { outcome, .. } => {
            assert_eq!(outcome.responses.len(), 1);
            assert_eq!(outcome.responses[0].user, "frank-devops (platform eng)");
            assert!(outcome.responses[0].text.contains("we don't deploy"));
        }
        other => panic!("expected Posted, got {other:?}"),
    }
    // Nothing queued: the pushback is the whole reaction.
    for _ in 0..5 {
        session.list_channels();
    }
    let frank_count = session
        .conversation_history()
        .iter()
        .filter(|m| m.user.starts_with("frank-devops"))
        .count();
    assert_eq!(frank_count, 1);
}

#[test]
fn fix_claim_with_buyin_celebrates_then_regresses() {
    let mut session = session(7);
    session.post_message("incidents", "here's my RCA, does this make sense to everyone?");
    let result = session.post_message("incidents", "ok, I patched the producer config");

    match result {
        PostResult::Posted { outcome, .. } => {
            assert_eq!(outcome.responses.len(), 2, "helper + celebration land inline");
            assert!(outcome.note.is_some());
        }
        other => panic!("expected Posted, got {other:?}"),
    }

    let regressed = |s: &IncidentSession| {
        s.conversation_history()
            .iter()
            .any(|m| m.text.contains("the original errors are back"))
    };
    assert!(!regressed(&session));

    // Dan's typo fix matures after 2 ticks, the regression after 3.
    session.list_channels();
    session.list_channels();
    assert!(session
        .conversation_history()
        .iter()
        .any(|m| m.text.contains("OK fixed my typo")));
    assert!(!regressed(&session));

    session.list_channels();
    assert!(regressed(&session));
}

#[test]
fn channel_pages_carry_the_delivered_conversation() {
    let mut session = session(42);
    session.post_message("incidents", "anyone looking at this?");
    match session.get_messages("incidents", 0, 5) {
        ChatMessages::Ok { conversation, .. } => {
            assert!(conversation.iter().any(|m| m.user == "agent (you)"));
            // The fallback responder chimes in inline.
            assert!(conversation.iter().any(|m| m.user == "tyler (junior eng)"));
        }
        other => panic!("expected Ok, got {other:?}"),
    }
    // Posts to one channel never leak into another.
    match session.get_messages("alerts", 0, 5) {
        ChatMessages::Ok { conversation, .. } => assert!(conversation.is_empty()),
        other => panic!("expected Ok, got {other:?}"),
    }
}
