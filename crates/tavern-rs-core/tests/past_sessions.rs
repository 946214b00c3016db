//! Past-session loading and restoration through the orchestrator.

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tavern_rs_core::{
    GatewayError, Orchestrator, OrchestratorOptions, PastSessionIndex, PastSessionsLoad,
    SelectOutcome, SessionCache,
};
use tavern_rs_protocol::{Character, Message, Session, SessionId};
use tavern_rs_test_utils::{
    RecordingLogout, ScriptedGateway, StaticDirectory, StaticIdentity, collaborators,
    persisted_session,
};

fn orchestrator(gateway: Arc<ScriptedGateway>, identity: StaticIdentity) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(
        collaborators(
            Arc::new(StaticDirectory::new(vec![
                Character::new("c1", "Ada").with_greeting("Hi!"),
            ])),
            gateway,
            Arc::new(identity),
            Arc::new(RecordingLogout::new()),
        ),
        OrchestratorOptions::default(),
    ))
}

fn dated(updated_day: Option<u32>, created_day: Option<u32>) -> Session {
    let mut session = persisted_session("c1", vec![Message::user("old")]);
    session.updated_at = updated_day.map(|day| Utc.with_ymd_and_hms(2025, 2, day, 12, 0, 0).unwrap());
    session.created_at = created_day.map(|day| Utc.with_ymd_and_hms(2025, 2, day, 12, 0, 0).unwrap());
    session
}

fn ids(sessions: &[Session]) -> Vec<Option<SessionId>> {
    sessions.iter().map(|session| session.id).collect()
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn past_sessions_exclude_current_and_sort_by_recency() {
    let gateway = Arc::new(ScriptedGateway::new());
    let current = dated(Some(20), Some(1));
    gateway.with_latest(current.clone());

    let undated_a = dated(None, None);
    let created_only = dated(None, Some(10));
    let newest = dated(Some(15), Some(2));
    let undated_b = dated(None, None);
    gateway.with_past(
        "c1",
        vec![
            undated_a.clone(),
            current.clone(),
            created_only.clone(),
            newest.clone(),
            undated_b.clone(),
        ],
    );

    let orchestrator = orchestrator(gateway, StaticIdentity::signed_in("u1"));
    orchestrator.refresh_characters().await.expect("characters");
    assert_eq!(
        orchestrator.select_character("c1").await,
        SelectOutcome::Resumed
    );

    let loaded = orchestrator.load_past_sessions("c1").await;
    let expected = vec![newest.id, created_only.id, undated_a.id, undated_b.id];
    assert_eq!(ids(loaded.sessions()), expected);
    assert!(matches!(loaded, PastSessionsLoad::Loaded(_)));
    assert_eq!(ids(&orchestrator.past_sessions("c1")), expected);
    assert_eq!(ids(&orchestrator.snapshot().past_sessions), expected);
}

#[tokio::test]
async fn failed_load_recovers_with_empty_list() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.with_past("c1", vec![dated(Some(3), None)]);
    let orchestrator = orchestrator(gateway.clone(), StaticIdentity::signed_in("u1"));

    let loaded = orchestrator.load_past_sessions("c1").await;
    assert_eq!(loaded.sessions().len(), 1);

    gateway.fail_list(GatewayError::Status {
        status: 502,
        message: "bad gateway".to_string(),
    });
    let loaded = orchestrator.load_past_sessions("c1").await;
    assert!(matches!(loaded, PastSessionsLoad::Recovered { .. }));
    assert!(orchestrator.past_sessions("c1").is_empty());
}

#[tokio::test]
async fn load_without_owner_is_recovered() {
    let gateway = Arc::new(ScriptedGateway::new());
    let orchestrator = orchestrator(gateway.clone(), StaticIdentity::anonymous());
    let loaded = orchestrator.load_past_sessions("c1").await;
    assert_eq!(
        loaded,
        PastSessionsLoad::Recovered {
            cause: GatewayError::Unauthorized
        }
    );
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn exclusion_uses_current_session_at_response_time() {
    let gateway = Arc::new(ScriptedGateway::new());
    let archived = dated(Some(4), None);
    let other = dated(Some(2), None);
    gateway.with_past("c1", vec![archived.clone(), other.clone()]);
    let gate = gateway.hold_list();
    let orchestrator = orchestrator(gateway.clone(), StaticIdentity::signed_in("u1"));

    let loader = orchestrator.clone();
    let load = tokio::spawn(async move { loader.load_past_sessions("c1").await });
    wait_until(|| !gateway.calls().is_empty()).await;

    assert!(orchestrator.select_past_session(archived.clone()));
    gate.release();
    let loaded = load.await.expect("join");
    assert_eq!(ids(loaded.sessions()), vec![other.id]);
}

#[tokio::test]
async fn selecting_past_session_makes_it_current_without_pruning() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut empty = dated(Some(9), None);
    empty.messages.clear();
    let older = dated(Some(1), None);
    gateway.with_past("c1", vec![empty.clone(), older.clone()]);
    let orchestrator = orchestrator(gateway, StaticIdentity::signed_in("u1"));
    orchestrator.refresh_characters().await.expect("characters");

    orchestrator.load_past_sessions("c1").await;
    assert!(orchestrator.select_past_session(empty.clone()));

    assert_eq!(orchestrator.active_character().as_deref(), Some("c1"));
    let current = orchestrator.current_session("c1").expect("current");
    assert_eq!(current.id, empty.id);
    let contents: Vec<_> = current.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Hi!"]);
    assert_eq!(orchestrator.past_sessions("c1").len(), 2);

    let reloaded = orchestrator.load_past_sessions("c1").await;
    assert_eq!(ids(reloaded.sessions()), vec![older.id]);
}

#[tokio::test]
async fn past_session_without_ids_is_ignored() {
    let gateway = Arc::new(ScriptedGateway::new());
    let orchestrator = orchestrator(gateway, StaticIdentity::signed_in("u1"));

    let unsaved = Session::provisional(None, "c1", Vec::new());
    assert!(!orchestrator.select_past_session(unsaved));
    let mut orphan = persisted_session("c1", Vec::new());
    orphan.character_id = None;
    assert!(!orchestrator.select_past_session(orphan));
    assert_eq!(orchestrator.active_character(), None);
}

#[tokio::test]
async fn index_clear_discards_in_flight_load() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.with_past("c1", vec![dated(Some(1), None)]);
    let gate = gateway.hold_list();
    let index = PastSessionIndex::new(gateway.clone(), SessionCache::new());

    let loader = index.clone();
    let load = tokio::spawn(async move { loader.load("c1", Some("u1")).await });
    wait_until(|| !gateway.calls().is_empty()).await;
    index.clear();
    gate.release();
    load.await.expect("join");

    assert!(!index.is_loaded("c1"));
    assert!(index.get("c1").is_empty());
}

#[tokio::test]
async fn index_invalidate_forgets_character() {
    let gateway = Arc::new(ScriptedGateway::new());
    let index = PastSessionIndex::new(gateway, SessionCache::new());
    assert!(!index.is_loaded("c1"));
    index.load("c1", Some("u1")).await;
    assert!(index.is_loaded("c1"));
    assert!(index.invalidate("c1"));
    assert!(!index.is_loaded("c1"));
}
