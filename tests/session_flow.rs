//! 매치 탐색부터 세션 종결까지의 엔드투엔드 흐름

use flashmeet_match_rs::config::{AuthConfig, Config, SessionConfig, SweepConfig};
use flashmeet_match_rs::directory::{
    Coordinates, Gender, Location, MemoryDirectory, Preferences, UserDirectory, UserProfile,
};
use flashmeet_match_rs::error::MatchError;
use flashmeet_match_rs::handlers;
use flashmeet_match_rs::matching::{self, FindMatchOutcome};
use flashmeet_match_rs::protocol::ServerMessage;
use flashmeet_match_rs::session::coordinator;
use flashmeet_match_rs::state::AppState;
use flashmeet_match_rs::store::{Decision, MatchStatus, MemoryMatchStore};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

fn test_config() -> Config {
    Config {
        port: 0,
        host: "127.0.0.1".to_string(),
        cors_origins: vec![],
        session: SessionConfig {
            window_secs: 180,
            auto_accept_solo: false,
        },
        auth: AuthConfig {
            secret: "test-secret".to_string(),
            token_ttl: 60,
        },
        sweep: SweepConfig {
            interval_secs: 300,
            grace_secs: 600,
        },
        log_level: "warn".to_string(),
    }
}

fn user(id: &str, age: u32, gender: Gender, lat: f64, lng: f64) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        display_name: id.to_string(),
        age,
        bio: String::new(),
        gender,
        location: Location {
            city: Some("Seoul".to_string()),
            coordinates: Some(Coordinates { lat, lng }),
        },
        preferences: Preferences::default(),
        recent_matches: vec![],
        blocked_users: vec![],
        is_online: true,
        last_active: Utc::now(),
    }
}

/// 서로 약 5km 떨어진 호환 프로필 두 명 (상한 50km)
async fn setup() -> (
    Arc<AppState>,
    UnboundedReceiver<ServerMessage>,
    UnboundedReceiver<ServerMessage>,
) {
    let directory = MemoryDirectory::new();
    directory
        .save_user(&user("alice", 28, Gender::Female, 37.5665, 126.9780))
        .await
        .unwrap();
    directory
        .save_user(&user("bob", 31, Gender::Male, 37.6115, 126.9780))
        .await
        .unwrap();

    let state = Arc::new(AppState::new(
        test_config(),
        Arc::new(MemoryMatchStore::new()),
        Arc::new(directory),
    ));

    let (tx_a, rx_a) = tokio::sync::mpsc::unbounded_channel();
    let (tx_b, rx_b) = tokio::sync::mpsc::unbounded_channel();
    state.connections.bind("alice", "ch-a", tx_a);
    state.connections.bind("bob", "ch-b", tx_b);

    (state, rx_a, rx_b)
}

fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = vec![];
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

async fn find_for_alice(state: &Arc<AppState>) -> String {
    match matching::find_match(state, "alice").await.unwrap() {
        FindMatchOutcome::Found { record, candidate } => {
            assert_eq!(candidate.id, "bob");
            assert_eq!(record.status, MatchStatus::Pending);
            record.id
        }
        FindMatchOutcome::NoCandidate => panic!("expected a candidate"),
    }
}

#[tokio::test]
async fn find_creates_pending_match_and_blocks_second_find() {
    let (state, _rx_a, _rx_b) = setup().await;

    let match_id = find_for_alice(&state).await;

    let record = state.store.get(&match_id).await.unwrap().unwrap();
    assert_eq!(record.participant_a, "alice");
    assert_eq!(record.participant_b, "bob");
    assert_eq!(record.decision_a, Decision::Pending);
    assert_eq!(record.decision_b, Decision::Pending);

    // 살아 있는 매치는 참가자당 1건
    let err = matching::find_match(&state, "alice").await.unwrap_err();
    assert!(matches!(err, MatchError::ActiveMatchExists));
}

#[tokio::test]
async fn mutual_yes_flow_extends_session() {
    let (state, mut rx_a, mut rx_b) = setup().await;
    let match_id = find_for_alice(&state).await;

    coordinator::handle_join(&state, "alice", &match_id)
        .await
        .unwrap();
    coordinator::handle_join(&state, "bob", &match_id)
        .await
        .unwrap();

    let msgs = drain(&mut rx_a);
    assert!(msgs
        .iter()
        .any(|m| matches!(m, ServerMessage::SessionStarted { .. })));
    drain(&mut rx_b);

    coordinator::handle_decision(&state, "alice", &match_id, Decision::Yes)
        .await
        .unwrap();
    coordinator::handle_decision(&state, "bob", &match_id, Decision::Yes)
        .await
        .unwrap();

    let record = state.store.get(&match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchStatus::Extended);
    assert!(record.extended);

    for rx in [&mut rx_a, &mut rx_b] {
        assert!(drain(rx)
            .iter()
            .any(|m| matches!(m, ServerMessage::SessionExtended { .. })));
    }
}

#[tokio::test]
async fn skip_flow_ends_match_and_excludes_rematch_for_a_day() {
    let (state, mut rx_a, _rx_b) = setup().await;
    let match_id = find_for_alice(&state).await;

    coordinator::handle_join(&state, "alice", &match_id)
        .await
        .unwrap();
    drain(&mut rx_a);

    coordinator::handle_skip(&state, "alice", &match_id)
        .await
        .unwrap();

    let record = state.store.get(&match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchStatus::Ended);
    assert_eq!(record.decision_a, Decision::No);

    assert!(drain(&mut rx_a)
        .iter()
        .any(|m| matches!(m, ServerMessage::SessionSkipped { .. })));

    // 24시간 재매칭 제외: 방금 만난 bob은 다시 후보가 되지 않는다
    match matching::find_match(&state, "alice").await.unwrap() {
        FindMatchOutcome::NoCandidate => {}
        FindMatchOutcome::Found { .. } => panic!("recently matched user must be excluded"),
    }
}

#[tokio::test]
async fn signaling_is_relayed_opaquely_with_sender_annotation() {
    let (state, _rx_a, mut rx_b) = setup().await;

    let payload = serde_json::json!({"sdp": "v=0...", "kind": "offer"});
    handlers::handle_offer(&state, "alice", "bob", payload.clone()).await;

    match drain(&mut rx_b).as_slice() {
        [ServerMessage::Offer {
            from_user_id,
            payload: relayed,
        }] => {
            assert_eq!(from_user_id, "alice");
            assert_eq!(relayed, &payload);
        }
        other => panic!("expected exactly one relayed offer, got {:?}", other),
    }

    // 미바인딩 수신자는 조용히 버린다 (오류 아님)
    handlers::handle_ice_candidate(&state, "alice", "ghost", serde_json::json!({})).await;
}
