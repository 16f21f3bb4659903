//! WebRTC 시그널링 핸들러
//!
//! payload는 해석하지 않고 수신자 바인딩으로만 중계한다.
//! 수신자 미바인딩은 오류가 아니다 (상위 미디어 계층이 자체 생존 확인을 한다).

use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

/// Offer 중계
pub async fn handle_offer(
    state: &Arc<AppState>,
    from_user_id: &str,
    to_user_id: &str,
    payload: serde_json::Value,
) {
    let delivered = state.connections.send_to(
        to_user_id,
        ServerMessage::Offer {
            from_user_id: from_user_id.to_string(),
            payload,
        },
    );

    tracing::debug!(
        from = %from_user_id,
        to = %to_user_id,
        delivered = delivered,
        "Relayed offer"
    );
}

/// Answer 중계
pub async fn handle_answer(
    state: &Arc<AppState>,
    from_user_id: &str,
    to_user_id: &str,
    payload: serde_json::Value,
) {
    let delivered = state.connections.send_to(
        to_user_id,
        ServerMessage::Answer {
            from_user_id: from_user_id.to_string(),
            payload,
        },
    );

    tracing::debug!(
        from = %from_user_id,
        to = %to_user_id,
        delivered = delivered,
        "Relayed answer"
    );
}

/// ICE Candidate 중계
pub async fn handle_ice_candidate(
    state: &Arc<AppState>,
    from_user_id: &str,
    to_user_id: &str,
    payload: serde_json::Value,
) {
    let delivered = state.connections.send_to(
        to_user_id,
        ServerMessage::IceCandidate {
            from_user_id: from_user_id.to_string(),
            payload,
        },
    );

    tracing::debug!(
        from = %from_user_id,
        to = %to_user_id,
        delivered = delivered,
        "Relayed ICE candidate"
    );
}
