//! 클라이언트-서버 메시지 프로토콜 정의

use serde::{Deserialize, Serialize};

use crate::helpers::{HelperCategory, HelperContent};
use crate::store::Decision;

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    // Connection
    Heartbeat,
    PresenceOnline {
        user_id: String,
    },

    // Session Lifecycle
    SessionJoin {
        session_id: String,
        user_id: String,
    },
    SessionLeave {
        session_id: String,
    },
    DecisionSubmit {
        session_id: String,
        user_id: String,
        decision: Decision,
    },
    SessionSkip {
        session_id: String,
        user_id: String,
    },

    // Conversation Helpers
    HelperRequest {
        session_id: String,
        category: HelperCategory,
    },

    // WebRTC Signaling (payload는 불투명하게 중계만 한다)
    Offer {
        to_user_id: String,
        payload: serde_json::Value,
    },
    Answer {
        to_user_id: String,
        payload: serde_json::Value,
    },
    IceCandidate {
        to_user_id: String,
        payload: serde_json::Value,
    },
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    // Connection
    Connected {
        channel_id: String,
    },
    HeartbeatAck,
    Error {
        code: String,
        message: String,
    },
    PresenceChanged {
        user_id: String,
        is_online: bool,
    },

    // Session Events
    SessionJoined {
        session_id: String,
        user_count: usize,
    },
    SessionStarted {
        session_id: String,
    },
    SessionTick {
        session_id: String,
        remaining: i64,
        elapsed: i64,
    },
    SessionTimedOut {
        session_id: String,
    },
    SessionExtended {
        session_id: String,
    },
    SessionEnded {
        session_id: String,
        mutual: bool,
        decision_a: Decision,
        decision_b: Decision,
    },
    SessionSkipped {
        session_id: String,
        skipped_by: String,
    },

    // Conversation Helpers
    HelperDelivered {
        category: HelperCategory,
        content: HelperContent,
    },
    HelperUnavailable {
        category: HelperCategory,
    },

    // WebRTC Signaling
    Offer {
        from_user_id: String,
        payload: serde_json::Value,
    },
    Answer {
        from_user_id: String,
        payload: serde_json::Value,
    },
    IceCandidate {
        from_user_id: String,
        payload: serde_json::Value,
    },
}
