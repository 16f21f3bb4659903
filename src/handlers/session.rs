//! 세션 이벤트 핸들러
//!
//! 코디네이터의 동기 실패는 세션이 아니라 이벤트를 보낸 당사자에게만
//! Error 메시지로 돌아간다. 종결 전이의 브로드캐스트는 코디네이터 몫.

use crate::error::MatchError;
use crate::helpers::HelperCategory;
use crate::protocol::ServerMessage;
use crate::session::coordinator;
use crate::state::AppState;
use crate::store::Decision;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

fn surface(
    sender: &UnboundedSender<ServerMessage>,
    session_id: &str,
    result: Result<(), MatchError>,
) {
    if let Err(e) = result {
        tracing::warn!(session_id = %session_id, code = e.code(), error = %e, "Session event rejected");
        let _ = sender.send(ServerMessage::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        });
    }
}

pub async fn handle_session_join(
    state: &Arc<AppState>,
    sender: &UnboundedSender<ServerMessage>,
    user_id: &str,
    session_id: &str,
) {
    surface(
        sender,
        session_id,
        coordinator::handle_join(state, user_id, session_id).await,
    );
}

pub async fn handle_decision_submit(
    state: &Arc<AppState>,
    sender: &UnboundedSender<ServerMessage>,
    user_id: &str,
    session_id: &str,
    decision: Decision,
) {
    surface(
        sender,
        session_id,
        coordinator::handle_decision(state, user_id, session_id, decision).await,
    );
}

pub async fn handle_session_skip(
    state: &Arc<AppState>,
    sender: &UnboundedSender<ServerMessage>,
    user_id: &str,
    session_id: &str,
) {
    surface(
        sender,
        session_id,
        coordinator::handle_skip(state, user_id, session_id).await,
    );
}

pub async fn handle_session_leave(state: &Arc<AppState>, user_id: &str, session_id: &str) {
    coordinator::handle_leave(state, user_id, session_id).await;
}

pub async fn handle_helper_request(
    state: &Arc<AppState>,
    sender: &UnboundedSender<ServerMessage>,
    session_id: &str,
    category: HelperCategory,
) {
    surface(
        sender,
        session_id,
        coordinator::handle_helper_request(state, session_id, category).await,
    );
}
