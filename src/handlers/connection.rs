//! 연결 핸들러

use crate::protocol::ServerMessage;
use crate::state::AppState;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// presence:online — 채널 바인딩 후 온라인 상태를 전파한다
pub async fn handle_presence_online(
    state: &Arc<AppState>,
    channel_id: &str,
    sender: &UnboundedSender<ServerMessage>,
    user_id: &str,
) {
    state.connections.bind(user_id, channel_id, sender.clone());

    set_online_flag(state, user_id, true).await;

    state.connections.broadcast_except(
        user_id,
        ServerMessage::PresenceChanged {
            user_id: user_id.to_string(),
            is_online: true,
        },
    );

    tracing::info!(user_id = %user_id, channel_id = %channel_id, "User online");
}

/// 연결 해제. 채널 id가 현재 바인딩일 때만 오프라인 처리
pub async fn handle_disconnect(state: &Arc<AppState>, channel_id: &str, user_id: Option<&str>) {
    if let Some(user_id) = user_id {
        if state.connections.unbind_channel(user_id, channel_id) {
            set_online_flag(state, user_id, false).await;

            state.connections.broadcast_except(
                user_id,
                ServerMessage::PresenceChanged {
                    user_id: user_id.to_string(),
                    is_online: false,
                },
            );
        }
    }
    tracing::info!(channel_id = %channel_id, "Connection closed");
}

/// 프로필의 온라인 플래그 갱신. 디렉터리 오류는 연결 수명에 영향을 주지 않는다
async fn set_online_flag(state: &Arc<AppState>, user_id: &str, is_online: bool) {
    match state.directory.get_user(user_id).await {
        Ok(Some(mut user)) => {
            user.is_online = is_online;
            user.last_active = Utc::now();
            if let Err(e) = state.directory.save_user(&user).await {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to update presence flag");
            }
        }
        Ok(None) => {
            tracing::debug!(user_id = %user_id, "Presence update for unknown user");
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Presence lookup failed");
        }
    }
}

/// Heartbeat 처리
pub fn handle_heartbeat(sender: &UnboundedSender<ServerMessage>) {
    let _ = sender.send(ServerMessage::HeartbeatAck);
}
