//! 연결 바인딩과 시그널링 중계
//!
//! 사용자당 활성 채널 하나. 재접속은 바인딩을 덮어쓰고, 끊김은 채널 id가
//! 일치할 때만 제거한다. 수신자 미바인딩은 조용히 버린다 (best-effort).

use crate::protocol::ServerMessage;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

/// 사용자 → 활성 채널 바인딩
pub struct ConnectionBinding {
    pub channel_id: String,
    pub sender: UnboundedSender<ServerMessage>,
}

/// 연결 레지스트리
#[derive(Default)]
pub struct ConnectionRegistry {
    bindings: DashMap<String, ConnectionBinding>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 바인딩 등록. 기존 바인딩은 교체된다
    pub fn bind(&self, user_id: &str, channel_id: &str, sender: UnboundedSender<ServerMessage>) {
        self.bindings.insert(
            user_id.to_string(),
            ConnectionBinding {
                channel_id: channel_id.to_string(),
                sender,
            },
        );
    }

    /// 채널 id가 현재 바인딩과 일치할 때만 제거.
    /// 재접속으로 교체된 옛 채널의 종료가 새 바인딩을 지우면 안 된다
    pub fn unbind_channel(&self, user_id: &str, channel_id: &str) -> bool {
        self.bindings
            .remove_if(user_id, |_, binding| binding.channel_id == channel_id)
            .is_some()
    }

    pub fn is_bound(&self, user_id: &str) -> bool {
        self.bindings.contains_key(user_id)
    }

    /// 바인딩된 채널로 전달. 미바인딩이면 버리고 false
    pub fn send_to(&self, user_id: &str, message: ServerMessage) -> bool {
        match self.bindings.get(user_id) {
            Some(binding) => binding.sender.send(message).is_ok(),
            None => {
                tracing::debug!(user_id = %user_id, "Dropped message for unbound user");
                false
            }
        }
    }

    /// 한 명을 제외한 전체에 브로드캐스트 (presence 알림용)
    pub fn broadcast_except(&self, except_user_id: &str, message: ServerMessage) {
        for entry in self.bindings.iter() {
            if entry.key() != except_user_id {
                let _ = entry.value().sender.send(message.clone());
            }
        }
    }
}
